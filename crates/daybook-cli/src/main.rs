//! Daybook CLI
//!
//! Command-line interface for Daybook: notes, photos, recordings, time logs
//! and calendar events, stored locally, in a directory, or on a sync server.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use daybook_core::{Config, Store};

mod commands;
mod editor;
mod output;

use output::{error_hint, Output, OutputFormat};

/// Default log filter when DAYBOOK_LOG is not set
const DEFAULT_LOG_FILTER: &str = "daybook_core=warn,daybook_cli=warn";

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Daybook - local-first journal with directory and server sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active backend and record counts
    Status,
    /// Show storage usage by category
    Usage,
    /// Export everything to a zip archive
    Export {
        /// Destination file (defaults to daybook-backup-<date>.zip)
        path: Option<PathBuf>,
    },
    /// Restore everything from a zip archive, replacing current data
    Import {
        /// Archive to restore
        path: PathBuf,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Connect a sync backend
    Connect {
        #[command(subcommand)]
        command: ConnectCommands,
    },
    /// Return to local storage
    Disconnect,
    /// Wipe the local store
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Manage photos
    Photo {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Manage voice recordings
    Recording {
        #[command(subcommand)]
        command: RecordingCommands,
    },
    /// Time log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Manage prompt templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Manage calendar events
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConnectCommands {
    /// Store data in a directory (e.g. a synced folder)
    #[command(alias = "dir")]
    Directory {
        /// Directory to use
        path: PathBuf,
        /// Skip confirmation when the directory already holds data
        #[arg(short, long)]
        yes: bool,
    },
    /// Store data on a sync server
    Api {
        /// Server base URL
        endpoint: String,
        /// API key
        key: String,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Create a new note
    #[command(alias = "create")]
    Add {
        /// Note title
        title: String,
        /// HTML content (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
        /// Category
        #[arg(long)]
        category: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List notes
    #[command(alias = "ls")]
    List {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Delete a note and its recordings
    #[command(alias = "delete")]
    Rm {
        /// Note ID (full UUID or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PhotoCommands {
    /// Import an image file
    Add {
        /// Image file
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Folder to file the photo under
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// List photos
    #[command(alias = "ls")]
    List {
        /// Only photos in this folder
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Delete a photo
    #[command(alias = "delete")]
    Rm {
        /// Photo ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum RecordingCommands {
    /// Import a webm audio file
    Add {
        /// Audio file
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Attach to this note instead of the recordings list
        #[arg(long)]
        note: Option<String>,
    },
    /// List recordings
    #[command(alias = "ls")]
    List {
        /// List the recordings attached to this note
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a recording
    #[command(alias = "delete")]
    Rm {
        /// Recording ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Record a clock-in
    ClockIn,
    /// Record a clock-out
    ClockOut,
    /// Record a task that covered a time span
    Task {
        /// Task description
        task: String,
        /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM")
        #[arg(long)]
        start: String,
        /// End time (RFC 3339 or "YYYY-MM-DD HH:MM")
        #[arg(long)]
        end: String,
    },
    /// List log entries
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a prompt template
    Add {
        /// Template name
        name: String,
        /// Prompt text
        prompt: String,
    },
    /// List templates
    #[command(alias = "ls")]
    List,
    /// Delete a template
    #[command(alias = "delete")]
    Rm {
        /// Template ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// Create a calendar event
    Add {
        /// Event title
        title: String,
        /// Start time (RFC 3339 or "YYYY-MM-DD HH:MM")
        #[arg(long)]
        start: String,
        /// End time (RFC 3339 or "YYYY-MM-DD HH:MM")
        #[arg(long)]
        end: String,
        /// Reminder this many minutes before the start
        #[arg(long)]
        reminder: Option<i32>,
    },
    /// List events
    #[command(alias = "ls")]
    List,
    /// Delete an event
    #[command(alias = "delete")]
    Rm {
        /// Event ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, remote_timeout_secs)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output).await {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = error_hint(&e) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_deref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut store = Store::open(config).await?;
    debug!("Opened store with {} backend", store.active_backend());
    if let Some(notice) = store.take_notice() {
        output.notice(&notice);
    }

    match cli.command {
        Commands::Status => commands::status::show(&store, output),
        Commands::Usage => commands::status::usage(&store, output),
        Commands::Export { path } => commands::archive::export(&store, path, output),
        Commands::Import { path, yes } => {
            commands::archive::import(&mut store, path, yes, output).await
        }
        Commands::Connect { command } => match command {
            ConnectCommands::Directory { path, yes } => {
                commands::backend::connect_directory(&mut store, path, yes, output).await
            }
            ConnectCommands::Api { endpoint, key } => {
                commands::backend::connect_api(&mut store, endpoint, key, output).await
            }
        },
        Commands::Disconnect => commands::backend::disconnect(&mut store, output).await,
        Commands::Clear { yes } => commands::backend::clear(&mut store, yes, output),
        Commands::Note { command } => handle_note_command(command, &mut store, output).await,
        Commands::Photo { command } => handle_photo_command(command, &mut store, output).await,
        Commands::Recording { command } => {
            handle_recording_command(command, &mut store, output).await
        }
        Commands::Log { command } => handle_log_command(command, &mut store, output).await,
        Commands::Template { command } => {
            handle_template_command(command, &mut store, output).await
        }
        Commands::Event { command } => handle_event_command(command, &mut store, output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_note_command(
    command: NoteCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        NoteCommands::Add {
            title,
            content,
            category,
            tag,
        } => commands::note::add(store, title, content, category, tag, output).await,
        NoteCommands::List { tag } => commands::note::list(store, tag, output),
        NoteCommands::Rm { id, yes } => commands::note::delete(store, id, yes, output).await,
    }
}

async fn handle_photo_command(
    command: PhotoCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        PhotoCommands::Add { file, name, folder } => {
            commands::photo::add(store, file, name, folder, output).await
        }
        PhotoCommands::List { folder } => commands::photo::list(store, folder, output),
        PhotoCommands::Rm { id } => commands::photo::delete(store, id, output).await,
    }
}

async fn handle_recording_command(
    command: RecordingCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        RecordingCommands::Add { file, name, note } => {
            commands::recording::add(store, file, name, note, output).await
        }
        RecordingCommands::List { note } => commands::recording::list(store, note, output),
        RecordingCommands::Rm { id } => commands::recording::delete(store, id, output).await,
    }
}

async fn handle_log_command(command: LogCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        LogCommands::ClockIn => commands::log::clock_in(store, output).await,
        LogCommands::ClockOut => commands::log::clock_out(store, output).await,
        LogCommands::Task { task, start, end } => {
            commands::log::task(store, task, start, end, output).await
        }
        LogCommands::List => commands::log::list(store, output),
    }
}

async fn handle_template_command(
    command: TemplateCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        TemplateCommands::Add { name, prompt } => {
            commands::template::add(store, name, prompt, output).await
        }
        TemplateCommands::List => commands::template::list(store, output),
        TemplateCommands::Rm { id } => commands::template::delete(store, id, output).await,
    }
}

async fn handle_event_command(
    command: EventCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        EventCommands::Add {
            title,
            start,
            end,
            reminder,
        } => commands::event::add(store, title, start, end, reminder, output).await,
        EventCommands::List => commands::event::list(store, output),
        EventCommands::Rm { id } => commands::event::delete(store, id, output).await,
    }
}

/// Initialize logging
///
/// Filter comes from DAYBOOK_LOG. Logs go to config.log_file when set,
/// otherwise to stderr.
fn init_logging(config: &Config) {
    let filter = std::env::var("DAYBOOK_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
