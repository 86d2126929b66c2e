//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use daybook_core::{Entity, RemoteError, StorageError};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a list of records
    ///
    /// `line` renders one record for humans; quiet mode prints ids only.
    pub fn print_records<T, L>(&self, records: &[T], noun: &str, line: L)
    where
        T: Entity,
        L: Fn(&T) -> String,
    {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No {}s found.", noun);
                    return;
                }
                for record in records {
                    println!("{} | {}", short_id(record.id()), line(record));
                }
                println!("\n{} {}(s)", records.len(), noun);
            }
            OutputFormat::Json => self.json(&records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id());
                }
            }
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<S: Serialize + ?Sized>(&self, value: &S) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a one-time notice on stderr so it never mixes with data output
    pub fn notice(&self, notice: &str) {
        if !self.is_quiet() {
            eprintln!("! {}", notice);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Suggest what the user can do about a failed command
///
/// Looks through the error chain for a storage or sync error that carries
/// actionable advice.
pub fn error_hint(error: &anyhow::Error) -> Option<&'static str> {
    for cause in error.chain() {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            return storage.recovery_suggestion();
        }
        if let Some(remote) = cause.downcast_ref::<RemoteError>() {
            return match remote {
                RemoteError::Unauthorized => Some("Check the API key and connect again."),
                RemoteError::InvalidEndpoint(_) => {
                    Some("Use a full http:// or https:// server URL.")
                }
                _ if remote.is_transient() => {
                    Some("The sync server may be offline or busy. Try again later.")
                }
                _ => None,
            };
        }
    }
    None
}

/// First 8 characters of an id, for compact listings
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_error_hint_from_storage_error() {
        let storage = StorageError::DiskFull {
            path: "/data/daybook.db".into(),
            details: "no space left on device".to_string(),
        };
        let error = anyhow::Error::new(storage).context("Failed to save note");
        assert_eq!(error_hint(&error), Some("Free up disk space and try again."));
    }

    #[test]
    fn test_error_hint_from_remote_error() {
        let error = anyhow::Error::new(RemoteError::Unauthorized).context("Failed to connect");
        assert_eq!(error_hint(&error), Some("Check the API key and connect again."));

        let busy = anyhow::Error::new(RemoteError::Status {
            code: 503,
            body: String::new(),
        });
        assert!(error_hint(&busy).is_some());

        let rejected = anyhow::Error::new(RemoteError::Status {
            code: 400,
            body: String::new(),
        });
        assert_eq!(error_hint(&rejected), None);
    }

    #[test]
    fn test_error_hint_without_known_cause() {
        assert_eq!(error_hint(&anyhow::anyhow!("something else")), None);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("2f1c9a4e-6b8d-4c1e"), "2f1c9a4e");
        assert_eq!(short_id("n1"), "n1");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ünïcödé text here", 8), "ünïcö...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }
}
