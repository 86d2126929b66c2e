//! Daybook Core Library
//!
//! Persistence and sync layer for Daybook, a local-first journal of notes,
//! photos, voice recordings, time logs and calendar events.
//!
//! # Architecture
//!
//! The dataset lives in memory and is backed by exactly one of three
//! interchangeable backends:
//!
//! - **Local**: SQLite store in the data directory (always available)
//! - **Directory**: plain JSON and media files in a user-chosen directory
//! - **Api**: a self-hosted sync server
//!
//! Switching backends never merges: the last backend connected wins. A
//! zip archive can export and restore the whole dataset independently of
//! the active backend.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open(Config::load()?).await?;
//!
//! // Add a note
//! store.save(Note::new("Groceries").with_content("<p>milk</p>")).await?;
//!
//! // Mirror everything into a synced folder
//! store.connect_directory(Path::new("/home/me/Dropbox/Daybook")).await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Record types, the in-memory dataset and legacy upgrades
//! - `storage`: Local SQLite store and directory store
//! - `remote`: Sync API client
//! - `backend`: Active backend selection and startup resolution
//! - `archive`: Zip export and restore
//! - `usage`: Storage usage breakdown
//! - `config`: Application configuration

pub mod archive;
pub mod backend;
pub mod config;
pub mod models;
pub mod remote;
pub mod storage;
pub mod store;
pub mod usage;

pub use archive::ArchiveError;
pub use backend::{ActiveBackend, Reacquire};
pub use config::Config;
pub use models::{
    BackendKind, CalendarEvent, Dataset, Entity, EntityKind, LogEntry, LogType, Note,
    NoteRecording, Photo, Recording, SiteSettings, Template,
};
pub use remote::{RemoteError, RemoteStore};
pub use storage::{DirectoryHandle, DirectoryStore, LocalStore, StorageError};
pub use store::{DirectoryConnect, Store};
pub use usage::{StorageUsage, UsageCategory};
