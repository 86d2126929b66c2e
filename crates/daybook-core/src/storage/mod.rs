//! Storage layer
//!
//! Two on-device stores:
//!
//! - **LocalStore**: SQLite file in the data directory, always available
//! - **DirectoryStore**: plain files in a user-granted directory, so that
//!   external backup tools can mirror them
//!
//! Both hold the same dataset; which one is authoritative is decided by
//! the backend selector.

pub mod directory;
pub mod error;
pub mod layout;
pub mod local;
pub mod schema;

pub use directory::{directory_has_data, DirectoryHandle, DirectoryRecord, DirectoryStore};
pub use error::{StorageError, StorageResult};
pub use layout::{extension_for_mime, BlobEntity};
pub use local::LocalStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
