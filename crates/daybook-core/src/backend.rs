//! Storage backend selector
//!
//! Exactly one backend is active at a time:
//!
//! - `Local`: the SQLite store in the data directory
//! - `Directory`: plain files in a user-granted directory
//! - `Api`: the self-hosted sync API
//!
//! This module holds the active backend, routes record writes to it, and
//! resolves which backend to use at startup. Transitions between backends
//! are driven by [`crate::store::Store`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::models::{BackendKind, Dataset, SiteSettings};
use crate::remote::RemoteStore;
use crate::storage::{
    DirectoryHandle, DirectoryRecord, DirectoryStore, LocalStore, StorageError,
};

/// Outcome of silently re-checking a persisted directory grant
#[derive(Debug)]
pub enum Reacquire {
    /// Access confirmed
    Granted(DirectoryStore),
    /// A directory was connected but is no longer usable
    Denied {
        handle: DirectoryHandle,
        error: StorageError,
    },
    /// No directory was ever connected
    NotConnected,
}

/// Re-check access to a persisted directory handle
pub fn try_reacquire(handle: Option<DirectoryHandle>) -> Reacquire {
    let Some(handle) = handle else {
        return Reacquire::NotConnected;
    };
    match DirectoryStore::open(&handle) {
        Ok(store) => Reacquire::Granted(store),
        Err(error) => Reacquire::Denied { handle, error },
    }
}

/// The backend currently holding the dataset
#[derive(Debug, Default)]
pub enum ActiveBackend {
    #[default]
    Local,
    Directory(DirectoryStore),
    Api(RemoteStore),
}

impl ActiveBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            ActiveBackend::Local => BackendKind::Local,
            ActiveBackend::Directory(_) => BackendKind::Directory,
            ActiveBackend::Api(_) => BackendKind::Api,
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        match self {
            ActiveBackend::Directory(dir) => Some(dir.root()),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ActiveBackend::Api(remote) => Some(remote.endpoint()),
            _ => None,
        }
    }

    /// Write one record to the active backend
    pub async fn save<T: DirectoryRecord>(&self, local: &LocalStore, record: &T) -> Result<()> {
        match self {
            ActiveBackend::Local => local
                .save(record)
                .with_context(|| format!("Failed to save {} locally", T::KIND)),
            ActiveBackend::Directory(dir) => dir
                .save(record)
                .with_context(|| format!("Failed to save {} to {:?}", T::KIND, dir.root())),
            ActiveBackend::Api(remote) => remote
                .save(record)
                .await
                .with_context(|| format!("Failed to save {} to sync server", T::KIND)),
        }
    }

    /// Delete one record from the active backend
    pub async fn delete<T: DirectoryRecord>(&self, local: &LocalStore, id: &str) -> Result<()> {
        match self {
            ActiveBackend::Local => local
                .delete(T::KIND, id)
                .with_context(|| format!("Failed to delete {} locally", T::KIND)),
            ActiveBackend::Directory(dir) => dir
                .delete::<T>(id)
                .with_context(|| format!("Failed to delete {} from {:?}", T::KIND, dir.root())),
            ActiveBackend::Api(remote) => remote
                .delete::<T>(id)
                .await
                .with_context(|| format!("Failed to delete {} on sync server", T::KIND)),
        }
    }

    /// Write settings to the active backend and always to the local store
    pub async fn save_settings(&self, local: &LocalStore, settings: &SiteSettings) -> Result<()> {
        match self {
            ActiveBackend::Local => {}
            ActiveBackend::Directory(dir) => dir
                .save_settings(settings)
                .with_context(|| format!("Failed to save settings to {:?}", dir.root()))?,
            ActiveBackend::Api(remote) => remote
                .save_settings(settings)
                .await
                .context("Failed to save settings to sync server")?,
        }
        local
            .save_settings(settings)
            .context("Failed to save settings locally")
    }
}

impl fmt::Display for ActiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveBackend::Local => write!(f, "local"),
            ActiveBackend::Directory(dir) => write!(f, "directory ({})", dir.root().display()),
            ActiveBackend::Api(remote) => write!(f, "api ({})", remote.endpoint()),
        }
    }
}

/// Result of the startup resolution
#[derive(Debug)]
pub struct Startup {
    pub backend: ActiveBackend,
    pub dataset: Dataset,
    /// Set when the preferred backend was unavailable
    pub notice: Option<String>,
}

/// Pick the backend to start with and load its dataset
///
/// Falls back to the local store whenever the preferred backend cannot be
/// used. The fallback is not persisted, so the next start tries again.
pub async fn resolve_startup(local: &LocalStore, timeout: Duration) -> Result<Startup> {
    let settings = local
        .load_settings()
        .context("Failed to read settings from local store")?
        .unwrap_or_default();

    match settings.sync_backend {
        BackendKind::Api => start_api(local, settings, timeout).await,
        BackendKind::Directory | BackendKind::Local => {
            let handle = local
                .directory_handle()
                .context("Failed to read directory handle")?;
            if handle.is_none() && settings.sync_backend == BackendKind::Local {
                return start_local(local, None);
            }
            start_directory(local, settings, handle)
        }
    }
}

fn start_directory(
    local: &LocalStore,
    settings: SiteSettings,
    handle: Option<DirectoryHandle>,
) -> Result<Startup> {
    match try_reacquire(handle) {
        Reacquire::Granted(dir) => match dir.load_dataset() {
            Ok(loaded) => {
                let mut dataset = loaded;
                dataset.settings = dataset.settings.keep_backend_of(&settings);
                dataset.settings.sync_backend = BackendKind::Directory;
                info!("Resumed directory backend at {:?}", dir.root());
                Ok(Startup {
                    backend: ActiveBackend::Directory(dir),
                    dataset,
                    notice: None,
                })
            }
            Err(e) => {
                warn!("Failed to load directory {:?}: {}", dir.root(), e);
                start_local(
                    local,
                    Some(format!(
                        "Could not read {}: {}. Using local storage.",
                        dir.root().display(),
                        e
                    )),
                )
            }
        },
        Reacquire::Denied { handle, error } => {
            warn!("Directory access lost for {:?}: {}", handle.path, error);
            start_local(
                local,
                Some(format!(
                    "Directory {} is no longer accessible ({}). Using local storage.",
                    handle.path.display(),
                    error
                )),
            )
        }
        Reacquire::NotConnected => start_local(
            local,
            Some("No directory is connected. Using local storage.".to_string()),
        ),
    }
}

async fn start_api(
    local: &LocalStore,
    settings: SiteSettings,
    timeout: Duration,
) -> Result<Startup> {
    let Some((endpoint, key)) = settings.api_credentials() else {
        return start_local(
            local,
            Some("Sync server credentials are missing. Using local storage.".to_string()),
        );
    };

    let attempt = async {
        let remote = RemoteStore::new(endpoint, key, timeout)?;
        remote.connect().await?;
        let dataset = remote.fetch_all().await?;
        Ok::<_, crate::remote::RemoteError>((remote, dataset))
    };

    match attempt.await {
        Ok((remote, mut dataset)) => {
            dataset.settings = dataset.settings.keep_backend_of(&settings);
            info!("Resumed api backend at {}", remote.endpoint());
            Ok(Startup {
                backend: ActiveBackend::Api(remote),
                dataset,
                notice: None,
            })
        }
        Err(e) => {
            warn!("Silent connect to {} failed: {}", endpoint, e);
            start_local(
                local,
                Some(format!(
                    "Could not connect to sync server ({}). Using local storage.",
                    e
                )),
            )
        }
    }
}

fn start_local(local: &LocalStore, notice: Option<String>) -> Result<Startup> {
    let mut dataset = local
        .load_dataset()
        .context("Failed to load data from local store")?;
    dataset.settings.sync_backend = BackendKind::Local;
    debug!("Using local backend");
    Ok(Startup {
        backend: ActiveBackend::Local,
        dataset,
        notice,
    })
}
