//! Unified storage interface
//!
//! The `Store` owns the in-memory dataset, the local store and the active
//! backend, and is the only place backend transitions happen.
//!
//! ## Write path
//!
//! Every mutation is written to the active backend first. The in-memory
//! dataset is only updated once that write succeeded, so a failed write
//! leaves memory matching what is stored.
//!
//! ## Transitions
//!
//! - `connect_directory`: adopt the directory if it already holds data,
//!   otherwise seed it from memory. Local tables are left untouched.
//! - `disconnect` from a directory: forget the handle, reload from local.
//! - `connect_api`: check, fetch everything, then replace memory. Nothing
//!   changes if any step fails.
//! - `disconnect` from the api: clear credentials, reload from local.
//! - `import_archive`: destructive restore into the local store.
//!
//! Moving between directory and api always passes through an implicit
//! stop of the old backend; the two are never merged.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open(Config::load()?).await?;
//! store.save(Note::new("Groceries")).await?;
//! store.connect_directory(Path::new("/home/me/Daybook")).await?;
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::archive;
use crate::backend::{resolve_startup, ActiveBackend};
use crate::config::Config;
use crate::models::{BackendKind, Dataset, Note, NoteRecording, SiteSettings};
use crate::remote::RemoteStore;
use crate::storage::{DirectoryHandle, DirectoryRecord, DirectoryStore, LocalStore};
use crate::usage::StorageUsage;

/// What happened when a directory was connected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryConnect {
    /// The directory already held data, which replaced memory
    Adopted,
    /// The directory was empty and received the current data
    Seeded,
}

/// Unified storage interface for Daybook
pub struct Store {
    config: Config,
    local: LocalStore,
    backend: ActiveBackend,
    dataset: Dataset,
    notice: Option<String>,
}

impl Store {
    /// Open the local store and resume the last active backend
    ///
    /// If that backend is unavailable the store starts in local mode and
    /// [`Store::notice`] explains why.
    pub async fn open(config: Config) -> Result<Self> {
        let local = LocalStore::open(&config).context("Failed to open local store")?;
        Self::open_with_local(config, local).await
    }

    /// Open with an already opened local store
    pub async fn open_with_local(config: Config, local: LocalStore) -> Result<Self> {
        let startup = resolve_startup(&local, config.remote_timeout()).await?;
        Ok(Self {
            config,
            local,
            backend: startup.backend,
            dataset: startup.dataset,
            notice: startup.notice,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.dataset.settings
    }

    pub fn active_backend(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &ActiveBackend {
        &self.backend
    }

    /// Root of the connected directory, in directory mode
    pub fn directory(&self) -> Option<&Path> {
        self.backend.directory()
    }

    /// One-time notice from startup, if a fallback happened
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // ==================== Records ====================

    /// Create or update a record
    pub async fn save<T: DirectoryRecord>(&mut self, record: T) -> Result<()> {
        self.backend.save(&self.local, &record).await?;
        self.dataset.upsert(record);
        Ok(())
    }

    /// Delete a record; unknown ids are a no-op
    pub async fn delete<T: DirectoryRecord>(&mut self, id: &str) -> Result<()> {
        self.backend.delete::<T>(&self.local, id).await?;
        self.dataset.remove::<T>(id);
        Ok(())
    }

    /// Delete a note together with the recordings scoped to it
    pub async fn delete_note(&mut self, id: &str) -> Result<()> {
        let owned: Vec<String> = self
            .dataset
            .note_recordings
            .iter()
            .filter(|r| r.note_id == id)
            .map(|r| r.id.clone())
            .collect();
        for recording_id in owned {
            self.delete::<NoteRecording>(&recording_id).await?;
        }
        self.delete::<Note>(id).await
    }

    /// Replace the settings record
    ///
    /// Backend selector fields cannot be changed here; use the connect
    /// and disconnect operations.
    pub async fn save_settings(&mut self, settings: SiteSettings) -> Result<()> {
        let settings = settings.keep_backend_of(&self.dataset.settings);
        self.backend.save_settings(&self.local, &settings).await?;
        self.dataset.settings = settings;
        Ok(())
    }

    // ==================== Backend transitions ====================

    /// Whether a directory already holds a dataset
    ///
    /// Connecting such a directory replaces the current data, so callers
    /// should confirm first.
    pub fn directory_has_data(&self, path: &Path) -> Result<bool> {
        let dir = DirectoryStore::open(&DirectoryHandle::new(path))
            .with_context(|| format!("Cannot use {:?}", path))?;
        dir.has_data()
            .with_context(|| format!("Failed to inspect {:?}", path))
    }

    /// Switch to directory mode
    pub async fn connect_directory(&mut self, path: &Path) -> Result<DirectoryConnect> {
        let handle = DirectoryHandle::new(path);
        let dir = DirectoryStore::open(&handle).with_context(|| format!("Cannot use {:?}", path))?;

        // Leaving the api stops it first: seed from the local store, never
        // from the server's data.
        let base = if self.backend.kind() == BackendKind::Api {
            let mut local = self
                .local
                .load_dataset()
                .context("Failed to load data from local store")?;
            local.settings.api_endpoint = None;
            local.settings.api_key = None;
            local
        } else {
            self.dataset.clone()
        };

        let mut settings = base.settings.clone();
        settings.sync_backend = BackendKind::Directory;

        let has_data = dir
            .has_data()
            .with_context(|| format!("Failed to inspect {:?}", path))?;

        let (dataset, outcome) = if has_data {
            let mut adopted = dir
                .load_dataset()
                .with_context(|| format!("Failed to load data from {:?}", path))?;
            adopted.settings = adopted.settings.keep_backend_of(&settings);
            dir.save_settings(&adopted.settings)
                .with_context(|| format!("Failed to write settings to {:?}", path))?;
            (adopted, DirectoryConnect::Adopted)
        } else {
            let mut seeded = base;
            seeded.settings = settings;
            dir.write_dataset(&seeded)
                .with_context(|| format!("Failed to seed {:?}", path))?;
            (seeded, DirectoryConnect::Seeded)
        };

        self.local
            .set_directory_handle(&handle)
            .context("Failed to remember directory")?;
        self.local
            .save_settings(&dataset.settings)
            .context("Failed to save settings locally")?;

        info!("Connected directory {:?} ({:?})", path, outcome);
        self.backend = ActiveBackend::Directory(dir);
        self.dataset = dataset;
        self.notice = None;
        Ok(outcome)
    }

    /// Switch to the sync API; on any failure nothing changes
    pub async fn connect_api(&mut self, endpoint: &str, api_key: &str) -> Result<()> {
        let remote = RemoteStore::new(endpoint, api_key, self.config.remote_timeout())?;
        remote
            .connect()
            .await
            .with_context(|| format!("Failed to connect to {}", endpoint))?;
        let mut dataset = remote
            .fetch_all()
            .await
            .with_context(|| format!("Failed to fetch data from {}", endpoint))?;

        let mut settings = self.dataset.settings.clone();
        settings.sync_backend = BackendKind::Api;
        settings.api_endpoint = Some(endpoint.to_string());
        settings.api_key = Some(api_key.to_string());
        dataset.settings = dataset.settings.keep_backend_of(&settings);

        if self.backend.kind() == BackendKind::Directory {
            self.local
                .clear_directory_handle()
                .context("Failed to forget directory")?;
        }
        self.local
            .save_settings(&dataset.settings)
            .context("Failed to save settings locally")?;

        info!("Connected to sync server {}", remote.endpoint());
        self.backend = ActiveBackend::Api(remote);
        self.dataset = dataset;
        self.notice = None;
        Ok(())
    }

    /// Return to local mode
    ///
    /// Returns false if the local backend was already active.
    pub async fn disconnect(&mut self) -> Result<bool> {
        let previous = self.backend.kind();
        match previous {
            BackendKind::Local => return Ok(false),
            BackendKind::Directory => self
                .local
                .clear_directory_handle()
                .context("Failed to forget directory")?,
            BackendKind::Api => {}
        }

        let mut settings = self
            .local
            .load_settings()
            .context("Failed to read settings from local store")?
            .unwrap_or_else(|| self.dataset.settings.clone());
        settings.sync_backend = BackendKind::Local;
        if previous == BackendKind::Api {
            settings.api_endpoint = None;
            settings.api_key = None;
        }
        self.local
            .save_settings(&settings)
            .context("Failed to save settings locally")?;

        let mut dataset = self
            .local
            .load_dataset()
            .context("Failed to load data from local store")?;
        dataset.settings = settings;

        info!("Disconnected {} backend", previous);
        self.backend = ActiveBackend::Local;
        self.dataset = dataset;
        Ok(true)
    }

    // ==================== Archive ====================

    /// Serialize the current dataset into archive bytes
    pub fn export_archive(&self) -> Result<Vec<u8>> {
        archive::write_archive(&self.dataset).context("Failed to build archive")
    }

    /// Restore from archive bytes
    ///
    /// The archive is fully parsed before anything changes. After that the
    /// restore is total: the directory is disconnected, the api dropped,
    /// the local store replaced and memory replaced.
    pub async fn import_archive(&mut self, bytes: &[u8]) -> Result<()> {
        let mut dataset = archive::read_archive(bytes).context("Failed to read archive")?;
        dataset.settings.sync_backend = BackendKind::Local;

        self.local
            .clear_directory_handle()
            .context("Failed to forget directory")?;
        self.local
            .replace_all(&dataset)
            .context("Failed to write restored data to local store")?;

        info!(
            "Restored archive: {} notes, {} recordings, {} photos",
            dataset.notes.len(),
            dataset.recordings.len(),
            dataset.photos.len()
        );
        self.backend = ActiveBackend::Local;
        self.dataset = dataset;
        self.notice = None;
        Ok(())
    }

    // ==================== Housekeeping ====================

    pub fn storage_usage(&self) -> StorageUsage {
        StorageUsage::compute(&self.dataset)
    }

    /// Wipe the local store
    ///
    /// In local mode memory is reset too. With another backend active only
    /// the local copy goes; the current settings are written back so the
    /// next start still finds that backend.
    pub fn clear_local_data(&mut self) -> Result<()> {
        self.local.clear_all().context("Failed to clear local store")?;

        if self.backend.kind() == BackendKind::Local {
            self.dataset = Dataset::default();
        } else {
            self.local
                .save_settings(&self.dataset.settings)
                .context("Failed to save settings locally")?;
        }
        info!("Cleared local data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Photo, Recording, Template};
    use crate::storage::layout::{NOTES_DIR, PHOTOS_DIR, RECORDINGS_DIR};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_store(temp_dir: &TempDir) -> Store {
        let config = Config {
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        };
        Store::open(config).await.unwrap()
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    async fn mock_api(dataset: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dataset))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        let note = Note::new("persisted");
        store.save(note.clone()).await.unwrap();
        drop(store);

        let store = test_store(&temp_dir).await;
        assert_eq!(store.dataset().notes, vec![note]);
        assert_eq!(store.active_backend(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_idempotent_upsert() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        let template = Template::new("Daily", "What happened today?");

        store.save(template.clone()).await.unwrap();
        store.save(template.clone()).await.unwrap();

        assert_eq!(store.dataset().templates, vec![template]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("stays")).await.unwrap();

        store.delete::<Note>("does-not-exist").await.unwrap();
        assert_eq!(store.dataset().notes.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_note_removes_its_recordings() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        let note = Note::new("meeting");
        let other = Note::new("other");
        store.save(note.clone()).await.unwrap();
        store.save(other.clone()).await.unwrap();
        store
            .save(NoteRecording::new(&note.id, "aside", vec![1]))
            .await
            .unwrap();
        store
            .save(NoteRecording::new(&other.id, "keep", vec![2]))
            .await
            .unwrap();

        store.delete_note(&note.id).await.unwrap();

        assert_eq!(store.dataset().notes, vec![other]);
        assert_eq!(store.dataset().note_recordings.len(), 1);
        assert_eq!(store.dataset().note_recordings[0].name, "keep");
    }

    #[tokio::test]
    async fn test_seed_new_directory() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;

        for title in ["one", "two", "three"] {
            store.save(Note::new(title)).await.unwrap();
        }
        let photo = Photo::new("cat", "Pets", "image/jpeg", vec![1, 2, 3]);
        store.save(photo.clone()).await.unwrap();
        let before = store.dataset().clone();

        assert!(!store.directory_has_data(target.path()).unwrap());
        let outcome = store.connect_directory(target.path()).await.unwrap();

        assert_eq!(outcome, DirectoryConnect::Seeded);
        assert_eq!(file_count(&target.path().join(NOTES_DIR)), 3);
        let pets = target.path().join(PHOTOS_DIR).join("Pets");
        assert_eq!(file_count(&pets), 2);
        assert!(pets.join(format!("{}.json", photo.id)).exists());
        assert!(pets.join(format!("{}.jpeg", photo.id)).exists());

        assert_eq!(store.dataset().notes, before.notes);
        assert_eq!(store.dataset().photos, before.photos);
        assert_eq!(store.active_backend(), BackendKind::Directory);
        assert_eq!(store.directory(), Some(target.path()));
    }

    #[tokio::test]
    async fn test_adopt_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        let existing = DirectoryStore::open(&DirectoryHandle::new(target.path())).unwrap();
        let first = Recording::new("first", vec![1]);
        let second = Recording::new("second", vec![2, 2]);
        existing.save(&first).unwrap();
        existing.save(&second).unwrap();

        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("will be replaced")).await.unwrap();
        store.save(Recording::new("old", vec![9])).await.unwrap();

        assert!(store.directory_has_data(target.path()).unwrap());
        let outcome = store.connect_directory(target.path()).await.unwrap();

        assert_eq!(outcome, DirectoryConnect::Adopted);
        assert!(store.dataset().notes.is_empty());
        let mut names: Vec<&str> = store
            .dataset()
            .recordings
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["first", "second"]);

        // Local tables are untouched
        drop(store);
        let local = LocalStore::open_at(&temp_dir.path().join("data").join("daybook.db")).unwrap();
        assert_eq!(local.get_all::<Note>().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_writes_go_to_directory() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.connect_directory(target.path()).await.unwrap();

        let recording = Recording::new("memo", vec![4, 5]);
        store.save(recording.clone()).await.unwrap();
        assert!(target
            .path()
            .join(RECORDINGS_DIR)
            .join(format!("{}.webm", recording.id))
            .exists());

        store.delete::<Recording>(&recording.id).await.unwrap();
        assert_eq!(file_count(&target.path().join(RECORDINGS_DIR)), 0);
        assert!(store.dataset().recordings.is_empty());
    }

    #[tokio::test]
    async fn test_switch_round_trip_is_non_destructive() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("a")).await.unwrap();
        store
            .save(Photo::new("p", "Album", "image/png", vec![8]))
            .await
            .unwrap();

        store.connect_directory(target.path()).await.unwrap();
        store.save(Note::new("only in directory")).await.unwrap();
        let in_directory = store.dataset().clone();

        assert!(store.disconnect().await.unwrap());
        assert_eq!(store.active_backend(), BackendKind::Local);
        assert_eq!(store.dataset().notes.len(), 1);

        let outcome = store.connect_directory(target.path()).await.unwrap();
        assert_eq!(outcome, DirectoryConnect::Adopted);
        let mut expected = in_directory.notes.clone();
        let mut actual = store.dataset().notes.clone();
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        actual.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(actual, expected);
        assert_eq!(store.dataset().photos, in_directory.photos);
    }

    #[tokio::test]
    async fn test_reopen_resumes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.connect_directory(target.path()).await.unwrap();
        store.save(Note::new("dir note")).await.unwrap();
        drop(store);

        let store = test_store(&temp_dir).await;
        assert_eq!(store.active_backend(), BackendKind::Directory);
        assert_eq!(store.dataset().notes[0].title, "dir note");
        assert!(store.notice().is_none());
    }

    #[tokio::test]
    async fn test_connect_api_replaces_memory() {
        let temp_dir = TempDir::new().unwrap();
        let server = mock_api(json!({
            "settings": {"siteName": "Server"},
            "notes": [{"id": "n1", "title": "remote", "date": "2024-05-01T10:00:00Z"}]
        }))
        .await;

        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("local")).await.unwrap();
        store.connect_api(&server.uri(), "secret").await.unwrap();

        assert_eq!(store.active_backend(), BackendKind::Api);
        assert_eq!(store.dataset().notes.len(), 1);
        assert_eq!(store.dataset().notes[0].title, "remote");
        assert_eq!(store.settings().site_name, "Server");
        assert_eq!(store.settings().api_key.as_deref(), Some("secret"));

        assert!(store.disconnect().await.unwrap());
        assert_eq!(store.dataset().notes[0].title, "local");
        assert!(store.settings().api_key.is_none());
        assert_eq!(store.settings().sync_backend, BackendKind::Local);
    }

    #[tokio::test]
    async fn test_connect_api_failure_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("keep me")).await.unwrap();
        let before = store.dataset().clone();

        assert!(store.connect_api(&server.uri(), "wrong").await.is_err());
        assert_eq!(store.dataset(), &before);
        assert_eq!(store.active_backend(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_directory_to_api_drops_handle() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let server = mock_api(json!({})).await;

        let mut store = test_store(&temp_dir).await;
        store.connect_directory(target.path()).await.unwrap();
        store.connect_api(&server.uri(), "k").await.unwrap();

        assert_eq!(store.directory(), None);
        let local = &store.local;
        assert!(local.directory_handle().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_to_empty_directory_seeds_local_data() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let server = mock_api(json!({
            "notes": [{"id": "n1", "title": "remote only", "date": "2024-05-01T10:00:00Z"}]
        }))
        .await;

        let mut store = test_store(&temp_dir).await;
        let local_note = Note::new("local only");
        store.save(local_note.clone()).await.unwrap();
        store.connect_api(&server.uri(), "secret").await.unwrap();
        assert_eq!(store.dataset().notes[0].title, "remote only");

        let outcome = store.connect_directory(target.path()).await.unwrap();

        assert_eq!(outcome, DirectoryConnect::Seeded);
        assert_eq!(store.dataset().notes, vec![local_note.clone()]);
        assert_eq!(file_count(&target.path().join(NOTES_DIR)), 1);
        assert!(target
            .path()
            .join(NOTES_DIR)
            .join(format!("{}.json", local_note.id))
            .exists());
        assert!(store.settings().api_key.is_none());
        assert!(store.settings().api_endpoint.is_none());
    }

    #[tokio::test]
    async fn test_connect_api_fetch_failure_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("keep me")).await.unwrap();
        let before = store.dataset().clone();

        assert!(store.connect_api(&server.uri(), "key").await.is_err());
        assert_eq!(store.dataset(), &before);
        assert_eq!(store.active_backend(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_connect_api_malformed_data_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("keep me")).await.unwrap();
        let before = store.dataset().clone();

        assert!(store.connect_api(&server.uri(), "key").await.is_err());
        assert_eq!(store.dataset(), &before);
        assert_eq!(store.active_backend(), BackendKind::Local);
        drop(store);

        let store = test_store(&temp_dir).await;
        assert_eq!(store.active_backend(), BackendKind::Local);
    }

    #[tokio::test]
    async fn test_restore_from_archive() {
        let temp_dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("backed up")).await.unwrap();
        store
            .save(Recording::new("memo", vec![1, 2, 3]))
            .await
            .unwrap();
        let archive = store.export_archive().unwrap();
        let exported = store.dataset().clone();

        store.save(Note::new("after backup")).await.unwrap();
        store.connect_directory(target.path()).await.unwrap();

        store.import_archive(&archive).await.unwrap();
        assert_eq!(store.active_backend(), BackendKind::Local);
        assert_eq!(store.dataset().notes, exported.notes);
        assert_eq!(store.dataset().recordings, exported.recordings);

        // Survives a restart in local mode
        drop(store);
        let store = test_store(&temp_dir).await;
        assert_eq!(store.active_backend(), BackendKind::Local);
        assert_eq!(store.dataset().notes, exported.notes);
    }

    #[tokio::test]
    async fn test_bad_archive_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("safe")).await.unwrap();
        let before = store.dataset().clone();

        assert!(store.import_archive(b"not a zip").await.is_err());
        assert_eq!(store.dataset(), &before);
    }

    #[tokio::test]
    async fn test_settings_keep_backend() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;

        let mut settings = store.settings().clone();
        settings.site_name = "Journal".to_string();
        settings.sync_backend = BackendKind::Api;
        store.save_settings(settings).await.unwrap();

        assert_eq!(store.settings().site_name, "Journal");
        assert_eq!(store.settings().sync_backend, BackendKind::Local);
    }

    #[tokio::test]
    async fn test_clear_local_data() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir).await;
        store.save(Note::new("gone soon")).await.unwrap();

        store.clear_local_data().unwrap();
        assert!(store.dataset().is_empty());
        assert!(store.storage_usage().is_empty());
    }
}
