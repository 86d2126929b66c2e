//! Local structured store
//!
//! Durable keyed storage in a single SQLite file inside the data directory:
//! one table per entity kind plus a `meta` table for the settings record
//! and the persisted directory handle.
//!
//! ## Semantics
//!
//! - `get_all` returns records in insertion order (callers re-sort by date)
//! - `save` is an upsert by id; replacing a record keeps its position
//! - `delete` of an absent id is a no-op
//! - A full database surfaces as [`StorageError::DiskFull`]; nothing is retried

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{decode, decode_settings, Dataset, Entity, EntityKind, SiteSettings};
use crate::storage::directory::DirectoryHandle;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};

const SETTINGS_KEY: &str = "settings";
const DIRECTORY_HANDLE_KEY: &str = "directory_handle";

/// SQLite-backed local store
pub struct LocalStore {
    conn: Connection,
    path: PathBuf,
}

impl LocalStore {
    /// Open or create the store at the configured location
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_at(&config.local_db_path())
    }

    /// Open or create the store at a specific path
    pub fn open_at(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::from_sqlite(e, path.to_path_buf()))?;

        if needs_init(&conn) {
            init_schema(&conn).map_err(|e| StorageError::from_sqlite(e, path.to_path_buf()))?;
        }

        debug!("Opened local store at {:?}", path);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn db_error(&self, error: rusqlite::Error) -> StorageError {
        StorageError::from_sqlite(error, self.path.clone())
    }

    // ==================== Entity Operations ====================

    /// Get all records of a kind, in insertion order
    ///
    /// Rows that fail to decode, or blob-bearing rows without a payload,
    /// are skipped.
    pub fn get_all<T: Entity>(&self) -> StorageResult<Vec<T>> {
        let sql = format!("SELECT id, data, blob FROM {} ORDER BY seq", T::KIND.table());
        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.db_error(e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<Vec<u8>>>(2)?,
                ))
            })
            .map_err(|e| self.db_error(e))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, data, blob) = row.map_err(|e| self.db_error(e))?;

            let value = match serde_json::from_str(&data) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Skipping unreadable {} record {}: {}", T::KIND, id, e);
                    continue;
                }
            };
            let mut record: T = match decode(value) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping malformed {} record {}: {}", T::KIND, id, e);
                    continue;
                }
            };

            if T::KIND.has_blob() {
                match blob {
                    Some(bytes) => record.attach_blob(bytes),
                    None => {
                        warn!("Skipping {} record {} without payload", T::KIND, id);
                        continue;
                    }
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    /// Insert or replace a record by id
    pub fn save<T: Entity>(&self, record: &T) -> StorageResult<()> {
        let data = serde_json::to_string(record)?;
        let sql = format!(
            "INSERT INTO {} (id, data, blob) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, blob = excluded.blob",
            T::KIND.table()
        );
        self.conn
            .execute(&sql, params![record.id(), data, record.blob()])
            .map_err(|e| self.db_error(e))?;
        Ok(())
    }

    /// Remove a record by id; absent ids are ignored
    pub fn delete(&self, kind: EntityKind, id: &str) -> StorageResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        self.conn
            .execute(&sql, params![id])
            .map_err(|e| self.db_error(e))?;
        Ok(())
    }

    /// Number of stored records of a kind
    pub fn count(&self, kind: EntityKind) -> StorageResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| self.db_error(e))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ==================== Settings ====================

    /// Load the settings record, if one was ever saved
    pub fn load_settings(&self) -> StorageResult<Option<SiteSettings>> {
        let Some(raw) = self.get_meta(SETTINGS_KEY)? else {
            return Ok(None);
        };

        let value = serde_json::from_str(&raw).map_err(|e| StorageError::InvalidFormat {
            path: self.path.clone(),
            details: format!("settings: {}", e),
        })?;
        let settings = decode_settings(value).map_err(|e| StorageError::InvalidFormat {
            path: self.path.clone(),
            details: format!("settings: {}", e),
        })?;
        Ok(Some(settings))
    }

    /// Replace the settings record
    pub fn save_settings(&self, settings: &SiteSettings) -> StorageResult<()> {
        let raw = serde_json::to_string(settings)?;
        self.set_meta(SETTINGS_KEY, &raw)
    }

    // ==================== Directory Handle ====================

    /// The previously granted directory, if any
    pub fn directory_handle(&self) -> StorageResult<Option<DirectoryHandle>> {
        let Some(raw) = self.get_meta(DIRECTORY_HANDLE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                warn!("Ignoring unreadable directory handle: {}", e);
                Ok(None)
            }
        }
    }

    pub fn set_directory_handle(&self, handle: &DirectoryHandle) -> StorageResult<()> {
        let raw = serde_json::to_string(handle)?;
        self.set_meta(DIRECTORY_HANDLE_KEY, &raw)
    }

    pub fn clear_directory_handle(&self) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM meta WHERE key = ?1", params![DIRECTORY_HANDLE_KEY])
            .map_err(|e| self.db_error(e))?;
        Ok(())
    }

    // ==================== Whole Dataset ====================

    /// Load every collection plus settings
    pub fn load_dataset(&self) -> StorageResult<Dataset> {
        Ok(Dataset {
            settings: self.load_settings()?.unwrap_or_default(),
            templates: self.get_all()?,
            recordings: self.get_all()?,
            photos: self.get_all()?,
            notes: self.get_all()?,
            note_recordings: self.get_all()?,
            log_entries: self.get_all()?,
            calendar_events: self.get_all()?,
        })
    }

    /// Wipe every table and the settings key
    ///
    /// The directory handle is kept.
    pub fn clear_all(&self) -> StorageResult<()> {
        for kind in EntityKind::ALL {
            self.conn
                .execute(&format!("DELETE FROM {}", kind.table()), [])
                .map_err(|e| self.db_error(e))?;
        }
        self.conn
            .execute("DELETE FROM meta WHERE key = ?1", params![SETTINGS_KEY])
            .map_err(|e| self.db_error(e))?;
        Ok(())
    }

    /// Clear the store and write a whole dataset in one transaction
    pub fn replace_all(&mut self, dataset: &Dataset) -> StorageResult<()> {
        let path = self.path.clone();
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::from_sqlite(e, path.clone()))?;

        for kind in EntityKind::ALL {
            tx.execute(&format!("DELETE FROM {}", kind.table()), [])
                .map_err(|e| StorageError::from_sqlite(e, path.clone()))?;
        }

        insert_all(&tx, &dataset.templates, &path)?;
        insert_all(&tx, &dataset.recordings, &path)?;
        insert_all(&tx, &dataset.photos, &path)?;
        insert_all(&tx, &dataset.notes, &path)?;
        insert_all(&tx, &dataset.note_recordings, &path)?;
        insert_all(&tx, &dataset.log_entries, &path)?;
        insert_all(&tx, &dataset.calendar_events, &path)?;

        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![SETTINGS_KEY, serde_json::to_string(&dataset.settings)?],
        )
        .map_err(|e| StorageError::from_sqlite(e, path.clone()))?;

        tx.commit().map_err(|e| StorageError::from_sqlite(e, path))?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> StorageResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| self.db_error(e))
    }

    fn set_meta(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| self.db_error(e))?;
        Ok(())
    }
}

fn insert_all<T: Entity>(
    tx: &rusqlite::Transaction<'_>,
    records: &[T],
    path: &Path,
) -> StorageResult<()> {
    let sql = format!(
        "INSERT OR REPLACE INTO {} (id, data, blob) VALUES (?1, ?2, ?3)",
        T::KIND.table()
    );
    for record in records {
        let data = serde_json::to_string(record)?;
        tx.execute(&sql, params![record.id(), data, record.blob()])
            .map_err(|e| StorageError::from_sqlite(e, path.to_path_buf()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, LogEntry, LogType, Note, Photo, Recording, Template};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_get_all() {
        let store = LocalStore::open_in_memory().unwrap();
        let note = Note::new("Hello").with_content("<p>world</p>");

        store.save(&note).unwrap();

        let notes: Vec<Note> = store.get_all().unwrap();
        assert_eq!(notes, vec![note]);
    }

    #[test]
    fn test_idempotent_upsert() {
        let store = LocalStore::open_in_memory().unwrap();
        let template = Template::new("Summary", "Summarize this");

        store.save(&template).unwrap();
        store.save(&template).unwrap();

        let templates: Vec<Template> = store.get_all().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0], template);
    }

    #[test]
    fn test_upsert_keeps_insertion_order() {
        let store = LocalStore::open_in_memory().unwrap();
        let first = Note::new("first");
        let second = Note::new("second");
        store.save(&first).unwrap();
        store.save(&second).unwrap();

        let mut edited = first.clone();
        edited.title = "first, edited".to_string();
        store.save(&edited).unwrap();

        let notes: Vec<Note> = store.get_all().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].title, "first, edited");
        assert_eq!(notes[1].id, second.id);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = LocalStore::open_in_memory().unwrap();
        store.save(&LogEntry::new(LogType::ClockIn)).unwrap();

        store.delete(EntityKind::LogEntry, "nope").unwrap();

        assert_eq!(store.count(EntityKind::LogEntry).unwrap(), 1);
    }

    #[test]
    fn test_blob_round_trip() {
        let store = LocalStore::open_in_memory().unwrap();
        let recording = Recording::new("memo", vec![0, 1, 2, 255]);
        let photo = Photo::new("cat", "Pets", "image/png", vec![137, 80, 78, 71]);

        store.save(&recording).unwrap();
        store.save(&photo).unwrap();

        let recordings: Vec<Recording> = store.get_all().unwrap();
        let photos: Vec<Photo> = store.get_all().unwrap();
        assert_eq!(recordings[0].audio, vec![0, 1, 2, 255]);
        assert_eq!(photos[0], photo);
    }

    #[test]
    fn test_skips_malformed_rows() {
        let store = LocalStore::open_in_memory().unwrap();
        store.save(&Note::new("good")).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO notes (id, data) VALUES ('bad', '{not json')",
                [],
            )
            .unwrap();

        let notes: Vec<Note> = store.get_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "good");
    }

    #[test]
    fn test_settings_round_trip() {
        let store = LocalStore::open_in_memory().unwrap();
        assert!(store.load_settings().unwrap().is_none());

        let mut settings = SiteSettings::default();
        settings.site_name = "Lab notebook".to_string();
        settings.sync_backend = BackendKind::Directory;
        store.save_settings(&settings).unwrap();

        assert_eq!(store.load_settings().unwrap(), Some(settings));
    }

    #[test]
    fn test_directory_handle() {
        let store = LocalStore::open_in_memory().unwrap();
        assert!(store.directory_handle().unwrap().is_none());

        let handle = DirectoryHandle::new("/home/me/Daybook");
        store.set_directory_handle(&handle).unwrap();
        assert_eq!(store.directory_handle().unwrap(), Some(handle));

        store.clear_directory_handle().unwrap();
        assert!(store.directory_handle().unwrap().is_none());
    }

    #[test]
    fn test_clear_all_keeps_directory_handle() {
        let store = LocalStore::open_in_memory().unwrap();
        store.save(&Note::new("gone")).unwrap();
        store.save_settings(&SiteSettings::default()).unwrap();
        store
            .set_directory_handle(&DirectoryHandle::new("/tmp/daybook"))
            .unwrap();

        store.clear_all().unwrap();

        assert_eq!(store.count(EntityKind::Note).unwrap(), 0);
        assert!(store.load_settings().unwrap().is_none());
        assert!(store.directory_handle().unwrap().is_some());
    }

    #[test]
    fn test_replace_all() {
        let mut store = LocalStore::open_in_memory().unwrap();
        store.save(&Note::new("old")).unwrap();

        let mut dataset = Dataset::default();
        dataset.notes.push(Note::new("new"));
        dataset
            .recordings
            .push(Recording::new("memo", vec![4, 5, 6]));
        store.replace_all(&dataset).unwrap();

        let loaded = store.load_dataset().unwrap();
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("daybook.db");
        let note = Note::new("durable");

        {
            let store = LocalStore::open_at(&path).unwrap();
            store.save(&note).unwrap();
        }

        let store = LocalStore::open_at(&path).unwrap();
        let notes: Vec<Note> = store.get_all().unwrap();
        assert_eq!(notes, vec![note]);
    }
}
