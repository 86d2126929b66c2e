//! Directory store
//!
//! Mirrors the dataset onto a user-chosen directory as plain files so that
//! external backup tools (cloud drive clients, rsync) can pick it up. See
//! [`crate::storage::layout`] for the file layout.
//!
//! Every call performs real file I/O, and loading always rebuilds the
//! collections from what is currently on disk. Partial states are tolerated:
//! a metadata file without its binary sibling, or a file that fails to
//! parse, is skipped with a warning rather than failing the load.
//!
//! Writes use atomic replace (write to a temp file, sync, rename) so an
//! interrupted write never leaves a half-written record behind.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{
    decode, decode_settings, CalendarEvent, Dataset, Entity, LogEntry, Note, NoteRecording, Photo,
    Recording, SiteSettings, Template,
};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::layout::{
    self, BlobEntity, CALENDAR_FILE, LOGS_FILE, NOTES_DIR, NOTE_RECORDINGS_DIR, PHOTOS_DIR,
    RECORDINGS_DIR, SETTINGS_FILE, TEMPLATES_FILE,
};

/// Name of the throwaway file used to verify write access
const ACCESS_MARKER: &str = ".daybook-access";

/// Persistable reference to a previously granted directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryHandle {
    pub path: PathBuf,
}

impl DirectoryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Check whether a directory already contains a recognizable dataset
///
/// True if any of the fixed top-level JSON files is non-empty, or any of
/// the record subdirectories has entries.
pub fn directory_has_data(root: &Path) -> StorageResult<bool> {
    for name in layout::ROOT_FILES {
        let path = root.join(name);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from_read(e, path)),
        }
    }

    for name in layout::RECORD_DIRS {
        let path = root.join(name);
        if !path.is_dir() {
            continue;
        }
        let mut entries = fs::read_dir(&path).map_err(|e| StorageError::from_read(e, path))?;
        if entries.next().is_some() {
            return Ok(true);
        }
    }

    Ok(false)
}

/// File-backed store rooted at a granted directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a granted directory, verifying it exists and is writable
    pub fn open(handle: &DirectoryHandle) -> StorageResult<Self> {
        check_access(&handle.path)?;
        debug!("Directory access granted for {:?}", handle.path);
        Ok(Self {
            root: handle.path.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn handle(&self) -> DirectoryHandle {
        DirectoryHandle::new(self.root.clone())
    }

    pub fn has_data(&self) -> StorageResult<bool> {
        directory_has_data(&self.root)
    }

    // ==================== Generic Operations ====================

    /// Load every record of a kind from disk
    pub fn load<T: DirectoryRecord>(&self) -> StorageResult<Vec<T>> {
        T::load_all(self)
    }

    /// Write one record
    pub fn save<T: DirectoryRecord>(&self, record: &T) -> StorageResult<()> {
        if !layout::is_safe_id(record.id()) {
            return Err(StorageError::InvalidFormat {
                path: self.root.clone(),
                details: format!("record id '{}' cannot be used as a file name", record.id()),
            });
        }
        T::save_one(self, record)
    }

    /// Remove one record; absent ids are ignored
    pub fn delete<T: DirectoryRecord>(&self, id: &str) -> StorageResult<()> {
        if !layout::is_safe_id(id) {
            return Ok(());
        }
        T::delete_one(self, id)
    }

    // ==================== Settings ====================

    /// Load `settings.json`, if present and readable
    pub fn load_settings(&self) -> StorageResult<Option<SiteSettings>> {
        let path = self.root.join(SETTINGS_FILE);
        let Some(value) = self.read_json(&path)? else {
            return Ok(None);
        };
        match decode_settings(value) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                warn!("Ignoring malformed {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    pub fn save_settings(&self, settings: &SiteSettings) -> StorageResult<()> {
        self.write_json(&self.root.join(SETTINGS_FILE), settings)
    }

    // ==================== Whole Dataset ====================

    /// Rebuild the full dataset from disk
    pub fn load_dataset(&self) -> StorageResult<Dataset> {
        let dataset = Dataset {
            settings: self.load_settings()?.unwrap_or_default(),
            templates: self.load()?,
            recordings: self.load()?,
            photos: self.load()?,
            notes: self.load()?,
            note_recordings: self.load()?,
            log_entries: self.load()?,
            calendar_events: self.load()?,
        };
        info!(
            "Loaded dataset from {:?}: {} notes, {} recordings, {} photos",
            self.root,
            dataset.notes.len(),
            dataset.recordings.len(),
            dataset.photos.len()
        );
        Ok(dataset)
    }

    /// Write a whole dataset (used to seed an empty directory)
    pub fn write_dataset(&self, dataset: &Dataset) -> StorageResult<()> {
        self.save_settings(&dataset.settings)?;
        self.write_json(&self.root.join(TEMPLATES_FILE), &dataset.templates)?;
        self.write_json(&self.root.join(LOGS_FILE), &dataset.log_entries)?;
        self.write_json(&self.root.join(CALENDAR_FILE), &dataset.calendar_events)?;
        for note in &dataset.notes {
            self.save(note)?;
        }
        for recording in &dataset.recordings {
            self.save(recording)?;
        }
        for note_recording in &dataset.note_recordings {
            self.save(note_recording)?;
        }
        for photo in &dataset.photos {
            self.save(photo)?;
        }
        info!("Seeded {:?} with current data", self.root);
        Ok(())
    }

    // ==================== List Files ====================

    fn load_list<T: Entity>(&self, file: &str) -> StorageResult<Vec<T>> {
        let path = self.root.join(file);
        let Some(value) = self.read_json(&path)? else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(StorageError::InvalidFormat {
                path,
                details: "expected a JSON array".to_string(),
            });
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match decode::<T>(item) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed entry in {:?}: {}", path, e),
            }
        }
        Ok(records)
    }

    fn read_list_raw(&self, file: &str) -> StorageResult<Vec<Value>> {
        let path = self.root.join(file);
        match self.read_json(&path)? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(StorageError::InvalidFormat {
                path,
                details: "expected a JSON array".to_string(),
            }),
        }
    }

    fn upsert_in_list<T: Entity>(&self, file: &str, record: &T) -> StorageResult<()> {
        let mut items = self.read_list_raw(file)?;
        let value = serde_json::to_value(record)?;
        match items.iter().position(|v| value_id(v) == Some(record.id())) {
            Some(pos) => items[pos] = value,
            None => items.push(value),
        }
        self.write_json(&self.root.join(file), &items)
    }

    fn remove_from_list(&self, file: &str, id: &str) -> StorageResult<()> {
        let mut items = self.read_list_raw(file)?;
        let before = items.len();
        items.retain(|v| value_id(v) != Some(id));
        if items.len() == before {
            return Ok(());
        }
        self.write_json(&self.root.join(file), &items)
    }

    // ==================== Per-record Files ====================

    fn load_notes(&self) -> StorageResult<Vec<Note>> {
        let dir = self.root.join(NOTES_DIR);
        let mut notes = Vec::new();
        for path in json_files(&dir)? {
            let Some(value) = self.read_record_json(&path) else {
                continue;
            };
            match decode::<Note>(value) {
                Ok(note) => notes.push(note),
                Err(e) => warn!("Skipping malformed note {:?}: {}", path, e),
            }
        }
        Ok(notes)
    }

    /// Load metadata/binary pairs from one directory
    fn load_blob_dir<T: BlobEntity>(&self, dir: &Path) -> StorageResult<Vec<T>> {
        let mut records = Vec::new();
        for meta_path in json_files(dir)? {
            let Some(value) = self.read_record_json(&meta_path) else {
                continue;
            };
            let mut record: T = match decode(value) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping malformed {} {:?}: {}", T::KIND, meta_path, e);
                    continue;
                }
            };

            let Some(stem) = meta_path.file_stem() else {
                continue;
            };
            let mut payload_name = stem.to_os_string();
            payload_name.push(".");
            payload_name.push(record.blob_extension());
            let payload_path = dir.join(payload_name);

            match fs::read(&payload_path) {
                Ok(bytes) => {
                    record.attach_blob(bytes);
                    records.push(record);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(
                        "Skipping {} {}: binary {:?} is missing",
                        T::KIND,
                        record.id(),
                        payload_path
                    );
                }
                Err(e) => {
                    warn!("Skipping {} {}: {}", T::KIND, record.id(), e);
                }
            }
        }
        Ok(records)
    }

    fn save_blob_record<T: BlobEntity>(&self, record: &T) -> StorageResult<()> {
        let payload = record.blob().unwrap_or_default();
        // Binary first, so a metadata file never points at a missing payload
        atomic_write(&self.root.join(record.payload_path()), payload)?;
        self.write_json(&self.root.join(record.meta_path()), record)
    }

    fn load_photos(&self) -> StorageResult<Vec<Photo>> {
        let photos_dir = self.root.join(PHOTOS_DIR);
        let mut photos = Vec::new();
        for folder in subdirectories(&photos_dir)? {
            photos.extend(self.load_blob_dir::<Photo>(&folder)?);
        }
        Ok(photos)
    }

    fn save_photo(&self, photo: &Photo) -> StorageResult<()> {
        self.save_blob_record(photo)?;

        // Only once the new pair is on disk: drop copies left in another
        // folder or under an old extension
        let target = self.root.join(photo.blob_dir());
        let keep = [
            self.root.join(photo.meta_path()),
            self.root.join(photo.payload_path()),
        ];
        for folder in subdirectories(&self.root.join(PHOTOS_DIR))? {
            if folder == target {
                remove_record_files_except(&folder, &photo.id, &keep)?;
            } else {
                remove_record_files(&folder, &photo.id)?;
                let _ = fs::remove_dir(&folder);
            }
        }
        Ok(())
    }

    fn delete_photo(&self, id: &str) -> StorageResult<()> {
        for folder in subdirectories(&self.root.join(PHOTOS_DIR))? {
            remove_record_files(&folder, id)?;
            let _ = fs::remove_dir(&folder);
        }
        Ok(())
    }

    // ==================== JSON helpers ====================

    /// Read a JSON file; `None` if it does not exist
    fn read_json(&self, path: &Path) -> StorageResult<Option<Value>> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_read(e, path.to_path_buf())),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::InvalidFormat {
                path: path.to_path_buf(),
                details: e.to_string(),
            })
    }

    /// Read a per-record JSON file, skipping it on any failure
    fn read_record_json(&self, path: &Path) -> Option<Value> {
        match self.read_json(path) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                warn!("Skipping empty record file {:?}", path);
                None
            }
            Err(e) => {
                warn!("Skipping unreadable record file {:?}: {}", path, e);
                None
            }
        }
    }

    fn write_json<S: Serialize + ?Sized>(&self, path: &Path, value: &S) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        atomic_write(path, &bytes)
    }
}

/// Per-kind file mapping for the directory store
pub trait DirectoryRecord: Entity {
    fn load_all(store: &DirectoryStore) -> StorageResult<Vec<Self>>;
    fn save_one(store: &DirectoryStore, record: &Self) -> StorageResult<()>;
    fn delete_one(store: &DirectoryStore, id: &str) -> StorageResult<()>;
}

macro_rules! list_file_record {
    ($ty:ty, $file:expr) => {
        impl DirectoryRecord for $ty {
            fn load_all(store: &DirectoryStore) -> StorageResult<Vec<Self>> {
                store.load_list($file)
            }

            fn save_one(store: &DirectoryStore, record: &Self) -> StorageResult<()> {
                store.upsert_in_list($file, record)
            }

            fn delete_one(store: &DirectoryStore, id: &str) -> StorageResult<()> {
                store.remove_from_list($file, id)
            }
        }
    };
}

list_file_record!(Template, TEMPLATES_FILE);
list_file_record!(LogEntry, LOGS_FILE);
list_file_record!(CalendarEvent, CALENDAR_FILE);

impl DirectoryRecord for Note {
    fn load_all(store: &DirectoryStore) -> StorageResult<Vec<Self>> {
        store.load_notes()
    }

    fn save_one(store: &DirectoryStore, record: &Self) -> StorageResult<()> {
        store.write_json(&store.root.join(layout::note_path(&record.id)), record)
    }

    fn delete_one(store: &DirectoryStore, id: &str) -> StorageResult<()> {
        remove_if_exists(&store.root.join(layout::note_path(id)))
    }
}

macro_rules! flat_blob_record {
    ($ty:ty, $dir:expr) => {
        impl DirectoryRecord for $ty {
            fn load_all(store: &DirectoryStore) -> StorageResult<Vec<Self>> {
                store.load_blob_dir(&store.root.join($dir))
            }

            fn save_one(store: &DirectoryStore, record: &Self) -> StorageResult<()> {
                store.save_blob_record(record)
            }

            fn delete_one(store: &DirectoryStore, id: &str) -> StorageResult<()> {
                remove_record_files(&store.root.join($dir), id)
            }
        }
    };
}

flat_blob_record!(Recording, RECORDINGS_DIR);
flat_blob_record!(NoteRecording, NOTE_RECORDINGS_DIR);

impl DirectoryRecord for Photo {
    fn load_all(store: &DirectoryStore) -> StorageResult<Vec<Self>> {
        store.load_photos()
    }

    fn save_one(store: &DirectoryStore, record: &Self) -> StorageResult<()> {
        store.save_photo(record)
    }

    fn delete_one(store: &DirectoryStore, id: &str) -> StorageResult<()> {
        store.delete_photo(id)
    }
}

/// Verify that a directory exists and can be written to
fn check_access(path: &Path) -> StorageResult<()> {
    let meta = fs::metadata(path).map_err(|e| StorageError::from_read(e, path.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(StorageError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    let marker = path.join(ACCESS_MARKER);
    fs::write(&marker, b"").map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;
    let _ = fs::remove_file(&marker);
    Ok(())
}

fn value_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// `*.json` files in a directory, sorted by name; empty if the directory is absent
fn json_files(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::from_read(e, dir.to_path_buf())),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| StorageError::from_read(e, dir.to_path_buf()))?
            .path();
        if path.is_file() && path.extension() == Some(OsStr::new("json")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Immediate subdirectories, sorted by name; empty if the directory is absent
fn subdirectories(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::from_read(e, dir.to_path_buf())),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| StorageError::from_read(e, dir.to_path_buf()))?
            .path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Remove every file in `dir` whose stem is `id` (metadata and any binary)
fn remove_record_files(dir: &Path, id: &str) -> StorageResult<()> {
    remove_record_files_except(dir, id, &[])
}

fn remove_record_files_except(dir: &Path, id: &str, keep: &[PathBuf]) -> StorageResult<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::from_read(e, dir.to_path_buf())),
    };

    for entry in entries {
        let path = entry
            .map_err(|e| StorageError::from_read(e, dir.to_path_buf()))?
            .path();
        if path.is_file() && path.file_stem() == Some(OsStr::new(id)) && !keep.contains(&path) {
            remove_if_exists(&path)?;
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::from_io(e, path.to_path_buf())),
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
