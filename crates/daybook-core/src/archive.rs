//! Archive codec
//!
//! Export and restore the whole dataset as a single zip file. The archive
//! contains the directory layout (see [`crate::storage::layout`]) plus an
//! aggregate `metadata.json` manifest holding settings, templates, notes,
//! log entries and calendar events.
//!
//! On restore, scalar collections come from the manifest. Blob-bearing
//! records are rebuilt by pairing each metadata entry with its binary
//! sibling `<same-base-name>.<derived-extension>`; entries whose sibling is
//! missing are dropped. A missing or unparsable manifest fails the whole
//! read, so callers can abort before touching any state.
//!
//! The sync API key is never written to an archive; the endpoint is.

use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::models::{
    decode, decode_settings, CalendarEvent, Dataset, LogEntry, Note, NoteRecording, Photo,
    Recording, SiteSettings, Template,
};
use crate::storage::layout::{
    self, archive_name, BlobEntity, CALENDAR_FILE, LOGS_FILE, NOTE_RECORDINGS_DIR, PHOTOS_DIR,
    RECORDINGS_DIR, SETTINGS_FILE, TEMPLATES_FILE,
};

/// Name of the manifest entry
pub const MANIFEST_FILE: &str = "metadata.json";

/// Manifest format version written by this build
pub const ARCHIVE_VERSION: u32 = 1;

/// Errors reading or writing an archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Not a backup archive: '{MANIFEST_FILE}' is missing")]
    MissingManifest,

    #[error("Invalid backup manifest: {0}")]
    InvalidManifest(String),

    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestOut<'a> {
    version: u32,
    exported_at: DateTime<Utc>,
    settings: &'a SiteSettings,
    templates: &'a [Template],
    notes: &'a [Note],
    log_entries: &'a [LogEntry],
    calendar_events: &'a [CalendarEvent],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestIn {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    settings: Option<Value>,
    #[serde(default)]
    templates: Vec<Value>,
    #[serde(default)]
    notes: Vec<Value>,
    #[serde(default)]
    log_entries: Vec<Value>,
    #[serde(default)]
    calendar_events: Vec<Value>,
}

/// Default file name for an export made at `now`
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("daybook-backup-{}.zip", now.format("%Y-%m-%d"))
}

/// Serialize a dataset into zip bytes
pub fn write_archive(dataset: &Dataset) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ArchiveWriter::new();
    let settings = dataset.settings.without_api_key();

    let manifest = ManifestOut {
        version: ARCHIVE_VERSION,
        exported_at: Utc::now(),
        settings: &settings,
        templates: &dataset.templates,
        notes: &dataset.notes,
        log_entries: &dataset.log_entries,
        calendar_events: &dataset.calendar_events,
    };
    writer.json(MANIFEST_FILE, &manifest)?;

    writer.json(SETTINGS_FILE, &settings)?;
    writer.json(TEMPLATES_FILE, &dataset.templates)?;
    writer.json(LOGS_FILE, &dataset.log_entries)?;
    writer.json(CALENDAR_FILE, &dataset.calendar_events)?;
    for note in &dataset.notes {
        writer.json(&archive_name(&layout::note_path(&note.id)), note)?;
    }

    writer.blob_records(&dataset.recordings)?;
    writer.blob_records(&dataset.note_recordings)?;
    writer.blob_records(&dataset.photos)?;

    let bytes = writer.finish()?;
    info!(
        "Exported archive: {} bytes, {} notes, {} recordings, {} photos",
        bytes.len(),
        dataset.notes.len(),
        dataset.recordings.len(),
        dataset.photos.len()
    );
    Ok(bytes)
}

/// Parse zip bytes back into a dataset
pub fn read_archive(bytes: &[u8]) -> Result<Dataset, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let manifest = read_manifest(&mut archive)?;
    if let Some(version) = manifest.version {
        if version > ARCHIVE_VERSION {
            warn!(
                "Archive version {} is newer than supported version {}",
                version, ARCHIVE_VERSION
            );
        }
    }

    let settings = match manifest.settings {
        None | Some(Value::Null) => SiteSettings::default(),
        Some(value) => {
            decode_settings(value).map_err(|e| ArchiveError::InvalidManifest(e.to_string()))?
        }
    };

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        names.push(archive.by_index(index)?.name().to_string());
    }

    let dataset = Dataset {
        settings,
        templates: decode_manifest_list(manifest.templates)?,
        notes: decode_manifest_list(manifest.notes)?,
        log_entries: decode_manifest_list(manifest.log_entries)?,
        calendar_events: decode_manifest_list(manifest.calendar_events)?,
        recordings: read_blob_records(&mut archive, &names, RECORDINGS_DIR, 2)?,
        note_recordings: read_blob_records(&mut archive, &names, NOTE_RECORDINGS_DIR, 2)?,
        photos: read_blob_records(&mut archive, &names, PHOTOS_DIR, 3)?,
    };

    info!(
        "Read archive: {} notes, {} recordings, {} photos",
        dataset.notes.len(),
        dataset.recordings.len(),
        dataset.photos.len()
    );
    Ok(dataset)
}

fn read_manifest<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<ManifestIn, ArchiveError> {
    let mut file = match archive.by_name(MANIFEST_FILE) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(ArchiveError::MissingManifest),
        Err(e) => return Err(e.into()),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    serde_json::from_slice(&content).map_err(|e| ArchiveError::InvalidManifest(e.to_string()))
}

fn decode_manifest_list<T: crate::models::Entity>(
    items: Vec<Value>,
) -> Result<Vec<T>, ArchiveError> {
    items
        .into_iter()
        .map(|item| {
            decode::<T>(item)
                .map_err(|e| ArchiveError::InvalidManifest(format!("{}: {}", T::KIND, e)))
        })
        .collect()
}

/// Rebuild one blob-bearing collection from `<dir>/.../<id>.json` entries
///
/// `depth` is the number of path components of a metadata entry
/// (`recordings/<id>.json` is 2, `photos/<folder>/<id>.json` is 3).
fn read_blob_records<T, R>(
    archive: &mut ZipArchive<R>,
    names: &[String],
    dir: &str,
    depth: usize,
) -> Result<Vec<T>, ArchiveError>
where
    T: BlobEntity,
    R: Read + std::io::Seek,
{
    let mut records = Vec::new();

    for name in names {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != depth || parts[0] != dir {
            continue;
        }
        let Some(stem) = parts[depth - 1].strip_suffix(".json") else {
            continue;
        };
        if stem.is_empty() {
            continue;
        }

        let value: Value = match read_entry(archive, name).and_then(|bytes| {
            serde_json::from_slice(&bytes).map_err(ArchiveError::from)
        }) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping unreadable archive entry {}: {}", name, e);
                continue;
            }
        };
        let mut record: T = match decode(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed archive entry {}: {}", name, e);
                continue;
            }
        };

        let parent = &name[..name.len() - parts[depth - 1].len()];
        let payload_name = format!("{}{}.{}", parent, stem, record.blob_extension());
        match archive.by_name(&payload_name) {
            Ok(mut file) => {
                // The declared size comes from the archive and is not trusted
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                record.attach_blob(bytes);
                records.push(record);
            }
            Err(ZipError::FileNotFound) => {
                warn!(
                    "Dropping {} {}: {} is missing from the archive",
                    T::KIND,
                    record.id(),
                    payload_name
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    debug!("Read {} {} records from archive", records.len(), dir);
    Ok(records)
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let mut file = archive.by_name(name)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn bytes(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn json<S: Serialize + ?Sized>(&mut self, name: &str, value: &S) -> Result<(), ArchiveError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.bytes(name, &data)
    }

    fn blob_records<T: BlobEntity>(&mut self, records: &[T]) -> Result<(), ArchiveError> {
        for record in records {
            self.json(&archive_name(&record.meta_path()), record)?;
            self.bytes(
                &archive_name(&record.payload_path()),
                record.blob().unwrap_or_default(),
            )?;
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        Ok(self.zip.finish()?.into_inner())
    }
}
