//! Directory and archive file layout
//!
//! The same relative layout is used by the directory store and by the
//! archive codec, so an exported archive can be unpacked as a directory:
//!
//! ```text
//! settings.json
//! templates.json
//! logs.json
//! calendar.json
//! notes/<id>.json
//! recordings/<id>.json         recordings/<id>.webm
//! note_recordings/<id>.json    note_recordings/<id>.webm
//! photos/<folder>/<id>.json    photos/<folder>/<id>.<ext>
//! ```

use std::path::PathBuf;

use crate::models::{Entity, NoteRecording, Photo, Recording};

pub const SETTINGS_FILE: &str = "settings.json";
pub const TEMPLATES_FILE: &str = "templates.json";
pub const LOGS_FILE: &str = "logs.json";
pub const CALENDAR_FILE: &str = "calendar.json";

pub const NOTES_DIR: &str = "notes";
pub const RECORDINGS_DIR: &str = "recordings";
pub const NOTE_RECORDINGS_DIR: &str = "note_recordings";
pub const PHOTOS_DIR: &str = "photos";

/// Top-level JSON files
pub const ROOT_FILES: [&str; 4] = [SETTINGS_FILE, TEMPLATES_FILE, LOGS_FILE, CALENDAR_FILE];

/// Top-level record subdirectories
pub const RECORD_DIRS: [&str; 4] = [NOTES_DIR, RECORDINGS_DIR, NOTE_RECORDINGS_DIR, PHOTOS_DIR];

/// Extension used for every audio payload
pub const AUDIO_EXTENSION: &str = "webm";

/// Extension for payloads of unrecognized type
pub const FALLBACK_EXTENSION: &str = "bin";

/// Map a mime type to a file extension
///
/// Total: every input yields an extension. Audio is always `webm`; images
/// use their subtype (`image/svg+xml` gives `svg`); anything else is `bin`.
pub fn extension_for_mime(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let Some((top, sub)) = essence.split_once('/') else {
        return FALLBACK_EXTENSION.to_string();
    };

    match top {
        "audio" => AUDIO_EXTENSION.to_string(),
        "image" => {
            let sub = sub.split('+').next().unwrap_or_default();
            let ext: String = sub.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            if ext.is_empty() {
                FALLBACK_EXTENSION.to_string()
            } else {
                ext
            }
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Make a logical photo folder safe to use as a single path component
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned
    }
}

/// A record stored as a metadata JSON file beside a binary sibling
pub trait BlobEntity: Entity {
    /// Directory holding this record's files, relative to the layout root
    fn blob_dir(&self) -> PathBuf;

    /// Extension of the binary sibling
    fn blob_extension(&self) -> String;

    /// Relative path of the metadata file
    fn meta_path(&self) -> PathBuf {
        self.blob_dir().join(format!("{}.json", self.id()))
    }

    /// Relative path of the binary file
    fn payload_path(&self) -> PathBuf {
        self.blob_dir()
            .join(format!("{}.{}", self.id(), self.blob_extension()))
    }
}

impl BlobEntity for Recording {
    fn blob_dir(&self) -> PathBuf {
        PathBuf::from(RECORDINGS_DIR)
    }

    fn blob_extension(&self) -> String {
        AUDIO_EXTENSION.to_string()
    }
}

impl BlobEntity for NoteRecording {
    fn blob_dir(&self) -> PathBuf {
        PathBuf::from(NOTE_RECORDINGS_DIR)
    }

    fn blob_extension(&self) -> String {
        AUDIO_EXTENSION.to_string()
    }
}

impl BlobEntity for Photo {
    fn blob_dir(&self) -> PathBuf {
        PathBuf::from(PHOTOS_DIR).join(sanitize_folder(&self.folder))
    }

    fn blob_extension(&self) -> String {
        extension_for_mime(&self.image_mime_type)
    }
}

/// Whether a record id can be used as a single file name component
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

/// Relative path of a note file
pub fn note_path(id: &str) -> PathBuf {
    PathBuf::from(NOTES_DIR).join(format!("{}.json", id))
}

/// Join a relative layout path with `/` separators, as used inside archives
pub fn archive_name(path: &std::path::Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_audio() {
        assert_eq!(extension_for_mime("audio/webm"), "webm");
        assert_eq!(extension_for_mime("audio/webm;codecs=opus"), "webm");
        assert_eq!(extension_for_mime("audio/mp4"), "webm");
    }

    #[test]
    fn test_extension_for_images() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpeg");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("IMAGE/WebP"), "webp");
        assert_eq!(extension_for_mime("image/svg+xml"), "svg");
        assert_eq!(extension_for_mime("image/x-icon"), "xicon");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for_mime(""), "bin");
        assert_eq!(extension_for_mime("application/pdf"), "bin");
        assert_eq!(extension_for_mime("garbage"), "bin");
        assert_eq!(extension_for_mime("image/"), "bin");
        assert_eq!(extension_for_mime("image/../.."), "bin");
    }

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder("Holiday 2024"), "Holiday 2024");
        assert_eq!(sanitize_folder("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_folder(".."), "_");
        assert_eq!(sanitize_folder("   "), "_");
        assert_eq!(sanitize_folder("tab\there"), "tab_here");
    }

    #[test]
    fn test_is_safe_id() {
        assert!(is_safe_id("2f1c9a4e-6b8d-4c1e-9f0a-1b2c3d4e5f60"));
        assert!(is_safe_id("note-1"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id(".."));
        assert!(!is_safe_id("../etc"));
        assert!(!is_safe_id("a\\b"));
    }

    #[test]
    fn test_blob_paths() {
        let mut photo = Photo::new("sunset", "Trips/Spain", "image/png", vec![1]);
        photo.id = "p1".to_string();
        assert_eq!(photo.meta_path(), PathBuf::from("photos/Trips_Spain/p1.json"));
        assert_eq!(photo.payload_path(), PathBuf::from("photos/Trips_Spain/p1.png"));

        let mut recording = Recording::new("memo", vec![1]);
        recording.id = "r1".to_string();
        assert_eq!(recording.payload_path(), PathBuf::from("recordings/r1.webm"));

        let mut note_recording = NoteRecording::new("n1", "aside", vec![1]);
        note_recording.id = "nr1".to_string();
        assert_eq!(
            note_recording.meta_path(),
            PathBuf::from("note_recordings/nr1.json")
        );
    }

    #[test]
    fn test_archive_name() {
        let path = PathBuf::from("photos").join("Pets").join("p1.png");
        assert_eq!(archive_name(&path), "photos/Pets/p1.png");
        assert_eq!(archive_name(&note_path("n1")), "notes/n1.json");
    }
}
