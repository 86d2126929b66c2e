//! Data models for Daybook
//!
//! Defines the site settings singleton and the seven entity collections:
//! templates, recordings, photos, note recordings, notes, log entries and
//! calendar events.
//!
//! Field names serialize as camelCase so that the directory layout, the
//! archive manifest and the remote API all share one JSON shape. Binary
//! payloads (audio and image data) are never part of a record's JSON; they
//! travel beside it as a single opaque unit per backend.

mod entity;
pub mod migrate;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use entity::{decode, decode_settings, Dataset, Entity, EntityKind};

/// Mime type of every recording payload
pub const RECORDING_MIME_TYPE: &str = "audio/webm";

/// Folder assigned to photos that never had one
pub const DEFAULT_PHOTO_FOLDER: &str = "Unsorted";

/// Generate a new globally unique record id
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Which backend currently holds the dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The local SQLite store
    #[default]
    Local,
    /// A user-chosen filesystem directory
    Directory,
    /// The self-hosted sync API
    Api,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Directory => "directory",
            BackendKind::Api => "api",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "directory" | "dir" => Ok(BackendKind::Directory),
            "api" | "remote" => Ok(BackendKind::Api),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Author information shown in the site branding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Creator {
    pub name: String,
    pub email: String,
    pub website: String,
    pub bio: String,
}

/// Singleton settings record
///
/// Replaced wholesale on every save; there is no delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub site_name: String,
    pub tagline: String,
    /// Logo as a data URI
    pub logo: Option<String>,
    pub accent_color: String,
    pub creator: Creator,
    /// Active sync backend
    pub sync_backend: BackendKind,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Optional local unlock PIN
    pub user_pin: Option<String>,
    pub is_admin: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Daybook".to_string(),
            tagline: String::new(),
            logo: None,
            accent_color: "#4f46e5".to_string(),
            creator: Creator::default(),
            sync_backend: BackendKind::Local,
            api_endpoint: None,
            api_key: None,
            user_pin: None,
            is_admin: true,
        }
    }
}

impl SiteSettings {
    /// Stored remote credentials, if both halves are present
    pub fn api_credentials(&self) -> Option<(&str, &str)> {
        match (self.api_endpoint.as_deref(), self.api_key.as_deref()) {
            (Some(endpoint), Some(key)) if !endpoint.is_empty() && !key.is_empty() => {
                Some((endpoint, key))
            }
            _ => None,
        }
    }

    /// Copy suitable for leaving the device: the API key is removed
    pub fn without_api_key(&self) -> Self {
        Self {
            api_key: None,
            ..self.clone()
        }
    }

    /// Copy the backend selector fields from another settings record
    ///
    /// Used when adopting a dataset from another backend: the adopted
    /// branding wins, but the selector state stays with this session.
    pub fn keep_backend_of(mut self, current: &SiteSettings) -> Self {
        self.sync_backend = current.sync_backend;
        self.api_endpoint = current.api_endpoint.clone();
        self.api_key = current.api_key.clone();
        self
    }
}

/// A reusable AI prompt template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub prompt: String,
}

impl Template {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

/// A voice recording with transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub notes: String,
    /// Audio payload, always `audio/webm`
    #[serde(skip)]
    pub audio: Vec<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Linked photo ids (weak references)
    #[serde(default)]
    pub photo_ids: Vec<String>,
}

impl Recording {
    pub fn new(name: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            date: Utc::now(),
            transcript: String::new(),
            notes: String::new(),
            audio,
            tags: Vec::new(),
            photo_ids: Vec::new(),
        }
    }
}

/// A photo stored in a logical folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub folder: String,
    #[serde(skip)]
    pub image: Vec<u8>,
    pub image_mime_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Photo {
    pub fn new(
        name: impl Into<String>,
        folder: impl Into<String>,
        mime_type: impl Into<String>,
        image: Vec<u8>,
    ) -> Self {
        let folder = folder.into();
        Self {
            id: new_id(),
            name: name.into(),
            notes: String::new(),
            date: Utc::now(),
            folder: if folder.trim().is_empty() {
                DEFAULT_PHOTO_FOLDER.to_string()
            } else {
                folder
            },
            image,
            image_mime_type: mime_type.into(),
            tags: Vec::new(),
        }
    }
}

/// A recording scoped to a single note
///
/// Deleting the owning note does not cascade here; callers remove these
/// explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecording {
    pub id: String,
    pub note_id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    #[serde(skip)]
    pub audio: Vec<u8>,
}

impl NoteRecording {
    pub fn new(note_id: impl Into<String>, name: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            id: new_id(),
            note_id: note_id.into(),
            name: name.into(),
            date: Utc::now(),
            audio,
        }
    }
}

/// Paper background of a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperStyle {
    #[default]
    Plain,
    Lined,
    Grid,
    Dotted,
}

/// Typeface family of a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Sans,
    Serif,
    Mono,
    Handwriting,
}

/// A rich-text note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// HTML content
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub locked: bool,
    /// Hero image as a data URI
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub paper_style: PaperStyle,
    #[serde(default)]
    pub font_style: FontStyle,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_fired: bool,
    /// Note recording ids (weak references)
    #[serde(default)]
    pub recording_ids: Vec<String>,
    /// Photo ids (weak references)
    #[serde(default)]
    pub photo_ids: Vec<String>,
}

impl Note {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            content: String::new(),
            category: String::new(),
            tags: Vec::new(),
            date: Utc::now(),
            color: String::new(),
            locked: false,
            hero_image: None,
            paper_style: PaperStyle::default(),
            font_style: FontStyle::default(),
            due_at: None,
            reminder_at: None,
            reminder_fired: false,
            recording_ids: Vec::new(),
            photo_ids: Vec::new(),
        }
    }

    /// Set the HTML content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Kind of activity log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    ClockIn,
    ClockOut,
    NoteCreated,
    PhotoAdded,
    RecordingAdded,
    ManualTask,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogType::ClockIn => "Clock in",
            LogType::ClockOut => "Clock out",
            LogType::NoteCreated => "Note created",
            LogType::PhotoAdded => "Photo added",
            LogType::RecordingAdded => "Recording added",
            LogType::ManualTask => "Manual task",
        };
        f.write_str(label)
    }
}

/// An append-only activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LogType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl LogEntry {
    pub fn new(kind: LogType) -> Self {
        Self {
            id: new_id(),
            kind,
            timestamp: Utc::now(),
            task: None,
            start_time: None,
            end_time: None,
        }
    }

    /// A manually entered task covering a time span
    pub fn manual_task(
        task: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            task: Some(task.into()),
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::new(LogType::ManualTask)
        }
    }
}

/// Reminder offset meaning "no reminder"
pub const NO_REMINDER: i32 = -1;

/// A calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub recording_ids: Vec<String>,
    #[serde(default)]
    pub color: String,
    /// Minutes before `start`; -1 means no reminder
    #[serde(default = "no_reminder")]
    pub reminder_minutes: i32,
    #[serde(default)]
    pub reminder_fired: bool,
    pub created_at: DateTime<Utc>,
}

fn no_reminder() -> i32 {
    NO_REMINDER
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            start,
            end,
            title: title.into(),
            notes: String::new(),
            photo_id: None,
            recording_ids: Vec::new(),
            color: String::new(),
            reminder_minutes: NO_REMINDER,
            reminder_fired: false,
            created_at: Utc::now(),
        }
    }

    pub fn has_reminder(&self) -> bool {
        self.reminder_minutes >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_ids_are_unique() {
        let a = Note::new("a");
        let b = Note::new("b");
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_backend_kind_parse_and_display() {
        assert_eq!("directory".parse::<BackendKind>(), Ok(BackendKind::Directory));
        assert_eq!("API".parse::<BackendKind>(), Ok(BackendKind::Api));
        assert!("cloud".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Local.to_string(), "local");
    }

    #[test]
    fn test_settings_credentials() {
        let mut settings = SiteSettings::default();
        assert!(settings.api_credentials().is_none());

        settings.api_endpoint = Some("https://sync.example.com".to_string());
        assert!(settings.api_credentials().is_none());

        settings.api_key = Some("secret".to_string());
        assert_eq!(
            settings.api_credentials(),
            Some(("https://sync.example.com", "secret"))
        );
    }

    #[test]
    fn test_keep_backend_of() {
        let mut current = SiteSettings::default();
        current.sync_backend = BackendKind::Api;
        current.api_key = Some("k".to_string());

        let mut adopted = SiteSettings::default();
        adopted.site_name = "Field Journal".to_string();

        let merged = adopted.keep_backend_of(&current);
        assert_eq!(merged.site_name, "Field Journal");
        assert_eq!(merged.sync_backend, BackendKind::Api);
        assert_eq!(merged.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_blob_is_not_serialized() {
        let recording = Recording::new("standup", vec![1, 2, 3]);
        let json = serde_json::to_value(&recording).unwrap();
        assert!(json.get("audio").is_none());
        assert_eq!(json["photoIds"], serde_json::json!([]));
    }

    #[test]
    fn test_photo_default_folder() {
        let photo = Photo::new("img", "  ", "image/png", vec![0]);
        assert_eq!(photo.folder, DEFAULT_PHOTO_FOLDER);
    }

    #[test]
    fn test_log_entry_type_field() {
        let entry = LogEntry::new(LogType::ClockIn);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "CLOCK_IN");
    }

    #[test]
    fn test_manual_task() {
        let start = Utc::now();
        let entry = LogEntry::manual_task("Invoices", start, start + Duration::hours(1));
        assert_eq!(entry.kind, LogType::ManualTask);
        assert_eq!(entry.task.as_deref(), Some("Invoices"));
        assert!(entry.end_time > entry.start_time);
    }

    #[test]
    fn test_calendar_event_reminder_default() {
        let now = Utc::now();
        let event = CalendarEvent::new("Dentist", now, now + Duration::minutes(30));
        assert!(!event.has_reminder());

        let json = serde_json::json!({
            "id": "e1",
            "start": now,
            "end": now,
            "title": "Legacy",
            "createdAt": now
        });
        let parsed: CalendarEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.reminder_minutes, NO_REMINDER);
    }

    #[test]
    fn test_note_serialization() {
        let mut note = Note::new("Groceries").with_content("<p>milk</p>");
        note.paper_style = PaperStyle::Lined;
        note.tags = vec!["home".to_string()];
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"paperStyle\":\"lined\""));
        let parsed: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, note);
    }
}
