//! Entity trait and the in-memory dataset
//!
//! Every collection record implements [`Entity`], which lets the stores,
//! the archive codec and the facade operate generically over record kinds.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::migrate;
use super::{CalendarEvent, LogEntry, Note, NoteRecording, Photo, Recording, SiteSettings, Template};

/// The seven entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Template,
    Recording,
    Photo,
    NoteRecording,
    Note,
    LogEntry,
    CalendarEvent,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Template,
        EntityKind::Recording,
        EntityKind::Photo,
        EntityKind::NoteRecording,
        EntityKind::Note,
        EntityKind::LogEntry,
        EntityKind::CalendarEvent,
    ];

    /// SQLite table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Template => "templates",
            EntityKind::Recording => "recordings",
            EntityKind::Photo => "photos",
            EntityKind::NoteRecording => "note_recordings",
            EntityKind::Note => "notes",
            EntityKind::LogEntry => "log_entries",
            EntityKind::CalendarEvent => "calendar_events",
        }
    }

    /// Collection name used by the remote API and the archive manifest
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Template => "templates",
            EntityKind::Recording => "recordings",
            EntityKind::Photo => "photos",
            EntityKind::NoteRecording => "noteRecordings",
            EntityKind::Note => "notes",
            EntityKind::LogEntry => "logEntries",
            EntityKind::CalendarEvent => "calendarEvents",
        }
    }

    /// Whether records of this kind carry a binary payload
    pub fn has_blob(&self) -> bool {
        matches!(
            self,
            EntityKind::Recording | EntityKind::Photo | EntityKind::NoteRecording
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A record belonging to one of the entity collections
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Binary payload, for blob-bearing kinds
    fn blob(&self) -> Option<&[u8]> {
        None
    }

    /// Reattach a payload loaded separately from the record's JSON
    fn attach_blob(&mut self, _bytes: Vec<u8>) {}

    /// Bring an older JSON shape up to the current one
    fn upgrade(value: Value) -> Value {
        value
    }

    fn collection(dataset: &Dataset) -> &[Self];

    fn collection_mut(dataset: &mut Dataset) -> &mut Vec<Self>;
}

/// Decode a record from JSON, applying the upgrade adapter first
pub fn decode<T: Entity>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(T::upgrade(value))
}

/// Decode the settings singleton, applying its upgrade adapter first
pub fn decode_settings(value: Value) -> Result<SiteSettings, serde_json::Error> {
    serde_json::from_value(migrate::upgrade_settings(value))
}

macro_rules! scalar_entity {
    ($ty:ty, $kind:expr, $field:ident) => {
        scalar_entity!($ty, $kind, $field, |v| v);
    };
    ($ty:ty, $kind:expr, $field:ident, $upgrade:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn upgrade(value: Value) -> Value {
                let upgrade: fn(Value) -> Value = $upgrade;
                upgrade(value)
            }

            fn collection(dataset: &Dataset) -> &[Self] {
                &dataset.$field
            }

            fn collection_mut(dataset: &mut Dataset) -> &mut Vec<Self> {
                &mut dataset.$field
            }
        }
    };
}

macro_rules! blob_entity {
    ($ty:ty, $kind:expr, $field:ident, $blob:ident, $upgrade:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn blob(&self) -> Option<&[u8]> {
                Some(&self.$blob)
            }

            fn attach_blob(&mut self, bytes: Vec<u8>) {
                self.$blob = bytes;
            }

            fn upgrade(value: Value) -> Value {
                let upgrade: fn(Value) -> Value = $upgrade;
                upgrade(value)
            }

            fn collection(dataset: &Dataset) -> &[Self] {
                &dataset.$field
            }

            fn collection_mut(dataset: &mut Dataset) -> &mut Vec<Self> {
                &mut dataset.$field
            }
        }
    };
}

scalar_entity!(Template, EntityKind::Template, templates);
scalar_entity!(Note, EntityKind::Note, notes, migrate::upgrade_note);
scalar_entity!(LogEntry, EntityKind::LogEntry, log_entries);
scalar_entity!(
    CalendarEvent,
    EntityKind::CalendarEvent,
    calendar_events,
    migrate::upgrade_calendar_event
);
blob_entity!(
    Recording,
    EntityKind::Recording,
    recordings,
    audio,
    migrate::upgrade_recording
);
blob_entity!(Photo, EntityKind::Photo, photos, image, migrate::upgrade_photo);
blob_entity!(
    NoteRecording,
    EntityKind::NoteRecording,
    note_recordings,
    audio,
    |v| v
);

/// The complete in-memory dataset
///
/// Collections keep insertion order; callers sort by date when presenting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub settings: SiteSettings,
    pub templates: Vec<Template>,
    pub recordings: Vec<Recording>,
    pub photos: Vec<Photo>,
    pub notes: Vec<Note>,
    pub note_recordings: Vec<NoteRecording>,
    pub log_entries: Vec<LogEntry>,
    pub calendar_events: Vec<CalendarEvent>,
}

impl Dataset {
    /// Insert or replace a record by id, keeping its position on replace
    pub fn upsert<T: Entity>(&mut self, record: T) {
        let items = T::collection_mut(self);
        match items.iter().position(|r| r.id() == record.id()) {
            Some(pos) => items[pos] = record,
            None => items.push(record),
        }
    }

    /// Remove a record by id; returns whether anything was removed
    pub fn remove<T: Entity>(&mut self, id: &str) -> bool {
        let items = T::collection_mut(self);
        let before = items.len();
        items.retain(|r| r.id() != id);
        items.len() != before
    }

    pub fn get<T: Entity>(&self, id: &str) -> Option<&T> {
        T::collection(self).iter().find(|r| r.id() == id)
    }

    /// Number of records of a kind
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Template => self.templates.len(),
            EntityKind::Recording => self.recordings.len(),
            EntityKind::Photo => self.photos.len(),
            EntityKind::NoteRecording => self.note_recordings.len(),
            EntityKind::Note => self.notes.len(),
            EntityKind::LogEntry => self.log_entries.len(),
            EntityKind::CalendarEvent => self.calendar_events.len(),
        }
    }

    /// True when no collection holds a record (settings are ignored)
    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.count(*kind) == 0)
    }
}
