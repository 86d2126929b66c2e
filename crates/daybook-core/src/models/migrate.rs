//! Upgrade adapters for older record shapes
//!
//! Records written by earlier versions of the application are upgraded to
//! the current shape once, at load time, by every backend and by the archive
//! reader. Each adapter takes the raw JSON object and returns it in the
//! current shape; values that are already current pass through unchanged.

use serde_json::{Map, Value};

use super::{DEFAULT_PHOTO_FOLDER, NO_REMINDER};

const PAPER_STYLES: &[&str] = &["plain", "lined", "grid", "dotted"];
const FONT_STYLES: &[&str] = &["sans", "serif", "mono", "handwriting"];

/// Upgrade a note record
pub fn upgrade_note(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        rename(obj, "body", "content");
        rename(obj, "isLocked", "locked");
        rename(obj, "heroImageUrl", "heroImage");
        split_tags(obj, "tags");
        singular_to_list(obj, "recordingId", "recordingIds");
        singular_to_list(obj, "photoId", "photoIds");
        if !obj.contains_key("date") {
            if let Some(created) = obj.get("createdAt").cloned() {
                obj.insert("date".to_string(), created);
            }
        }
        drop_unknown(obj, "paperStyle", PAPER_STYLES);
        drop_unknown(obj, "fontStyle", FONT_STYLES);
    }
    value
}

/// Upgrade a recording record
pub fn upgrade_recording(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        singular_to_list(obj, "photoId", "photoIds");
        split_tags(obj, "tags");
    }
    value
}

/// Upgrade a photo record
pub fn upgrade_photo(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        rename(obj, "mimeType", "imageMimeType");
        split_tags(obj, "tags");
        let folder_missing = obj
            .get("folder")
            .and_then(Value::as_str)
            .map_or(true, |f| f.trim().is_empty());
        if folder_missing {
            obj.insert("folder".to_string(), Value::from(DEFAULT_PHOTO_FOLDER));
        }
        if !obj.contains_key("imageMimeType") {
            obj.insert("imageMimeType".to_string(), Value::from("image/jpeg"));
        }
    }
    value
}

/// Upgrade a calendar event record
pub fn upgrade_calendar_event(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let legacy_reminder = obj.remove("reminder");
        if !obj.contains_key("reminderMinutes") {
            let minutes = match legacy_reminder {
                Some(Value::Number(n)) => n.as_i64().unwrap_or(i64::from(NO_REMINDER)),
                _ => i64::from(NO_REMINDER),
            };
            obj.insert("reminderMinutes".to_string(), Value::from(minutes));
        }
        if !obj.contains_key("createdAt") {
            if let Some(start) = obj.get("start").cloned() {
                obj.insert("createdAt".to_string(), start);
            }
        }
    }
    value
}

/// Upgrade the settings record
pub fn upgrade_settings(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        rename(obj, "apiUrl", "apiEndpoint");
        if let Some(use_api) = obj.remove("useApi") {
            if use_api.as_bool() == Some(true) && !obj.contains_key("syncBackend") {
                obj.insert("syncBackend".to_string(), Value::from("api"));
            }
        }
    }
    value
}

/// Move `from` to `to` unless `to` is already present
fn rename(obj: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = obj.remove(from) {
        obj.entry(to.to_string()).or_insert(v);
    }
}

/// Turn a comma-separated string into an array of trimmed strings
fn split_tags(obj: &mut Map<String, Value>, key: &str) {
    if let Some(Value::String(s)) = obj.get(key) {
        let tags: Vec<Value> = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Value::from)
            .collect();
        obj.insert(key.to_string(), Value::Array(tags));
    }
}

/// Fold a single-id field into a list field
fn singular_to_list(obj: &mut Map<String, Value>, from: &str, to: &str) {
    let Some(single) = obj.remove(from) else {
        return;
    };
    let entry = obj
        .entry(to.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let (Value::Array(list), Value::String(id)) = (entry, single) {
        if !id.is_empty() && !list.iter().any(|v| v.as_str() == Some(id.as_str())) {
            list.push(Value::String(id));
        }
    }
}

/// Remove an enum field whose value is not a known variant
fn drop_unknown(obj: &mut Map<String, Value>, key: &str, known: &[&str]) {
    let unknown = obj
        .get(key)
        .map_or(false, |v| !v.as_str().is_some_and(|s| known.contains(&s)));
    if unknown {
        obj.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{decode, CalendarEvent, FontStyle, Note, PaperStyle, Photo, Recording};
    use serde_json::json;

    #[test]
    fn test_note_legacy_shape() {
        let legacy = json!({
            "id": "n1",
            "title": "Trip",
            "body": "<p>pack</p>",
            "isLocked": true,
            "tags": "travel, todo,",
            "createdAt": "2023-05-01T10:00:00Z",
            "paperStyle": "parchment",
            "fontStyle": "serif",
            "recordingId": "nr1"
        });

        let note: Note = decode(legacy).unwrap();
        assert_eq!(note.content, "<p>pack</p>");
        assert!(note.locked);
        assert_eq!(note.tags, vec!["travel", "todo"]);
        assert_eq!(note.date.to_rfc3339(), "2023-05-01T10:00:00+00:00");
        assert_eq!(note.paper_style, PaperStyle::Plain);
        assert_eq!(note.font_style, FontStyle::Serif);
        assert_eq!(note.recording_ids, vec!["nr1"]);
    }

    #[test]
    fn test_current_note_passes_through() {
        let note = Note::new("Current").with_content("x");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(upgrade_note(value.clone()), value);
    }

    #[test]
    fn test_recording_single_photo() {
        let legacy = json!({
            "id": "r1",
            "name": "memo",
            "date": "2024-02-02T00:00:00Z",
            "photoId": "p1",
            "photoIds": ["p0"]
        });
        let recording: Recording = decode(legacy).unwrap();
        assert_eq!(recording.photo_ids, vec!["p0", "p1"]);
    }

    #[test]
    fn test_photo_defaults() {
        let legacy = json!({
            "id": "p1",
            "name": "beach",
            "date": "2024-02-02T00:00:00Z"
        });
        let photo: Photo = decode(legacy).unwrap();
        assert_eq!(photo.folder, DEFAULT_PHOTO_FOLDER);
        assert_eq!(photo.image_mime_type, "image/jpeg");
    }

    #[test]
    fn test_calendar_event_legacy_reminder() {
        let legacy = json!({
            "id": "e1",
            "start": "2024-03-03T09:00:00Z",
            "end": "2024-03-03T10:00:00Z",
            "title": "Standup",
            "reminder": true
        });
        let event: CalendarEvent = decode(legacy).unwrap();
        assert_eq!(event.reminder_minutes, NO_REMINDER);
        assert_eq!(event.created_at, event.start);

        let numeric = json!({
            "id": "e2",
            "start": "2024-03-03T09:00:00Z",
            "end": "2024-03-03T10:00:00Z",
            "title": "Review",
            "reminder": 15
        });
        let event: CalendarEvent = decode(numeric).unwrap();
        assert_eq!(event.reminder_minutes, 15);
    }

    #[test]
    fn test_settings_legacy_api_flag() {
        let legacy = json!({ "apiUrl": "https://sync.example.com", "useApi": true });
        let upgraded = upgrade_settings(legacy);
        assert_eq!(upgraded["apiEndpoint"], "https://sync.example.com");
        assert_eq!(upgraded["syncBackend"], "api");
        assert!(upgraded.get("useApi").is_none());
    }
}
