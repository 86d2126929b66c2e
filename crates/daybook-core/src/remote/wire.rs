//! JSON wire format of the sync API
//!
//! Records travel as their normal camelCase JSON. Blob-bearing records
//! carry their payload base64-encoded in an extra field (`audioBase64` or
//! `imageBase64`), which is decoded back into bytes right after a fetch.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{decode, decode_settings, Dataset, Entity, EntityKind, SiteSettings};
use crate::remote::error::RemoteError;

/// Name of the base64 field carrying a kind's blob
pub fn blob_field(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Recording | EntityKind::NoteRecording => Some("audioBase64"),
        EntityKind::Photo => Some("imageBase64"),
        _ => None,
    }
}

/// Encode a record for upload
pub fn encode_record<T: Entity>(record: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let (Some(field), Some(bytes), Value::Object(map)) =
        (blob_field(T::KIND), record.blob(), &mut value)
    {
        map.insert(field.to_string(), Value::String(STANDARD.encode(bytes)));
    }
    Ok(value)
}

/// Encode settings for upload; the API key never leaves the device
pub fn encode_settings(settings: &SiteSettings) -> Result<Value, serde_json::Error> {
    serde_json::to_value(settings.without_api_key())
}

/// Decode one downloaded record, restoring its blob
pub fn decode_record<T: Entity>(value: Value) -> Result<T, RemoteError> {
    let mut value = value;
    let payload = match (blob_field(T::KIND), &mut value) {
        (Some(field), Value::Object(map)) => take_blob(map, field)?,
        _ => None,
    };

    let mut record: T =
        decode(value).map_err(|e| RemoteError::MalformedResponse(format!("{}: {}", T::KIND, e)))?;

    if T::KIND.has_blob() {
        match payload {
            Some(bytes) => record.attach_blob(bytes),
            None => warn!("{} {} arrived without a payload", T::KIND, record.id()),
        }
    }
    Ok(record)
}

/// Decode the bulk `data` response into a dataset
///
/// Any malformed part fails the whole decode so nothing partial is adopted.
pub fn decode_dataset(value: Value) -> Result<Dataset, RemoteError> {
    let Value::Object(mut map) = value else {
        return Err(RemoteError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    };

    let settings = match map.remove("settings") {
        None | Some(Value::Null) => SiteSettings::default(),
        Some(v) => decode_settings(v)
            .map_err(|e| RemoteError::MalformedResponse(format!("settings: {}", e)))?,
    };

    Ok(Dataset {
        settings,
        templates: decode_collection(&mut map)?,
        recordings: decode_collection(&mut map)?,
        photos: decode_collection(&mut map)?,
        notes: decode_collection(&mut map)?,
        note_recordings: decode_collection(&mut map)?,
        log_entries: decode_collection(&mut map)?,
        calendar_events: decode_collection(&mut map)?,
    })
}

fn decode_collection<T: Entity>(map: &mut Map<String, Value>) -> Result<Vec<T>, RemoteError> {
    let name = T::KIND.collection();
    match map.remove(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.into_iter().map(decode_record).collect(),
        Some(_) => Err(RemoteError::MalformedResponse(format!(
            "'{}' is not an array",
            name
        ))),
    }
}

/// Remove and decode a base64 field; data-URI prefixes are accepted
fn take_blob(map: &mut Map<String, Value>, field: &str) -> Result<Option<Vec<u8>>, RemoteError> {
    let encoded = match map.remove(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(RemoteError::MalformedResponse(format!(
                "'{}' is not a string",
                field
            )))
        }
    };

    let data = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded.as_str(),
    };

    STANDARD
        .decode(data.trim())
        .map(Some)
        .map_err(|e| RemoteError::MalformedResponse(format!("'{}': {}", field, e)))
}
