//! Command handlers

pub mod archive;
pub mod backend;
pub mod config;
pub mod event;
pub mod log;
pub mod note;
pub mod photo;
pub mod recording;
pub mod status;
pub mod template;

use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use daybook_core::Entity;

/// Resolve a record ID (full ID or unique prefix)
pub fn resolve_id<'a, T, L>(records: &'a [T], id: &str, noun: &str, label: L) -> Result<&'a T>
where
    T: Entity,
    L: Fn(&T) -> String,
{
    if let Some(exact) = records.iter().find(|r| r.id() == id) {
        return Ok(exact);
    }

    let matches: Vec<&T> = records.iter().filter(|r| r.id().starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", noun, id),
        1 => Ok(matches[0]),
        _ => {
            eprintln!("Multiple {}s match '{}':", noun, id);
            for record in &matches {
                eprintln!("  {} - {}", record.id(), label(record));
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Parse a time given as RFC 3339 or local "YYYY-MM-DD HH:MM"
pub fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.with_timezone(&Utc));
    }

    let naive = match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        Ok(naive) => naive,
        Err(_) => bail!(
            "Invalid time '{}'. Use RFC 3339 or \"YYYY-MM-DD HH:MM\".",
            input
        ),
    };
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => bail!("Time '{}' does not exist in the local timezone", input),
    }
}

/// Image mime type from a file extension
pub fn mime_for_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        _ => bail!(
            "Unsupported image type: {:?}\nSupported: jpg, jpeg, png, gif, webp, svg, heic",
            path
        ),
    };
    Ok(mime)
}

/// File name without extension, for default display names
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string())
}
