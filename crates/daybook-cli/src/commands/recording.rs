//! Recording command handlers
//!
//! Standalone recordings and recordings attached to a note share these
//! commands; `--note` selects the attached kind.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use daybook_core::usage::format_bytes;
use daybook_core::{LogEntry, LogType, NoteRecording, Recording, Store};

use crate::commands::{file_stem, resolve_id};
use crate::output::{short_id, truncate, Output};

/// Import a webm audio file
pub async fn add(
    store: &mut Store,
    file: PathBuf,
    name: Option<String>,
    note: Option<String>,
    output: &Output,
) -> Result<()> {
    let is_webm = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("webm"));
    if !is_webm {
        bail!("Recordings must be webm audio: {:?}", file);
    }

    let audio = fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
    let name = name.unwrap_or_else(|| file_stem(&file));

    let id = match note {
        Some(note) => {
            let note = resolve_id(&store.dataset().notes, &note, "note", |n| n.title.clone())?;
            let mut owner = note.clone();
            let recording = NoteRecording::new(&owner.id, name, audio);
            let id = recording.id.clone();
            store
                .save(recording)
                .await
                .context("Failed to save recording")?;
            owner.recording_ids.push(id.clone());
            store.save(owner).await.context("Failed to update note")?;
            id
        }
        None => {
            let recording = Recording::new(name, audio);
            let id = recording.id.clone();
            store
                .save(recording)
                .await
                .context("Failed to save recording")?;
            id
        }
    };
    store
        .save(LogEntry::new(LogType::RecordingAdded))
        .await
        .context("Failed to record activity")?;

    output.success(&format!("Added recording: {}", short_id(&id)));
    Ok(())
}

/// List recordings
pub fn list(store: &Store, note: Option<String>, output: &Output) -> Result<()> {
    match note {
        Some(note) => {
            let note_id = resolve_id(&store.dataset().notes, &note, "note", |n| n.title.clone())?
                .id
                .clone();
            let recordings: Vec<NoteRecording> = store
                .dataset()
                .note_recordings
                .iter()
                .filter(|r| r.note_id == note_id)
                .cloned()
                .collect();
            output.print_records(&recordings, "recording", |r| {
                format!(
                    "{} | {} ({})",
                    r.date.format("%Y-%m-%d %H:%M"),
                    truncate(&r.name, 40),
                    format_bytes(r.audio.len() as u64)
                )
            });
        }
        None => {
            let mut recordings = store.dataset().recordings.clone();
            recordings.sort_by(|a, b| b.date.cmp(&a.date));
            output.print_records(&recordings, "recording", |r| {
                format!(
                    "{} | {} ({})",
                    r.date.format("%Y-%m-%d %H:%M"),
                    truncate(&r.name, 40),
                    format_bytes(r.audio.len() as u64)
                )
            });
        }
    }
    Ok(())
}

/// Delete a recording of either kind
pub async fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let dataset = store.dataset();
    let is_standalone = dataset.recordings.iter().any(|r| r.id.starts_with(&id));

    if is_standalone {
        let id = resolve_id(&dataset.recordings, &id, "recording", |r| r.name.clone())?
            .id
            .clone();
        store
            .delete::<Recording>(&id)
            .await
            .context("Failed to delete recording")?;
        output.success(&format!("Deleted recording: {}", short_id(&id)));
        return Ok(());
    }

    let attached = resolve_id(&dataset.note_recordings, &id, "recording", |r| r.name.clone())?;
    let id = attached.id.clone();
    let owner = dataset
        .notes
        .iter()
        .find(|n| n.id == attached.note_id)
        .cloned();

    store
        .delete::<NoteRecording>(&id)
        .await
        .context("Failed to delete recording")?;
    if let Some(mut owner) = owner {
        owner.recording_ids.retain(|r| r != &id);
        store.save(owner).await.context("Failed to update note")?;
    }
    output.success(&format!("Deleted recording: {}", short_id(&id)));
    Ok(())
}
