//! Note command handlers

use anyhow::{bail, Context, Result};

use daybook_core::{LogEntry, LogType, Note, Store};

use crate::commands::resolve_id;
use crate::editor::{confirm, edit_text};
use crate::output::{short_id, truncate, truncate_line, Output};

/// Create a new note
pub async fn add(
    store: &mut Store,
    title: String,
    content: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Note title cannot be empty");
    }

    let content = match content {
        Some(c) => c,
        None => {
            let initial = format!("<!-- New note: {} -->\n\n", title);
            let edited = edit_text(&initial).context("Failed to edit note")?;

            // Remove the comment lines
            edited
                .lines()
                .filter(|line| !line.starts_with("<!--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        }
    };

    let mut note = Note::new(title).with_content(content);
    note.category = category.unwrap_or_default();
    note.tags = tags;

    let id = note.id.clone();
    store.save(note).await.context("Failed to save note")?;
    store
        .save(LogEntry::new(LogType::NoteCreated))
        .await
        .context("Failed to record activity")?;

    output.success(&format!("Created note: {}", short_id(&id)));
    Ok(())
}

/// List notes, newest first
pub fn list(store: &Store, tag: Option<String>, output: &Output) -> Result<()> {
    let mut notes: Vec<Note> = store
        .dataset()
        .notes
        .iter()
        .filter(|n| tag.as_ref().map_or(true, |t| n.tags.contains(t)))
        .cloned()
        .collect();
    notes.sort_by(|a, b| b.date.cmp(&a.date));

    output.print_records(&notes, "note", |note| {
        let mut line = format!(
            "{} | {}",
            note.date.format("%Y-%m-%d"),
            truncate(&note.title, 40)
        );
        if !note.tags.is_empty() {
            line.push_str(&format!(" [{}]", note.tags.join(", ")));
        }
        line
    });
    Ok(())
}

/// Delete a note and its recordings
pub async fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let note = resolve_id(&store.dataset().notes, &id, "note", |n| n.title.clone())?.clone();

    if !yes && output.should_prompt() {
        let attached = store
            .dataset()
            .note_recordings
            .iter()
            .filter(|r| r.note_id == note.id)
            .count();
        println!(
            "Delete note: {} - {}",
            short_id(&note.id),
            truncate_line(&note.title, 50)
        );
        if attached > 0 {
            println!("This also deletes {} attached recording(s).", attached);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_note(&note.id)
        .await
        .context("Failed to delete note")?;

    output.success(&format!("Deleted note: {}", short_id(&note.id)));
    Ok(())
}
