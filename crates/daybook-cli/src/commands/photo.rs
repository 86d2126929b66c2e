//! Photo command handlers

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use daybook_core::usage::format_bytes;
use daybook_core::{LogEntry, LogType, Photo, Store};

use crate::commands::{file_stem, mime_for_path, resolve_id};
use crate::output::{short_id, truncate, Output};

/// Import an image file
pub async fn add(
    store: &mut Store,
    file: PathBuf,
    name: Option<String>,
    folder: Option<String>,
    output: &Output,
) -> Result<()> {
    let mime = mime_for_path(&file)?;
    let image = fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
    let name = name.unwrap_or_else(|| file_stem(&file));

    let photo = Photo::new(name, folder.unwrap_or_default(), mime, image);
    let id = photo.id.clone();
    let folder = photo.folder.clone();
    store.save(photo).await.context("Failed to save photo")?;
    store
        .save(LogEntry::new(LogType::PhotoAdded))
        .await
        .context("Failed to record activity")?;

    output.success(&format!("Added photo {} to {}", short_id(&id), folder));
    Ok(())
}

/// List photos, grouped by folder
pub fn list(store: &Store, folder: Option<String>, output: &Output) -> Result<()> {
    let mut photos: Vec<Photo> = store
        .dataset()
        .photos
        .iter()
        .filter(|p| folder.as_ref().map_or(true, |f| &p.folder == f))
        .cloned()
        .collect();
    photos.sort_by(|a, b| a.folder.cmp(&b.folder).then(b.date.cmp(&a.date)));

    output.print_records(&photos, "photo", |photo| {
        format!(
            "{} | {} | {} ({})",
            photo.date.format("%Y-%m-%d"),
            truncate(&photo.folder, 20),
            truncate(&photo.name, 40),
            format_bytes(photo.image.len() as u64)
        )
    });
    Ok(())
}

/// Delete a photo
pub async fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(&store.dataset().photos, &id, "photo", |p| p.name.clone())?
        .id
        .clone();

    store
        .delete::<Photo>(&id)
        .await
        .context("Failed to delete photo")?;

    output.success(&format!("Deleted photo: {}", short_id(&id)));
    Ok(())
}
