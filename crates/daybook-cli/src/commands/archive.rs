//! Export and import command handlers

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use daybook_core::archive::backup_file_name;
use daybook_core::Store;

use crate::editor::confirm;
use crate::output::{Output, OutputFormat};

/// Write the whole dataset to a zip archive
pub fn export(store: &Store, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(backup_file_name(Utc::now())));
    let bytes = store.export_archive()?;
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;

    match output.format {
        OutputFormat::Json => output.json(&serde_json::json!({
            "status": "success",
            "path": path,
            "bytes": bytes.len(),
        })),
        OutputFormat::Quiet => println!("{}", path.display()),
        OutputFormat::Human => output.success(&format!("Exported to {}", path.display())),
    }
    Ok(())
}

/// Restore from a zip archive, replacing everything
pub async fn import(store: &mut Store, path: PathBuf, yes: bool, output: &Output) -> Result<()> {
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;

    if !yes {
        if !output.should_prompt() {
            anyhow::bail!("Restoring replaces all current data. Pass --yes to confirm.");
        }
        println!("Restoring {} replaces all current data.", path.display());
        if store.active_backend() != daybook_core::BackendKind::Local {
            println!("The {} backend will be disconnected.", store.active_backend());
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.import_archive(&bytes).await?;

    let dataset = store.dataset();
    output.success(&format!(
        "Restored {} notes, {} photos, {} recordings",
        dataset.notes.len(),
        dataset.photos.len(),
        dataset.recordings.len()
    ));
    Ok(())
}
