//! Backend command handlers

use std::path::PathBuf;

use anyhow::{bail, Result};

use daybook_core::{BackendKind, DirectoryConnect, Store};

use crate::editor::confirm;
use crate::output::Output;

/// Connect a directory, adopting its data or seeding it
pub async fn connect_directory(
    store: &mut Store,
    path: PathBuf,
    yes: bool,
    output: &Output,
) -> Result<()> {
    if store.directory_has_data(&path)? && !yes {
        if !output.should_prompt() {
            bail!(
                "{} already contains Daybook data, which would replace the current data. \
                 Pass --yes to confirm.",
                path.display()
            );
        }
        println!("{} already contains Daybook data.", path.display());
        println!("Connecting will load it and replace what is shown now.");
        if !confirm("Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let outcome = store.connect_directory(&path).await?;
    let message = match outcome {
        DirectoryConnect::Adopted => format!("Loaded data from {}", path.display()),
        DirectoryConnect::Seeded => format!("Copied current data to {}", path.display()),
    };
    output.success(&message);
    Ok(())
}

/// Connect a sync server
pub async fn connect_api(
    store: &mut Store,
    endpoint: String,
    key: String,
    output: &Output,
) -> Result<()> {
    store.connect_api(&endpoint, &key).await?;
    output.success(&format!("Connected to {}", endpoint));
    Ok(())
}

/// Return to local storage
pub async fn disconnect(store: &mut Store, output: &Output) -> Result<()> {
    let previous = store.active_backend();
    if store.disconnect().await? {
        output.success(&format!("Disconnected {} backend", previous));
    } else {
        output.message("Already using local storage.");
    }
    Ok(())
}

/// Wipe the local store
pub fn clear(store: &mut Store, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Clearing deletes all locally stored data. Pass --yes to confirm.");
        }
        println!("This deletes all locally stored data.");
        if store.active_backend() != BackendKind::Local {
            println!(
                "Data in the {} backend is not affected.",
                store.active_backend()
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.clear_local_data()?;
    output.success("Cleared local data");
    Ok(())
}
