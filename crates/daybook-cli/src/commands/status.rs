//! Status and usage command handlers

use anyhow::Result;

use daybook_core::usage::format_bytes;
use daybook_core::{BackendKind, EntityKind, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let dataset = store.dataset();
    let config = store.config();
    let backend = store.active_backend();

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = EntityKind::ALL
                .iter()
                .map(|kind| (kind.collection().to_string(), dataset.count(*kind).into()))
                .collect();
            output.json(&serde_json::json!({
                "backend": backend,
                "directory": store.directory(),
                "endpoint": store.backend().endpoint(),
                "data_dir": config.data_dir,
                "counts": counts,
            }));
        }
        OutputFormat::Quiet => {
            println!("{}", backend);
        }
        OutputFormat::Human => {
            println!("Daybook Status");
            println!("==============");
            println!();
            println!("Backend: {}", backend);
            match backend {
                BackendKind::Local => {}
                BackendKind::Directory => {
                    if let Some(dir) = store.directory() {
                        println!("  Directory: {}", dir.display());
                    }
                }
                BackendKind::Api => {
                    if let Some(endpoint) = store.backend().endpoint() {
                        println!("  Server:    {}", endpoint);
                    }
                }
            }
            println!();
            println!("Local store: {}", config.local_db_path().display());
            println!();
            println!("Contents:");
            for kind in EntityKind::ALL {
                println!("  {:<16} {}", format!("{}:", kind.table()), dataset.count(kind));
            }
        }
    }

    Ok(())
}

/// Show storage usage by category
pub fn usage(store: &Store, output: &Output) -> Result<()> {
    let usage = store.storage_usage();

    match output.format {
        OutputFormat::Json => output.json(&usage),
        OutputFormat::Quiet => println!("{}", usage.total),
        OutputFormat::Human => {
            if usage.is_empty() {
                println!("No data stored.");
                return Ok(());
            }
            println!("Storage used: {}", format_bytes(usage.total));
            println!();
            for entry in &usage.categories {
                println!(
                    "  {:<18} {:>10}  {:>5.1}%",
                    entry.category.label(),
                    format_bytes(entry.bytes),
                    usage.fraction(entry.category) * 100.0
                );
            }
        }
    }

    Ok(())
}
