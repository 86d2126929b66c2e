//! Template command handlers

use anyhow::{bail, Context, Result};

use daybook_core::{Store, Template};

use crate::commands::resolve_id;
use crate::output::{short_id, truncate, truncate_line, Output};

pub async fn add(store: &mut Store, name: String, prompt: String, output: &Output) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Template name cannot be empty");
    }

    let template = Template::new(name, prompt);
    let id = template.id.clone();
    store
        .save(template)
        .await
        .context("Failed to save template")?;

    output.success(&format!("Created template: {}", short_id(&id)));
    Ok(())
}

pub fn list(store: &Store, output: &Output) -> Result<()> {
    let mut templates = store.dataset().templates.clone();
    templates.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    output.print_records(&templates, "template", |t| {
        format!("{} | {}", truncate(&t.name, 24), truncate_line(&t.prompt, 50))
    });
    Ok(())
}

pub async fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(&store.dataset().templates, &id, "template", |t| t.name.clone())?
        .id
        .clone();

    store
        .delete::<Template>(&id)
        .await
        .context("Failed to delete template")?;

    output.success(&format!("Deleted template: {}", short_id(&id)));
    Ok(())
}
