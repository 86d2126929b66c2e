//! Calendar event command handlers

use anyhow::{bail, Context, Result};
use chrono::Local;

use daybook_core::{CalendarEvent, Store};

use crate::commands::{parse_time, resolve_id};
use crate::output::{short_id, truncate, Output};

pub async fn add(
    store: &mut Store,
    title: String,
    start: String,
    end: String,
    reminder: Option<i32>,
    output: &Output,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Event title cannot be empty");
    }
    let start = parse_time(&start)?;
    let end = parse_time(&end)?;
    if end < start {
        bail!("Event ends before it starts");
    }

    let mut event = CalendarEvent::new(title, start, end);
    if let Some(minutes) = reminder {
        if minutes < 0 {
            bail!("Reminder must be zero or more minutes before the start");
        }
        event.reminder_minutes = minutes;
    }

    let id = event.id.clone();
    store.save(event).await.context("Failed to save event")?;

    output.success(&format!("Created event: {}", short_id(&id)));
    Ok(())
}

/// List events in start order
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let mut events = store.dataset().calendar_events.clone();
    events.sort_by(|a, b| a.start.cmp(&b.start));

    output.print_records(&events, "event", |e| {
        let start = e.start.with_timezone(&Local);
        let end = e.end.with_timezone(&Local);
        let mut line = format!(
            "{} {}-{} | {}",
            start.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M"),
            truncate(&e.title, 40)
        );
        if e.has_reminder() {
            line.push_str(&format!(" (reminder {}m)", e.reminder_minutes));
        }
        line
    });
    Ok(())
}

pub async fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_id(&store.dataset().calendar_events, &id, "event", |e| {
        e.title.clone()
    })?
    .id
    .clone();

    store
        .delete::<CalendarEvent>(&id)
        .await
        .context("Failed to delete event")?;

    output.success(&format!("Deleted event: {}", short_id(&id)));
    Ok(())
}
