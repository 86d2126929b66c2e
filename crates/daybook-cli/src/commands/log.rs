//! Time log command handlers

use anyhow::{bail, Context, Result};

use daybook_core::{LogEntry, LogType, Store};

use crate::commands::parse_time;
use crate::output::{short_id, truncate, Output};

pub async fn clock_in(store: &mut Store, output: &Output) -> Result<()> {
    record(store, LogEntry::new(LogType::ClockIn), output).await
}

pub async fn clock_out(store: &mut Store, output: &Output) -> Result<()> {
    record(store, LogEntry::new(LogType::ClockOut), output).await
}

/// Record a manually entered task
pub async fn task(
    store: &mut Store,
    task: String,
    start: String,
    end: String,
    output: &Output,
) -> Result<()> {
    if task.trim().is_empty() {
        bail!("Task description cannot be empty");
    }
    let start = parse_time(&start)?;
    let end = parse_time(&end)?;
    if end < start {
        bail!("End time is before start time");
    }

    record(store, LogEntry::manual_task(task, start, end), output).await
}

async fn record(store: &mut Store, entry: LogEntry, output: &Output) -> Result<()> {
    let message = format!("{} at {}", entry.kind, entry.timestamp.format("%H:%M"));
    let id = entry.id.clone();
    store.save(entry).await.context("Failed to save log entry")?;
    output.success(&format!("{} ({})", message, short_id(&id)));
    Ok(())
}

/// List log entries, newest first
pub fn list(store: &Store, output: &Output) -> Result<()> {
    let mut entries = store.dataset().log_entries.clone();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    output.print_records(&entries, "log", describe);
    Ok(())
}

fn describe(entry: &LogEntry) -> String {
    let when = entry.timestamp.format("%Y-%m-%d %H:%M");
    match (&entry.task, entry.start_time, entry.end_time) {
        (Some(task), Some(start), Some(end)) => format!(
            "{} | {} | {} ({}-{})",
            when,
            entry.kind,
            truncate(task, 40),
            start.format("%H:%M"),
            end.format("%H:%M")
        ),
        (Some(task), _, _) => format!("{} | {} | {}", when, entry.kind, truncate(task, 40)),
        _ => format!("{} | {}", when, entry.kind),
    }
}
