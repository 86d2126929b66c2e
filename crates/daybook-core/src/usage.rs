//! Storage usage accounting
//!
//! Byte-size breakdown of the in-memory dataset by category, for display.
//! Blob sizes are exact; scalar fields are estimated by their serialized
//! JSON length. Pure function of the dataset, no I/O.

use std::fmt;

use serde::Serialize;

use crate::models::{Dataset, Entity};

/// Display category of stored data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageCategory {
    Photos,
    Recordings,
    Notes,
    Calendar,
    LogsAndTemplates,
}

impl UsageCategory {
    pub const ALL: [UsageCategory; 5] = [
        UsageCategory::Photos,
        UsageCategory::Recordings,
        UsageCategory::Notes,
        UsageCategory::Calendar,
        UsageCategory::LogsAndTemplates,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UsageCategory::Photos => "Photos",
            UsageCategory::Recordings => "Recordings",
            UsageCategory::Notes => "Notes",
            UsageCategory::Calendar => "Calendar",
            UsageCategory::LogsAndTemplates => "Logs & templates",
        }
    }
}

impl fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub category: UsageCategory,
    pub bytes: u64,
}

/// Usage totals
///
/// `categories` only lists non-empty categories, and their bytes always
/// sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub total: u64,
    pub categories: Vec<CategoryUsage>,
}

impl StorageUsage {
    pub fn compute(dataset: &Dataset) -> Self {
        let mut categories = Vec::new();
        let mut total = 0;

        for category in UsageCategory::ALL {
            let bytes = category_bytes(dataset, category);
            if bytes > 0 {
                total += bytes;
                categories.push(CategoryUsage { category, bytes });
            }
        }

        Self { total, categories }
    }

    /// Bytes used by one category (0 if absent)
    pub fn bytes(&self, category: UsageCategory) -> u64 {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.bytes)
    }

    /// Share of the total taken by one category, in `0.0..=1.0`
    pub fn fraction(&self, category: UsageCategory) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.bytes(category) as f64 / self.total as f64
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn category_bytes(dataset: &Dataset, category: UsageCategory) -> u64 {
    match category {
        UsageCategory::Photos => collection_bytes(&dataset.photos),
        UsageCategory::Recordings => {
            collection_bytes(&dataset.recordings) + collection_bytes(&dataset.note_recordings)
        }
        UsageCategory::Notes => collection_bytes(&dataset.notes),
        UsageCategory::Calendar => collection_bytes(&dataset.calendar_events),
        UsageCategory::LogsAndTemplates => {
            collection_bytes(&dataset.log_entries) + collection_bytes(&dataset.templates)
        }
    }
}

fn collection_bytes<T: Entity>(records: &[T]) -> u64 {
    records.iter().map(record_bytes).sum()
}

fn record_bytes<T: Entity>(record: &T) -> u64 {
    let json = serde_json::to_vec(record).map_or(0, |v| v.len());
    let blob = record.blob().map_or(0, <[u8]>::len);
    (json + blob) as u64
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
