//! List command implementation.

use super::open_store;
use chrono::{DateTime, Utc};
use filestash_core::Record;
use serde::Serialize;
use std::path::Path;

/// One listed record, without its content.
#[derive(Debug, Serialize)]
pub struct ListEntry {
    /// Record id.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Media type, if one was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Write time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Size as reported when stored.
    pub size: u64,
    /// Bytes of content actually stored.
    pub content_length: usize,
}

impl From<&Record> for ListEntry {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            media_type: record.media_type.clone(),
            last_modified: DateTime::from_timestamp_millis(record.last_modified),
            size: record.size,
            content_length: record.content.len(),
        }
    }
}

/// Runs the list command.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let handle = open_store(path).await?;
    let entries: Vec<ListEntry> = handle.list_all().await?.iter().map(ListEntry::from).collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    Ok(())
}

fn print_text_output(entries: &[ListEntry]) {
    if entries.is_empty() {
        println!("No files stored");
        return;
    }

    println!(
        "{:>6}  {:<32}  {:<24}  {:>10}  {}",
        "ID", "NAME", "TYPE", "SIZE", "LAST MODIFIED"
    );
    for entry in entries {
        let modified = entry
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:<32}  {:<24}  {:>10}  {}",
            entry.id,
            entry.name,
            entry.media_type.as_deref().unwrap_or("-"),
            entry.size,
            modified
        );
    }
    println!();
    println!("{} file(s)", entries.len());
}
