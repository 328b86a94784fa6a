use anyhow::{Context as _, Result};
use std::path::Path;

use crate::table::{RecordSet, Value};

/// Reads a CSV file into a [`RecordSet`], auto-typing every cell.
pub fn read_record_set(path: &Path) -> Result<RecordSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content = maybe_remove_byte_order_mark(content);
    parse_record_set(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_record_set(content: &str) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let columns = reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect();
    let mut set = RecordSet::new(columns);
    for record in reader.records() {
        let record = record?;
        set.push_row(record.iter().map(Value::parse).collect());
    }
    Ok(set)
}

fn maybe_remove_byte_order_mark(mut content: String) -> String {
    if content.starts_with('\u{FEFF}') {
        content.remove(0);
    }
    content
}
