use anyhow::{Context as _, Result};
use std::path::Path;

use crate::table::RecordSet;

/// Writes a [`RecordSet`] as a CSV file.
pub fn write_record_set(set: &RecordSet, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(set.columns())?;
    for row in set.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// File name for a journal's sheet. Journal codes come from accounting data
/// and occasionally contain path-hostile characters.
pub fn journal_file_name(journal: &str) -> String {
    let safe: String = journal
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("journal_{}.csv", safe)
}
