//! CSV export of activity windows.

use crate::activity::ActivityRecord;
use crate::Result;
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    template_id: &'a str,
    date: String,
    completed: bool,
    xp_earned: u32,
}

/// Append activity records for one template to a CSV file.
///
/// The header row is written only when the file is new or empty. The file
/// is synced before returning. Returns the number of rows written.
pub fn write_activity_csv(
    csv_path: &Path,
    template_id: &str,
    records: &[ActivityRecord],
) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in records {
        writer.serialize(CsvRow {
            template_id,
            date: record.date.format("%Y-%m-%d").to_string(),
            completed: record.completed,
            xp_earned: record.xp_earned,
        })?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!(
        "Exported {} activity rows for {} to {:?}",
        records.len(),
        template_id,
        csv_path
    );
    Ok(records.len())
}
