//! CSV ingestion for processed review batches
//!
//! The upstream cleaning/analysis stages export batches as CSV; headers
//! follow either the raw export (`bank`, `review`, `date`) or the schema
//! column names. Unknown columns (themes, helper columns) are ignored.

use std::path::Path;

use crate::review::ProcessedRecord;
use crate::Result;

/// Read a batch of processed records from a CSV file.
///
/// Fails on unreadable input or rows that do not deserialize at all;
/// semantic validation (rating ranges etc.) is the loader's job so bad
/// values are reported per record, not as a file-level error.
pub fn read_records(path: &Path) -> Result<Vec<ProcessedRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    tracing::debug!(count = records.len(), path = %path.display(), "records read");
    Ok(records)
}
