//! Delimited-text writer.

use std::path::Path;

use super::ExportRow;
use crate::error::ExportError;

/// Write a header line plus one CSV record per row.
///
/// Column names come from the `ExportRow` field names, which match
/// [`super::COLUMNS`].
pub fn write_csv(rows: &[ExportRow], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;

    if rows.is_empty() {
        writer.write_record(super::COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}
