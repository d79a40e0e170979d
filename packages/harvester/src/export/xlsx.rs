//! Spreadsheet writer.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use super::{ExportRow, COLUMNS};
use crate::error::ExportError;

/// Name of the single worksheet.
pub const WORKSHEET_NAME: &str = "processos";

/// Write a workbook with a bold header row and one row per record.
pub fn write_xlsx(rows: &[ExportRow], path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let wrapped = Format::new().set_text_wrap();

    let sheet = workbook.add_worksheet();
    sheet.set_name(WORKSHEET_NAME)?;

    for (col, name) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, name, &header)?;
    }

    for (row_idx, row) in (1u32..).zip(rows) {
        sheet.write_string(row_idx, 0, &row.process_number)?;
        sheet.write_string(row_idx, 1, &row.court)?;
        sheet.write_string(row_idx, 2, &row.filing_date)?;
        sheet.write_string(row_idx, 3, &row.subject)?;
        sheet.write_string(row_idx, 4, &row.parties)?;
        sheet.write_string(row_idx, 5, &row.last_decision_summary)?;
        sheet.write_boolean(row_idx, 6, row.in_execution_phase)?;
        sheet.write_string_with_format(row_idx, 7, &row.deadline_mentions, &wrapped)?;
        sheet.write_string(row_idx, 8, &row.latest_movement_date)?;
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::rows;
    use tempfile::tempdir;

    #[test]
    fn test_write_xlsx_produces_zip_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.xlsx");
        write_xlsx(&rows(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
