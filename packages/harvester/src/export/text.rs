//! Plain-text report, used when a PDF cannot be produced.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{ExportRow, COLUMNS};
use crate::error::ExportError;

/// Prefix of each record block, followed by its 1-based index.
pub const BLOCK_PREFIX: &str = "Processo #";

/// Write `Processo #n` blocks of `column: value` lines.
pub fn write_text(rows: &[ExportRow], path: &Path) -> Result<(), ExportError> {
    let mut out = BufWriter::new(File::create(path)?);

    for (idx, row) in rows.iter().enumerate() {
        writeln!(out, "{BLOCK_PREFIX}{}", idx + 1)?;
        for (name, value) in COLUMNS.iter().zip(row.cells()) {
            let value = if value.is_empty() {
                "-".to_string()
            } else {
                // Keep one line per field
                value.replace('\n', " | ")
            };
            writeln!(out, "{name}: {value}")?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::rows;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_write_text_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.txt");
        write_text(&rows(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches(BLOCK_PREFIX).count(), 2);
        assert!(text.contains("in_execution_phase: Sim"));
        assert!(text.contains("deadline_mentions: -"));
        assert!(text.contains(
            "deadline_mentions: 2020-02-01: Intimação para manifestação | 2020-03-01: Prazo, \"15\" dias"
        ));
    }
}
