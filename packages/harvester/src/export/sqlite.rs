//! SQLite writer.
//!
//! The table is dropped and recreated on every export, so the file always
//! holds exactly the rows of the latest run.

use std::path::Path;

use rusqlite::{params, Connection};

use super::ExportRow;
use crate::error::ExportError;

/// Name of the output table.
pub const TABLE_NAME: &str = "processos";

const CREATE_TABLE: &str = "
    DROP TABLE IF EXISTS processos;
    CREATE TABLE processos (
        process_number        TEXT NOT NULL,
        court                 TEXT NOT NULL,
        filing_date           TEXT,
        subject               TEXT NOT NULL,
        parties               TEXT NOT NULL,
        last_decision_summary TEXT NOT NULL,
        in_execution_phase    INTEGER NOT NULL,
        deadline_mentions     TEXT NOT NULL,
        latest_movement_date  TEXT,
        PRIMARY KEY (court, process_number)
    );";

/// Write all rows in one transaction.
pub fn write_sqlite(rows: &[ExportRow], path: &Path) -> Result<(), ExportError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(CREATE_TABLE)?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO processos (
                process_number, court, filing_date, subject, parties,
                last_decision_summary, in_execution_phase, deadline_mentions,
                latest_movement_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for row in rows {
            stmt.execute(params![
                row.process_number,
                row.court,
                non_empty(&row.filing_date),
                row.subject,
                row.parties,
                row.last_decision_summary,
                row.in_execution_phase,
                row.deadline_mentions,
                non_empty(&row.latest_movement_date),
            ])?;
        }
    }
    tx.commit()?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote SQLite table");
    Ok(())
}

/// Unknown dates are stored as NULL rather than empty text.
fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::rows;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_write_sqlite_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.db");
        write_sqlite(&rows(), &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM processos", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let flag: bool = conn
            .query_row(
                "SELECT in_execution_phase FROM processos WHERE court = 'TJBA'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(flag);
    }

    #[test]
    fn test_write_sqlite_replaces_previous_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.db");
        write_sqlite(&rows(), &path).unwrap();
        write_sqlite(&rows()[..1], &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM processos", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_dates_stored_as_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processos.db");
        let mut data = rows();
        data[0].filing_date.clear();
        write_sqlite(&data[..1], &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let filing: Option<String> = conn
            .query_row("SELECT filing_date FROM processos", [], |r| r.get(0))
            .unwrap();
        assert_eq!(filing, None);
    }
}
