//! Export writers for the consolidated dataset.
//!
//! Every format writes the same columns, in the same order, one row per
//! process. Writers own their output file for the duration of the write and
//! never share handles.

mod csv;
mod pdf;
mod sqlite;
mod text;
mod xlsx;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ExportError;
use crate::types::ProcessRecord;

pub use self::csv::write_csv;
pub use self::pdf::write_pdf;
pub use self::sqlite::{write_sqlite, TABLE_NAME};
pub use self::text::{write_text, BLOCK_PREFIX};
pub use self::xlsx::{write_xlsx, WORKSHEET_NAME};

/// Column headers, in output order.
pub const COLUMNS: [&str; 9] = [
    "process_number",
    "court",
    "filing_date",
    "subject",
    "parties",
    "last_decision_summary",
    "in_execution_phase",
    "deadline_mentions",
    "latest_movement_date",
];

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Sqlite,
    Pdf,
    /// Plain-text report, also the fallback when PDF generation fails.
    Text,
}

impl ExportFormat {
    /// The four formats a full run produces.
    pub const PRIMARY: [Self; 4] = [Self::Xlsx, Self::Csv, Self::Sqlite, Self::Pdf];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Sqlite => "sqlite",
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }

    /// File extension used for default file names.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sqlite => "db",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub format: ExportFormat,
    pub path: PathBuf,
}

impl ExportTarget {
    pub fn new(format: ExportFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }
}

/// A record flattened to the export columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub process_number: String,
    pub court: String,
    pub filing_date: String,
    pub subject: String,
    pub parties: String,
    pub last_decision_summary: String,
    pub in_execution_phase: bool,
    pub deadline_mentions: String,
    pub latest_movement_date: String,
}

impl From<&ProcessRecord> for ExportRow {
    fn from(record: &ProcessRecord) -> Self {
        let fmt_date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        Self {
            process_number: record.process_number.clone(),
            court: record.court.label(),
            filing_date: fmt_date(record.filing_date),
            subject: record.subject.clone(),
            parties: record.parties.clone(),
            last_decision_summary: record.indicators.last_decision_summary.clone(),
            in_execution_phase: record.indicators.in_execution_phase,
            deadline_mentions: record.indicators.upcoming_deadline_mentions.join("\n"),
            latest_movement_date: fmt_date(record.latest_movement_date()),
        }
    }
}

impl ExportRow {
    /// Values as display strings, in [`COLUMNS`] order.
    #[must_use]
    pub fn cells(&self) -> [String; 9] {
        [
            self.process_number.clone(),
            self.court.clone(),
            self.filing_date.clone(),
            self.subject.clone(),
            self.parties.clone(),
            self.last_decision_summary.clone(),
            if self.in_execution_phase { "Sim" } else { "Não" }.to_string(),
            self.deadline_mentions.clone(),
            self.latest_movement_date.clone(),
        ]
    }
}

/// Flatten a dataset to export rows.
#[must_use]
pub fn to_rows(records: &[ProcessRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

/// Write `records` in `format` to `path`.
pub fn write(format: ExportFormat, records: &[ProcessRecord], path: &Path) -> Result<(), ExportError> {
    let rows = to_rows(records);
    match format {
        ExportFormat::Xlsx => write_xlsx(&rows, path),
        ExportFormat::Csv => write_csv(&rows, path),
        ExportFormat::Sqlite => write_sqlite(&rows, path),
        ExportFormat::Pdf => write_pdf(&rows, path),
        ExportFormat::Text => write_text(&rows, path),
    }
}

/// Path of the plain-text report that replaces a failed PDF.
#[must_use]
pub fn text_fallback_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::ExportRow;

    pub fn rows() -> Vec<ExportRow> {
        vec![
            ExportRow {
                process_number: "0000000-00.2020.8.17.0001".into(),
                court: "TJPE".into(),
                filing_date: "2020-01-01".into(),
                subject: "Contratos".into(),
                parties: "AUTOR: Empresa A; RÉU: Empresa B".into(),
                last_decision_summary: "Decisão interlocutória proferida".into(),
                in_execution_phase: false,
                deadline_mentions: "2020-02-01: Intimação para manifestação\n2020-03-01: Prazo, \"15\" dias".into(),
                latest_movement_date: "2020-03-01".into(),
            },
            ExportRow {
                process_number: "1111111-11.2021.8.05.0001".into(),
                court: "TJBA".into(),
                filing_date: NaiveDate::from_ymd_opt(2021, 5, 10)
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                subject: "Cobrança".into(),
                parties: "EXEQUENTE: Fulano; EXECUTADO: Sicrano".into(),
                last_decision_summary: "Sentença de mérito".into(),
                in_execution_phase: true,
                deadline_mentions: String::new(),
                latest_movement_date: "2021-09-15".into(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CourtCode, DerivedIndicators, Movement};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_row_from_record() {
        let record = ProcessRecord {
            process_number: "42".into(),
            court: CourtCode::parse("trf5").unwrap(),
            subject: "Tributário".into(),
            parties: "AUTOR: X".into(),
            filing_date: NaiveDate::from_ymd_opt(2022, 4, 1),
            class: None,
            judging_body: None,
            degree: None,
            status: None,
            movements: vec![Movement::new(
                NaiveDate::from_ymd_opt(2023, 8, 2).and_then(|d| d.and_hms_opt(9, 0, 0)),
                "Penhora",
            )],
            indicators: DerivedIndicators {
                upcoming_deadline_mentions: vec!["a".into(), "b".into()],
                last_decision_summary: "Penhora".into(),
                in_execution_phase: true,
            },
        };

        let row = ExportRow::from(&record);
        assert_eq!(row.court, "TRF5");
        assert_eq!(row.filing_date, "2022-04-01");
        assert_eq!(row.deadline_mentions, "a\nb");
        assert_eq!(row.latest_movement_date, "2023-08-02");
        assert_eq!(row.cells()[6], "Sim");
    }

    #[test]
    fn test_text_fallback_path() {
        assert_eq!(
            text_fallback_path(Path::new("out/processos.pdf")),
            PathBuf::from("out/processos.txt")
        );
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Sqlite.extension(), "db");
        assert_eq!(ExportFormat::Xlsx.extension(), "xlsx");
    }
}
