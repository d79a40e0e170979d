//! Offline self-test of the export path.
//!
//! Builds a fixed two-record dataset, runs every requested writer over it
//! and reads each artifact back to check its structure and row count. No
//! network access is involved.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::bytes::Regex;
use rusqlite::Connection;

use crate::error::{ExportError, HarvesterError, Result};
use crate::export::{ExportFormat, ExportTarget, COLUMNS, TABLE_NAME};
use crate::harvester::export_all;
use crate::indicators::Extractor;
use crate::types::{CourtCode, Movement, ProcessRecord};

/// Page objects in a PDF body (`/Type/Page`, not `/Type/Pages`).
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PDF_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Page[^s]").expect("valid regex"));

/// Row elements in a worksheet part.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static XLSX_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<row[\s>]").expect("valid regex"));

fn at(date: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(10, 0, 0))
}

fn synthetic_record(
    number: &str,
    court: &str,
    subject: &str,
    parties: &str,
    filed: &str,
    movements: Vec<Movement>,
    extractor: &Extractor,
) -> Result<ProcessRecord> {
    let indicators = extractor.extract(&movements);
    Ok(ProcessRecord {
        process_number: number.into(),
        court: CourtCode::parse(court)?,
        subject: subject.into(),
        parties: parties.into(),
        filing_date: at(filed).map(|dt| dt.date()),
        class: None,
        judging_body: None,
        degree: None,
        status: None,
        movements,
        indicators,
    })
}

/// The fixed self-test dataset.
///
/// The second record, and only that one, mentions execution-phase terms.
pub fn synthetic_dataset(extractor: &Extractor) -> Result<Vec<ProcessRecord>> {
    Ok(vec![
        synthetic_record(
            "0000000-00.2020.8.99.9999",
            "tjxx",
            "Contrato",
            "AUTOR: Empresa A; RÉU: Empresa B",
            "2020-01-01",
            vec![
                Movement::new(at("2020-01-01"), "Distribuição por sorteio"),
                Movement::new(at("2020-02-01"), "Intimação para manifestação"),
                Movement::new(at("2020-03-10"), "Decisão interlocutória proferida"),
            ],
            extractor,
        )?,
        synthetic_record(
            "1111111-11.2021.8.99.9999",
            "tjyy",
            "Cobrança",
            "EXEQUENTE: Fulano; EXECUTADO: Sicrano",
            "2021-05-10",
            vec![
                Movement::new(at("2021-05-10"), "Distribuição"),
                Movement::new(at("2021-08-01"), "Sentença de mérito"),
                Movement::new(at("2021-09-15"), "Penhora de valores via sistema bancário"),
            ],
            extractor,
        )?,
    ])
}

/// Read an artifact back and return what it holds: data rows for the
/// tabular formats and record blocks for the text report.
///
/// PDF has no row structure to read back, so for PDF this returns the page
/// count from [`pdf_page_count`]. Every record starts a page, so the count
/// is at least the number of records, and more when a record overflows.
pub fn verify_artifact(format: ExportFormat, path: &Path) -> std::result::Result<usize, ExportError> {
    let invalid = |reason: String| ExportError::InvalidArtifact {
        path: path.to_path_buf(),
        reason,
    };

    if std::fs::metadata(path)?.len() == 0 {
        return Err(invalid("file is empty".into()));
    }

    match format {
        ExportFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)?;
            let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
            if headers != COLUMNS {
                return Err(invalid(format!("unexpected header {headers:?}")));
            }
            let mut rows = 0;
            for record in reader.records() {
                record?;
                rows += 1;
            }
            Ok(rows)
        }
        ExportFormat::Sqlite => {
            let conn = Connection::open(path)?;
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |r| r.get(0))?;
            usize::try_from(count).map_err(|e| invalid(e.to_string()))
        }
        ExportFormat::Xlsx => {
            let file = std::fs::File::open(path)?;
            let mut archive = zip::ZipArchive::new(file)?;
            let mut sheet = Vec::new();
            archive
                .by_name("xl/worksheets/sheet1.xml")?
                .read_to_end(&mut sheet)?;
            match XLSX_ROW.find_iter(&sheet).count() {
                0 => Err(invalid("worksheet has no header row".into())),
                n => Ok(n - 1),
            }
        }
        ExportFormat::Pdf => pdf_page_count(path),
        ExportFormat::Text => {
            let text = std::fs::read_to_string(path)?;
            Ok(text
                .lines()
                .filter(|l| l.starts_with(crate::export::BLOCK_PREFIX))
                .count())
        }
    }
}

/// Check the PDF header and trailer and count page objects.
pub fn pdf_page_count(path: &Path) -> std::result::Result<usize, ExportError> {
    let invalid = |reason: &str| ExportError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let bytes = std::fs::read(path)?;
    if !bytes.starts_with(b"%PDF-") {
        return Err(invalid("missing %PDF header"));
    }
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(invalid("missing %%EOF trailer"));
    }
    Ok(PDF_PAGE.find_iter(&bytes).count())
}

/// One validated self-test artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedArtifact {
    pub format: ExportFormat,
    pub path: PathBuf,
    /// Count from [`verify_artifact`]; pages for PDF.
    pub rows: usize,
}

/// Write the synthetic dataset to `targets` and validate each artifact.
///
/// With no targets, all four primary formats are written to a temporary
/// directory that is removed afterwards.
pub fn run_selftest(targets: &[ExportTarget], extractor: &Extractor) -> Result<Vec<VerifiedArtifact>> {
    let dataset = synthetic_dataset(extractor)?;

    let scratch;
    let targets: Vec<ExportTarget> = if targets.is_empty() {
        scratch = tempfile::tempdir()?;
        ExportFormat::PRIMARY
            .iter()
            .map(|f| {
                ExportTarget::new(*f, scratch.path().join(format!("selftest.{}", f.extension())))
            })
            .collect()
    } else {
        targets.to_vec()
    };

    let report = export_all(&dataset, &targets);
    if let Some(failure) = report.failures.into_iter().next() {
        return Err(failure.error.into());
    }

    let mut verified = Vec::with_capacity(report.written.len());
    for target in report.written {
        let rows = verify_artifact(target.format, &target.path)?;
        if rows != dataset.len() {
            return Err(HarvesterError::Export(ExportError::InvalidArtifact {
                path: target.path,
                reason: format!("expected {} rows, found {rows}", dataset.len()),
            }));
        }
        tracing::info!(format = %target.format, rows, "Self-test artifact verified");
        verified.push(VerifiedArtifact {
            format: target.format,
            path: target.path,
            rows,
        });
    }

    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_synthetic_dataset_execution_flags() {
        let dataset = synthetic_dataset(&Extractor::default()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(!dataset[0].indicators.in_execution_phase);
        assert!(dataset[1].indicators.in_execution_phase);
        assert_eq!(
            dataset[0].indicators.upcoming_deadline_mentions,
            vec!["2020-02-01: Intimação para manifestação".to_string()]
        );
        assert_eq!(dataset[1].indicators.last_decision_summary, "Sentença de mérito");
    }

    #[test]
    fn test_run_selftest_default_targets() {
        let verified = run_selftest(&[], &Extractor::default()).unwrap();
        let formats: Vec<ExportFormat> = verified.iter().map(|v| v.format).collect();
        assert_eq!(formats, ExportFormat::PRIMARY.to_vec());
        assert!(verified.iter().all(|v| v.rows == 2));
    }

    #[test]
    fn test_verify_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            verify_artifact(ExportFormat::Csv, &path),
            Err(ExportError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_csv_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert!(matches!(
            verify_artifact(ExportFormat::Csv, &path),
            Err(ExportError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_pdf_count_is_pages_not_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        let mut dataset = synthetic_dataset(&Extractor::default()).unwrap();
        dataset[0].indicators.upcoming_deadline_mentions =
            vec!["2020-02-01: Intimação para manifestação".to_string(); 80];

        crate::export::write(ExportFormat::Pdf, &dataset, &path).unwrap();

        let pages = verify_artifact(ExportFormat::Pdf, &path).unwrap();
        assert_eq!(pages, pdf_page_count(&path).unwrap());
        assert!(pages > dataset.len());
    }

    #[test]
    fn test_verify_rejects_non_pdf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "not a pdf").unwrap();
        assert!(verify_artifact(ExportFormat::Pdf, &path).is_err());
    }
}
