//! Main harvester service that ties all components together.
//!
//! Courts are fetched one after another. A court that fails is logged and
//! skipped; the rest of the run continues. Exports run after all fetching
//! is done, one format at a time.

use std::collections::HashSet;

use crate::config::ApiConfig;
use crate::error::{ExportError, FetchError, HarvesterError, Result};
use crate::export::{self, text_fallback_path, ExportFormat, ExportTarget};
use crate::filter::filter_since;
use crate::http::{RetryClient, SearchBackend};
use crate::indicators::Extractor;
use crate::search::fetch_all;
use crate::types::{ConsolidatedDataset, CourtCode, ProcessRecord, SearchQuery};

/// A court whose search was abandoned.
#[derive(Debug, Clone)]
pub struct CourtFailure {
    pub court: CourtCode,
    pub error: FetchError,
}

/// Outcome of the collection phase.
#[derive(Debug, Default)]
pub struct HarvestReport {
    /// Deduplicated, filtered records, in court then page order.
    pub dataset: ConsolidatedDataset,
    /// Records fetched per successful court, before filtering.
    pub fetched: Vec<(CourtCode, usize)>,
    pub failures: Vec<CourtFailure>,
}

impl HarvestReport {
    /// No court produced data and at least one court failed.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        !self.failures.is_empty() && self.fetched.iter().all(|(_, n)| *n == 0)
    }
}

/// A requested output that could not be written.
#[derive(Debug)]
pub struct ExportFailure {
    pub target: ExportTarget,
    pub error: ExportError,
}

/// Outcome of the export phase.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Number of targets asked for, fallbacks not included.
    pub requested: usize,
    pub written: Vec<ExportTarget>,
    pub failures: Vec<ExportFailure>,
}

impl ExportReport {
    /// Something was requested and nothing got written.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.written.is_empty() && !self.failures.is_empty()
    }
}

/// Run the search against DataJud with the given connection settings.
pub fn harvest(config: &ApiConfig, query: &SearchQuery, extractor: &Extractor) -> Result<HarvestReport> {
    let client = RetryClient::new(config)?;
    Ok(collect(&client, query, extractor))
}

/// Fetch every target court, then deduplicate and apply the cutoff.
pub fn collect(backend: &dyn SearchBackend, query: &SearchQuery, extractor: &Extractor) -> HarvestReport {
    let mut report = HarvestReport::default();
    let mut records: Vec<ProcessRecord> = Vec::new();

    for court in &query.target_courts {
        tracing::info!(court = %court, "Querying court");
        match fetch_all(backend, court, query, extractor) {
            Ok(found) => {
                tracing::info!(court = %court, processes = found.len(), "Court done");
                report.fetched.push((court.clone(), found.len()));
                records.extend(found);
            }
            Err(error) => {
                tracing::error!(court = %court, error = %error, "Court skipped");
                report.failures.push(CourtFailure {
                    court: court.clone(),
                    error,
                });
            }
        }
    }

    let records = dedup_across_courts(records);
    report.dataset = filter_since(records, query.min_date);
    report
}

/// Drop repeated (court, process number) pairs, keeping the first.
#[must_use]
pub fn dedup_across_courts(records: Vec<ProcessRecord>) -> Vec<ProcessRecord> {
    let mut seen: HashSet<(CourtCode, String)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.court.clone(), r.process_number.clone())))
        .collect()
}

/// Write every target in turn.
///
/// A failing writer is logged and recorded; the others still run. When a PDF
/// fails, a plain-text report is written next to it instead.
pub fn export_all(records: &[ProcessRecord], targets: &[ExportTarget]) -> ExportReport {
    let mut report = ExportReport {
        requested: targets.len(),
        ..ExportReport::default()
    };

    for target in targets {
        match export::write(target.format, records, &target.path) {
            Ok(()) => {
                tracing::info!(format = %target.format, path = %target.path.display(), "Export written");
                report.written.push(target.clone());
            }
            Err(error) => {
                tracing::error!(format = %target.format, path = %target.path.display(), error = %error, "Export failed");

                if target.format == ExportFormat::Pdf {
                    let fallback = ExportTarget::new(ExportFormat::Text, text_fallback_path(&target.path));
                    tracing::warn!(path = %fallback.path.display(), "Writing text report instead of PDF");
                    match export::write(fallback.format, records, &fallback.path) {
                        Ok(()) => report.written.push(fallback),
                        Err(e) => {
                            tracing::error!(path = %fallback.path.display(), error = %e, "Text fallback failed");
                            report.failures.push(ExportFailure {
                                target: fallback,
                                error: e,
                            });
                        }
                    }
                }

                report.failures.push(ExportFailure {
                    target: target.clone(),
                    error,
                });
            }
        }
    }

    report
}

/// Turn the two phase reports into the run's final verdict.
pub fn check_outcome(harvest: &HarvestReport, exports: &ExportReport) -> Result<()> {
    if harvest.is_total_failure() {
        return Err(HarvesterError::NothingCollected {
            failed: harvest.failures.len(),
        });
    }
    if exports.is_total_failure() {
        return Err(HarvesterError::NothingExported {
            requested: exports.requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::MockBackend;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn page(numbers: &[(&str, &str)]) -> Value {
        let hits: Vec<Value> = numbers
            .iter()
            .enumerate()
            .map(|(i, (n, date))| {
                json!({
                    "_source": {
                        "numeroProcesso": n,
                        "movimentos": [{ "dataHora": date, "nome": "Despacho" }]
                    },
                    "sort": [i]
                })
            })
            .collect();
        json!({ "hits": { "hits": hits } })
    }

    fn query(courts: &[&str], min_date: Option<NaiveDate>) -> SearchQuery {
        SearchQuery::new("EMPRESA", "35474949000108", courts, 5, min_date).unwrap()
    }

    fn fetch_error() -> FetchError {
        FetchError {
            endpoint: "x".into(),
            status: Some(429),
            attempts: 6,
            reason: "rate limited".into(),
        }
    }

    #[test]
    fn test_collect_continues_after_court_failure() {
        // Page size 100, so each single page is short and ends its court
        let backend = MockBackend::new(vec![
            Err(fetch_error()),
            Ok(page(&[("1", "2024-01-01T00:00:00Z"), ("2", "2024-02-01T00:00:00Z")])),
        ]);
        let report = collect(&backend, &query(&["tjpe", "tjba"], None), &Extractor::default());

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].court.as_str(), "tjpe");
        assert_eq!(report.dataset.len(), 2);
        assert!(report.dataset.iter().all(|r| r.court.as_str() == "tjba"));
        assert!(!report.is_total_failure());
    }

    #[test]
    fn test_collect_total_failure() {
        let backend = MockBackend::new(vec![Err(fetch_error()), Ok(page(&[]))]);
        let report = collect(&backend, &query(&["tjpe", "tjba"], None), &Extractor::default());
        assert!(report.is_total_failure());
        assert!(matches!(
            check_outcome(&report, &ExportReport::default()),
            Err(HarvesterError::NothingCollected { failed: 1 })
        ));
    }

    #[test]
    fn test_empty_result_without_errors_is_success() {
        let backend = MockBackend::new(vec![]);
        let report = collect(&backend, &query(&["tjpe"], None), &Extractor::default());
        assert!(report.dataset.is_empty());
        assert!(check_outcome(&report, &ExportReport::default()).is_ok());
    }

    #[test]
    fn test_collect_applies_cutoff() {
        let backend = MockBackend::new(vec![Ok(page(&[
            ("old", "2019-01-01T00:00:00Z"),
            ("new", "2024-01-01T00:00:00Z"),
        ]))]);
        let report = collect(
            &backend,
            &query(&["tjpe"], NaiveDate::from_ymd_opt(2023, 1, 1)),
            &Extractor::default(),
        );
        let numbers: Vec<&str> = report.dataset.iter().map(|r| r.process_number.as_str()).collect();
        assert_eq!(numbers, vec!["new"]);
        assert_eq!(report.fetched[0].1, 2);
    }

    #[test]
    fn test_same_number_in_two_courts_is_kept_twice() {
        let backend = MockBackend::new(vec![
            Ok(page(&[("1", "2024-01-01T00:00:00Z")])),
            Ok(page(&[("1", "2024-01-01T00:00:00Z")])),
        ]);
        let report = collect(&backend, &query(&["tjpe", "trf5"], None), &Extractor::default());
        assert_eq!(report.dataset.len(), 2);
    }

    #[test]
    fn test_export_all_continues_after_failure() {
        let dir = tempdir().unwrap();
        let targets = vec![
            ExportTarget::new(ExportFormat::Csv, dir.path().join("missing/dir/out.csv")),
            ExportTarget::new(ExportFormat::Csv, dir.path().join("out.csv")),
        ];
        let report = export_all(&[], &targets);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.written.len(), 1);
        assert!(!report.is_total_failure());
    }

    #[test]
    fn test_pdf_failure_falls_back_to_text() {
        let dir = tempdir().unwrap();
        // A directory where the PDF should go makes File::create fail
        let pdf_path = dir.path().join("report.pdf");
        std::fs::create_dir(&pdf_path).unwrap();

        let report = export_all(&[], &[ExportTarget::new(ExportFormat::Pdf, &pdf_path)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].format, ExportFormat::Text);
        assert!(dir.path().join("report.txt").exists());
    }

    #[test]
    fn test_failed_pdf_and_fallback_count_as_one_request() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("report.pdf")).unwrap();
        std::fs::create_dir(dir.path().join("report.txt")).unwrap();

        let exports = export_all(
            &[],
            &[ExportTarget::new(ExportFormat::Pdf, dir.path().join("report.pdf"))],
        );
        assert_eq!(exports.failures.len(), 2);
        assert!(matches!(
            check_outcome(&HarvestReport::default(), &exports),
            Err(HarvesterError::NothingExported { requested: 1 })
        ));
    }

    #[test]
    fn test_all_exports_failing_is_fatal() {
        let dir = tempdir().unwrap();
        let targets = vec![ExportTarget::new(
            ExportFormat::Sqlite,
            dir.path().join("nope/out.db"),
        )];
        let exports = export_all(&[], &targets);
        assert!(matches!(
            check_outcome(&HarvestReport::default(), &exports),
            Err(HarvesterError::NothingExported { requested: 1 })
        ));
    }
}
