//! End-to-end self-test: synthetic dataset through every writer and back.

use datajud_harvester::export::{ExportFormat, ExportTarget, COLUMNS};
use datajud_harvester::indicators::Extractor;
use datajud_harvester::selftest::{run_selftest, synthetic_dataset, verify_artifact};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn test_selftest_writes_four_valid_files() {
    let dir = tempdir().unwrap();
    let targets: Vec<ExportTarget> = ExportFormat::PRIMARY
        .iter()
        .map(|f| ExportTarget::new(*f, dir.path().join(format!("processos.{}", f.extension()))))
        .collect();

    let verified = run_selftest(&targets, &Extractor::default()).unwrap();

    assert_eq!(verified.len(), 4);
    for artifact in &verified {
        assert_eq!(artifact.rows, 2, "{} row count", artifact.format);
        let size = std::fs::metadata(&artifact.path).unwrap().len();
        assert!(size > 0, "{} is empty", artifact.path.display());
    }
}

#[test]
fn test_execution_flag_only_on_execution_record() {
    let dataset = synthetic_dataset(&Extractor::default()).unwrap();
    let flags: Vec<bool> = dataset
        .iter()
        .map(|r| r.indicators.in_execution_phase)
        .collect();
    assert_eq!(flags, vec![false, true]);
}

#[test]
fn test_exported_flags_survive_csv_and_sqlite() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("processos.csv");
    let db_path = dir.path().join("processos.db");
    run_selftest(
        &[
            ExportTarget::new(ExportFormat::Csv, &csv_path),
            ExportTarget::new(ExportFormat::Sqlite, &db_path),
        ],
        &Extractor::default(),
    )
    .unwrap();

    let flag_column = COLUMNS
        .iter()
        .position(|c| *c == "in_execution_phase")
        .unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let csv_flags: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[flag_column].to_string())
        .collect();
    assert_eq!(csv_flags, vec!["false", "true"]);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let executing: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM processos WHERE in_execution_phase = 1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(executing, 1);
}

#[test]
fn test_verify_text_report() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("processos.txt");
    let verified = run_selftest(
        &[ExportTarget::new(ExportFormat::Text, &path)],
        &Extractor::default(),
    )
    .unwrap();

    assert_eq!(verified[0].rows, 2);
    assert_eq!(verify_artifact(ExportFormat::Text, &path).unwrap(), 2);
}
