//! Command-line interface for the harvester.
//!
//! Status output goes to stderr so that the JSON dump printed when no export
//! is requested can be piped from stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    resolve_min_date, ApiConfig, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_PAGES, DEFAULT_MAX_RETRIES,
    DEFAULT_PAGE_SIZE,
};
use crate::error::{ExportError, Result};
use crate::export::{ExportFormat, ExportTarget};
use crate::harvester::{check_outcome, export_all, harvest, ExportReport};
use crate::indicators::{Extractor, Vocabulary};
use crate::selftest::run_selftest;
use crate::types::SearchQuery;

/// DataJud Harvester - Collect judicial processes for a party from the CNJ public API.
#[derive(Debug, Parser)]
#[command(name = "datajud-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Party name, matched as an exact phrase
    #[arg(long, visible_alias = "nome", required_unless_present = "selftest")]
    pub name: Option<String>,

    /// CPF or CNPJ of the party, with or without punctuation
    #[arg(long, visible_alias = "cnpj", required_unless_present = "selftest")]
    pub tax_id: Option<String>,

    /// DataJud court codes (e.g. tjpe trf5)
    #[arg(
        long,
        visible_alias = "tribunais",
        num_args = 1..,
        required_unless_present = "selftest"
    )]
    pub courts: Vec<String>,

    /// Maximum pages requested per court
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    /// Hits per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Keep only processes with activity on or after this date (YYYY-MM-DD)
    #[arg(long, visible_alias = "desde", conflicts_with = "since_days")]
    pub since: Option<String>,

    /// Keep only processes with activity in the last N days
    #[arg(long)]
    pub since_days: Option<u32>,

    /// Write an Excel workbook to this path
    #[arg(long, value_name = "PATH")]
    pub excel: Option<PathBuf>,

    /// Write a CSV file to this path
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Write a SQLite database to this path
    #[arg(long, value_name = "PATH")]
    pub sqlite: Option<PathBuf>,

    /// Write a PDF report to this path
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<PathBuf>,

    /// Skip the PDF report even if --pdf is given
    #[arg(long)]
    pub no_pdf: bool,

    /// YAML file with deadline/decision/execution terms
    #[arg(long, value_name = "YAML")]
    pub vocabulary: Option<PathBuf>,

    /// Retries per request after the first attempt
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[arg(long, default_value_t = DEFAULT_BACKOFF_BASE_MS)]
    pub backoff_ms: u64,

    /// Export a synthetic dataset and validate the files, without network access
    #[arg(long)]
    pub selftest: bool,
}

impl Cli {
    /// Requested outputs, in a fixed order.
    #[must_use]
    pub fn export_targets(&self) -> Vec<ExportTarget> {
        let pdf = if self.no_pdf { None } else { self.pdf.as_ref() };

        [
            (ExportFormat::Xlsx, self.excel.as_ref()),
            (ExportFormat::Csv, self.csv.as_ref()),
            (ExportFormat::Sqlite, self.sqlite.as_ref()),
            (ExportFormat::Pdf, pdf),
        ]
        .into_iter()
        .filter_map(|(format, path)| path.map(|p| ExportTarget::new(format, p)))
        .collect()
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_pdf && cli.pdf.is_some() {
        tracing::warn!("--no-pdf given, ignoring --pdf");
    }

    let extractor = load_extractor(cli.vocabulary.as_deref())?;

    if cli.selftest {
        selftest_command(&cli, &extractor)
    } else {
        harvest_command(&cli, &extractor)
    }
}

fn load_extractor(vocabulary: Option<&Path>) -> Result<Extractor> {
    let vocabulary = match vocabulary {
        Some(path) => Vocabulary::from_yaml_file(path)?,
        None => Vocabulary::default(),
    };
    Ok(Extractor::new(&vocabulary)?)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Execute a search and export run.
fn harvest_command(cli: &Cli, extractor: &Extractor) -> Result<()> {
    // Validate everything before making HTTP requests
    let today = chrono::Local::now().date_naive();
    let min_date = resolve_min_date(cli.since.as_deref(), cli.since_days, today)?;
    let query = SearchQuery::new(
        cli.name.as_deref().unwrap_or_default(),
        cli.tax_id.as_deref().unwrap_or_default(),
        cli.courts.as_slice(),
        cli.max_pages,
        min_date,
    )?
    .with_page_size(cli.page_size)?;
    let config = ApiConfig::from_env()?
        .with_retry(cli.max_retries, Duration::from_millis(cli.backoff_ms));

    eprintln!(
        "{} {} ({}) in {} court(s)",
        style("Searching").bold(),
        style(&query.party_name).cyan(),
        query.tax_id,
        query.target_courts.len()
    );
    if let Some(date) = query.min_date {
        eprintln!("  Since: {}", style(date).green());
    }
    eprintln!();

    let pb = spinner("Querying DataJud...");
    let report = match harvest(&config, &query, extractor) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    for (court, count) in &report.fetched {
        eprintln!("  {}: {} process(es)", court.label(), count);
    }
    for failure in &report.failures {
        eprintln!(
            "  {}: {}",
            style(failure.court.label()).red().bold(),
            style(&failure.error).red()
        );
    }
    eprintln!(
        "  After filtering: {}",
        style(report.dataset.len()).green().bold()
    );

    if report.is_total_failure() {
        return check_outcome(&report, &ExportReport::default());
    }

    let targets = cli.export_targets();
    if targets.is_empty() {
        let json = serde_json::to_string_pretty(&report.dataset).map_err(ExportError::from)?;
        println!("{json}");
        return check_outcome(&report, &ExportReport::default());
    }

    let pb = spinner("Writing exports...");
    let exports = export_all(&report.dataset, &targets);
    pb.finish_and_clear();

    eprintln!();
    for target in &exports.written {
        eprintln!(
            "{} {}",
            style("Saved to:").green().bold(),
            target.path.display()
        );
    }
    for failure in &exports.failures {
        eprintln!(
            "{} {} ({})",
            style("Failed:").red().bold(),
            failure.target.path.display(),
            failure.error
        );
    }

    check_outcome(&report, &exports)
}

/// Execute the offline self-test.
fn selftest_command(cli: &Cli, extractor: &Extractor) -> Result<()> {
    eprintln!("{}", style("Running self-test").bold());

    let verified = run_selftest(&cli.export_targets(), extractor)?;
    for artifact in &verified {
        eprintln!(
            "  {:<6} {} row(s)",
            artifact.format.as_str(),
            artifact.rows
        );
    }

    eprintln!();
    eprintln!("{}", style("Self-test passed").green().bold());
    Ok(())
}
