//! Core data types for the harvester.
//!
//! A run starts from an immutable [`SearchQuery`] and produces a list of
//! [`ProcessRecord`]s, each carrying the [`DerivedIndicators`] computed from
//! its movement history.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::{normalize_tax_id, validate_court_code, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::ConfigurationError;

/// A validated DataJud court alias (e.g. `tjpe`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct CourtCode(String);

impl CourtCode {
    /// Validate and normalize a court alias.
    pub fn parse(code: &str) -> Result<Self, ConfigurationError> {
        validate_court_code(code).map(Self)
    }

    /// Lower-case alias as used in the endpoint path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-case label used in output artifacts.
    #[must_use]
    pub fn label(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for CourtCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<CourtCode> for String {
    fn from(code: CourtCode) -> Self {
        code.label()
    }
}

/// Everything needed to run a search. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub party_name: String,
    pub tax_id: String,
    pub target_courts: Vec<CourtCode>,
    pub max_pages_per_court: u32,
    pub page_size: u32,
    pub min_date: Option<NaiveDate>,
}

impl SearchQuery {
    /// Validate caller input and build a query.
    ///
    /// Court codes are normalized and deduplicated, keeping first-seen order.
    pub fn new<S: AsRef<str>>(
        party_name: &str,
        tax_id: &str,
        courts: &[S],
        max_pages_per_court: u32,
        min_date: Option<NaiveDate>,
    ) -> Result<Self, ConfigurationError> {
        let party_name = party_name.trim();
        if party_name.is_empty() {
            return Err(ConfigurationError::MissingArgument("--name"));
        }
        if courts.is_empty() {
            return Err(ConfigurationError::MissingArgument("--courts"));
        }
        if max_pages_per_court == 0 {
            return Err(ConfigurationError::InvalidOption {
                option: "--max-pages",
                message: "must be at least 1".into(),
            });
        }

        let tax_id = normalize_tax_id(tax_id)?;

        let mut target_courts: Vec<CourtCode> = Vec::with_capacity(courts.len());
        for code in courts {
            let court = CourtCode::parse(code.as_ref())?;
            if !target_courts.contains(&court) {
                target_courts.push(court);
            }
        }

        Ok(Self {
            party_name: party_name.to_string(),
            tax_id,
            target_courts,
            max_pages_per_court,
            page_size: DEFAULT_PAGE_SIZE,
            min_date,
        })
    }

    /// Override the number of hits requested per page.
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, ConfigurationError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigurationError::InvalidOption {
                option: "--page-size",
                message: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            });
        }
        self.page_size = page_size;
        Ok(self)
    }
}

/// One entry in a process's procedural history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    pub date: Option<NaiveDateTime>,
    pub description: String,
}

impl Movement {
    #[must_use]
    pub fn new(date: Option<NaiveDateTime>, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
        }
    }
}

/// Flags and summaries computed from a movement history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedIndicators {
    pub upcoming_deadline_mentions: Vec<String>,
    pub last_decision_summary: String,
    pub in_execution_phase: bool,
}

/// One judicial process as returned by the API, plus its indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub process_number: String,
    pub court: CourtCode,
    pub subject: String,
    pub parties: String,
    pub filing_date: Option<NaiveDate>,
    pub class: Option<String>,
    pub judging_body: Option<String>,
    pub degree: Option<String>,
    pub status: Option<String>,
    pub movements: Vec<Movement>,
    pub indicators: DerivedIndicators,
}

impl ProcessRecord {
    /// Date of the most recent movement, by timestamp.
    #[must_use]
    pub fn latest_movement_date(&self) -> Option<NaiveDate> {
        self.movements
            .iter()
            .filter_map(|m| m.date)
            .max()
            .map(|dt| dt.date())
    }
}

/// The final record set handed to every export writer.
pub type ConsolidatedDataset = Vec<ProcessRecord>;
