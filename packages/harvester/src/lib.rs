//! DataJud Harvester - Collect judicial processes for a party from the CNJ
//! public API.
//!
//! This crate queries the DataJud Elasticsearch endpoints court by court,
//! derives a few indicators from each process's movement history and
//! exports the consolidated dataset to spreadsheet, CSV, SQLite and PDF.
//!
//! # Example
//!
//! ```
//! use datajud_harvester::config;
//!
//! // Validate court code and date
//! assert!(config::validate_court_code("tjpe").is_ok());
//! assert!(config::validate_date("2025-01-01").is_ok());
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants and validation
//! - [`types`]: Core data types (SearchQuery, ProcessRecord, Movement, etc.)
//! - [`error`]: Error types and Result alias
//! - [`http`]: Retrying HTTP client for the DataJud API
//! - [`api`]: DataJud response decoding
//! - [`search`]: Query building and `search_after` pagination
//! - [`indicators`]: Movement vocabulary and indicator extraction
//! - [`filter`]: Temporal cutoff
//! - [`export`]: XLSX, CSV, SQLite, PDF and text writers
//! - [`selftest`]: Offline check of the export path
//! - [`cli`]: Command-line interface
//! - [`harvester`]: Main harvester service

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod harvester;
pub mod http;
pub mod indicators;
pub mod search;
pub mod selftest;
pub mod types;

// Re-export main functions
pub use harvester::{collect, export_all, harvest};

// Re-export commonly used items
pub use config::{normalize_tax_id, validate_court_code, validate_date, ApiConfig};
pub use error::{ConfigurationError, ExportError, FetchError, HarvesterError, Result};
pub use indicators::{Extractor, Vocabulary};
pub use types::{CourtCode, DerivedIndicators, Movement, ProcessRecord, SearchQuery};
