//! Error types for the harvester.
//!
//! Follows the same split the run itself makes: `ConfigurationError` is
//! fatal and raised before any request goes out, `FetchError` aborts a
//! single court, and `ExportError` aborts a single output format.
//! `HarvesterError` wraps all of them for library consumers.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing run configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The API credential environment variable is not set.
    #[error("Missing API credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// Invalid date format.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD (e.g., 2024-01-31)")]
    InvalidDate(String),

    /// Court alias not in the expected shape.
    #[error("Invalid court code: '{0}'. Expected a DataJud alias such as tjpe, trf5 or tre-sp")]
    InvalidCourtCode(String),

    /// Tax id that is neither a CPF (11 digits) nor a CNPJ (14 digits).
    #[error("Invalid tax id: '{0}'. Expected a CPF (11 digits) or CNPJ (14 digits)")]
    InvalidTaxId(String),

    /// Required argument missing outside self-test mode.
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    /// Numeric option outside its accepted range.
    #[error("Invalid value for {option}: {message}")]
    InvalidOption {
        option: &'static str,
        message: String,
    },

    /// Vocabulary file could not be read or is malformed.
    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(String),
}

/// A request to the DataJud API that failed for good.
///
/// Raised after retries are exhausted, on a non-retryable client error,
/// or when the response body cannot be decoded.
#[derive(Debug, Clone, Error)]
#[error(
    "Request to {endpoint} failed after {attempts} attempt(s){}: {reason}",
    .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
)]
pub struct FetchError {
    pub endpoint: String,
    pub status: Option<u16>,
    pub attempts: u32,
    pub reason: String,
}

/// Failure producing or validating one output artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writing failed.
    #[error("Spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// SQLite writing or reading failed.
    #[error("SQLite export failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PDF generation failed.
    #[error("PDF export failed: {0}")]
    Pdf(String),

    /// Spreadsheet archive could not be opened for validation.
    #[error("Spreadsheet archive unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Artifact exists but is structurally wrong.
    #[error("Artifact {} failed validation: {reason}", .path.display())]
    InvalidArtifact { path: PathBuf, reason: String },
}

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Every court failed and nothing was collected.
    #[error("No court returned data; {failed} court(s) failed")]
    NothingCollected { failed: usize },

    /// Every requested output format failed.
    #[error("All {requested} requested export(s) failed")]
    NothingExported { requested: usize },
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_with_status() {
        let err = FetchError {
            endpoint: "https://example.test/api_publica_tjpe/_search".to_string(),
            status: Some(429),
            attempts: 6,
            reason: "rate limited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request to https://example.test/api_publica_tjpe/_search failed after 6 attempt(s) (HTTP 429): rate limited"
        );
    }

    #[test]
    fn test_fetch_error_display_without_status() {
        let err = FetchError {
            endpoint: "http://localhost/x".to_string(),
            status: None,
            attempts: 1,
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request to http://localhost/x failed after 1 attempt(s): connection refused"
        );
    }

    #[test]
    fn test_configuration_error_is_transparent() {
        let err: HarvesterError = ConfigurationError::InvalidDate("2024/01/01".to_string()).into();
        assert!(err.to_string().contains("2024/01/01"));
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}
