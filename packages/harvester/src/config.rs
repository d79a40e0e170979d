//! Configuration constants and validation functions for the harvester.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use regex::Regex;

use crate::error::ConfigurationError;

/// Base URL of the DataJud public API.
pub const DATAJUD_BASE_URL: &str = "https://api-publica.datajud.cnj.jus.br";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "DATAJUD_API_KEY";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "DATAJUD_BASE_URL";

/// Environment variable overriding the HTTP timeout.
pub const TIMEOUT_ENV: &str = "DATAJUD_TIMEOUT_SECS";

/// HTTP timeout in seconds.
///
/// Large pages with full movement histories can take a while to serialize
/// on the server side.
pub const HTTP_TIMEOUT_SECS: u64 = 50;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound for a single retry delay, server-provided `Retry-After`
/// included.
pub const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Default number of hits per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Elasticsearch refuses `size` above this.
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Default page ceiling per court.
pub const DEFAULT_MAX_PAGES: u32 = 25;

/// Court alias: letters, optionally followed by digits or a `-uf` suffix
/// (`tre-sp`, or `tre-dft` for the Federal District).
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COURT_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,6}[0-9]{0,2}(-[a-z]{2,3})?$").expect("valid regex"));

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Punctuation allowed in formatted CPF/CNPJ numbers.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TAX_ID_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.\-/\s]").expect("valid regex"));

/// Parse and validate a date (YYYY-MM-DD).
///
/// # Examples
/// ```
/// use datajud_harvester::config::validate_date;
///
/// assert!(validate_date("2024-01-31").is_ok());
/// assert!(validate_date("31/01/2024").is_err());
/// assert!(validate_date("2024-02-30").is_err());
/// ```
pub fn validate_date(date_str: &str) -> Result<NaiveDate, ConfigurationError> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(ConfigurationError::InvalidDate(date_str.to_string()));
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ConfigurationError::InvalidDate(date_str.to_string()))
}

/// Normalize and validate a court alias.
///
/// Input is trimmed and lower-cased before validation, so `" TJPE "` is
/// accepted as `tjpe`.
///
/// # Examples
/// ```
/// use datajud_harvester::config::validate_court_code;
///
/// assert_eq!(validate_court_code("TJPE").unwrap(), "tjpe");
/// assert_eq!(validate_court_code("tre-sp").unwrap(), "tre-sp");
/// assert!(validate_court_code("tj pe").is_err());
/// ```
pub fn validate_court_code(code: &str) -> Result<String, ConfigurationError> {
    let normalized = code.trim().to_lowercase();
    if COURT_CODE_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ConfigurationError::InvalidCourtCode(code.to_string()))
    }
}

/// Strip CPF/CNPJ punctuation and check the digit count.
///
/// # Examples
/// ```
/// use datajud_harvester::config::normalize_tax_id;
///
/// assert_eq!(normalize_tax_id("35.474.949/0001-08").unwrap(), "35474949000108");
/// assert_eq!(normalize_tax_id("123.456.789-09").unwrap(), "12345678909");
/// assert!(normalize_tax_id("1234").is_err());
/// ```
pub fn normalize_tax_id(tax_id: &str) -> Result<String, ConfigurationError> {
    let digits = TAX_ID_PUNCTUATION.replace_all(tax_id, "");
    let valid = digits.chars().all(|c| c.is_ascii_digit()) && matches!(digits.len(), 11 | 14);
    if valid {
        Ok(digits.into_owned())
    } else {
        Err(ConfigurationError::InvalidTaxId(tax_id.to_string()))
    }
}

/// Resolve the temporal cutoff once, at run start.
///
/// An explicit date wins over a day offset. The offset is counted back from
/// `today`, which the caller supplies so the result stays reproducible.
pub fn resolve_min_date(
    explicit: Option<&str>,
    since_days: Option<u32>,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, ConfigurationError> {
    if let Some(date) = explicit {
        return validate_date(date).map(Some);
    }

    match since_days {
        Some(days) => today
            .checked_sub_days(Days::new(u64::from(days)))
            .map(Some)
            .ok_or(ConfigurationError::InvalidOption {
                option: "--since-days",
                message: format!("{days} days before {today} is out of range"),
            }),
        None => Ok(None),
    }
}

/// Build the search endpoint for a court.
pub fn search_url(base_url: &str, court: &str) -> String {
    format!("{}/api_publica_{court}/_search", base_url.trim_end_matches('/'))
}

/// Connection settings for the DataJud API.
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
#[derive(Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_retry_after: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("max_retry_after", &self.max_retry_after)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingCredential(API_KEY_ENV.into()))?;

        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DATAJUD_BASE_URL.into());

        let timeout_secs = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        Ok(Self::builder(api_key)
            .base_url(base_url)
            .timeout(Duration::from_secs(timeout_secs))
            .build())
    }

    /// Create a config builder.
    pub fn builder(api_key: impl Into<String>) -> ApiConfigBuilder {
        ApiConfigBuilder {
            api_key: api_key.into(),
            base_url: DATAJUD_BASE_URL.into(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            max_retry_after: Duration::from_secs(MAX_RETRY_AFTER_SECS),
        }
    }

    /// Same settings with different retry behaviour.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self
    }
}

/// Builder for `ApiConfig`.
pub struct ApiConfigBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    max_retry_after: Duration,
}

impl ApiConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn max_retry_after(mut self, max_retry_after: Duration) -> Self {
        self.max_retry_after = max_retry_after;
        self
    }

    pub fn build(self) -> ApiConfig {
        ApiConfig {
            api_key: self.api_key,
            base_url: self.base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            max_retry_after: self.max_retry_after,
        }
    }
}
