//! HTTP client wrapper for the DataJud search endpoints.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{search_url, ApiConfig};
use crate::error::{FetchError, HarvesterError};
use crate::types::CourtCode;

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("datajud-harvester/", env!("CARGO_PKG_VERSION"));

/// Anything that can answer a search request for a court.
///
/// The paginator only talks to this trait, so tests can feed it canned
/// pages without a network.
pub trait SearchBackend {
    fn search(&self, court: &CourtCode, body: &Value) -> Result<Value, FetchError>;
}

/// Create a configured HTTP client.
pub fn create_client(config: &ApiConfig) -> Result<Client, HarvesterError> {
    let client = Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Blocking client that retries transient failures with exponential backoff.
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct RetryClient {
    http: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    backoff_base: Duration,
    max_retry_after: Duration,
}

/// What a single attempt produced.
enum Attempt {
    Done(Value),
    Retry {
        status: Option<u16>,
        reason: String,
        retry_after: Option<Duration>,
    },
    Fail {
        status: Option<u16>,
        reason: String,
    },
}

impl RetryClient {
    pub fn new(config: &ApiConfig) -> Result<Self, HarvesterError> {
        Ok(Self {
            http: create_client(config)?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            max_retry_after: config.max_retry_after,
        })
    }

    /// POST a JSON body to `endpoint` and decode the JSON response.
    ///
    /// Retries on 429, 5xx and connection/timeout errors, up to
    /// `max_retries` times after the first attempt.
    pub fn call(&self, endpoint: &str, body: &Value) -> Result<Value, FetchError> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let (status, reason, retry_after) = match self.attempt(endpoint, body) {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail { status, reason } => {
                    return Err(FetchError {
                        endpoint: endpoint.to_string(),
                        status,
                        attempts,
                        reason,
                    });
                }
                Attempt::Retry {
                    status,
                    reason,
                    retry_after,
                } => (status, reason, retry_after),
            };

            let retry = attempts - 1;
            if retry >= self.max_retries {
                tracing::warn!(endpoint, attempts, "Retries exhausted");
                return Err(FetchError {
                    endpoint: endpoint.to_string(),
                    status,
                    attempts,
                    reason,
                });
            }

            let delay = self.delay_for(retry, retry_after);
            tracing::warn!(
                endpoint,
                status = status.unwrap_or_default(),
                attempt = attempts,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                reason = %reason,
                "Transient failure, will retry"
            );
            thread::sleep(delay);
        }
    }

    /// Backoff for the `retry`-th retry (0-based): `base * 2^retry`,
    /// stretched to a server hint when that is longer. Never exceeds
    /// `max_retry_after`.
    fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let backoff = self.backoff_base.saturating_mul(factor);
        let delay = match retry_after {
            Some(hint) => backoff.max(hint),
            None => backoff,
        };
        delay.min(self.max_retry_after)
    }

    fn attempt(&self, endpoint: &str, body: &Value) -> Attempt {
        let response = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, format!("APIKey {}", self.api_key))
            .json(body)
            .send();

        match response {
            Ok(response) => self.classify(response),
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => Attempt::Retry {
                status: None,
                reason: e.to_string(),
                retry_after: None,
            },
            // Other errors (like invalid URL) - don't retry
            Err(e) => Attempt::Fail {
                status: None,
                reason: e.to_string(),
            },
        }
    }

    fn classify(&self, response: Response) -> Attempt {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Retry {
                status: Some(status.as_u16()),
                reason: "rate limited".into(),
                retry_after: parse_retry_after(response.headers()),
            };
        }

        if status.is_server_error() {
            return Attempt::Retry {
                status: Some(status.as_u16()),
                reason: format!("server error: {status}"),
                retry_after: None,
            };
        }

        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Attempt::Fail {
                status: Some(status.as_u16()),
                reason: format!("client error: {status} {}", truncate(&text, 200)),
            };
        }

        match response.json::<Value>() {
            Ok(value) => Attempt::Done(value),
            Err(e) if e.is_timeout() => Attempt::Retry {
                status: Some(status.as_u16()),
                reason: e.to_string(),
                retry_after: None,
            },
            Err(e) => Attempt::Fail {
                status: Some(status.as_u16()),
                reason: format!("invalid JSON body: {e}"),
            },
        }
    }
}

impl SearchBackend for RetryClient {
    fn search(&self, court: &CourtCode, body: &Value) -> Result<Value, FetchError> {
        let endpoint = search_url(&self.base_url, court.as_str());
        self.call(&endpoint, body)
    }
}

/// Read a delta-seconds `Retry-After` header.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Test utilities for code that consumes a [`SearchBackend`].
pub mod test_support {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Backend returning pre-configured responses in order.
    ///
    /// Once the queue is drained it keeps answering with the fallback,
    /// which defaults to an empty page.
    pub struct MockBackend {
        responses: RefCell<VecDeque<Result<Value, FetchError>>>,
        fallback: Value,
        requests: RefCell<Vec<(CourtCode, Value)>>,
    }

    impl MockBackend {
        pub fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                fallback: serde_json::json!({ "hits": { "hits": [] } }),
                requests: RefCell::new(Vec::new()),
            }
        }

        /// Answer every request with `page`, forever.
        pub fn repeating(page: Value) -> Self {
            let mut backend = Self::new(Vec::new());
            backend.fallback = page;
            backend
        }

        /// Requests seen so far.
        pub fn requests(&self) -> Vec<(CourtCode, Value)> {
            self.requests.borrow().clone()
        }
    }

    impl SearchBackend for MockBackend {
        fn search(&self, court: &CourtCode, body: &Value) -> Result<Value, FetchError> {
            self.requests
                .borrow_mut()
                .push((court.clone(), body.clone()));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(max_retries: u32, base_ms: u64) -> RetryClient {
        let config = ApiConfig::builder("test-key")
            .max_retries(max_retries)
            .backoff_base(Duration::from_millis(base_ms))
            .max_retry_after(Duration::from_secs(5))
            .build();
        RetryClient::new(&config).unwrap()
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(&ApiConfig::builder("k").build()).is_ok());
    }

    #[test]
    fn test_delay_doubles() {
        let c = client(5, 100);
        assert_eq!(c.delay_for(0, None), Duration::from_millis(100));
        assert_eq!(c.delay_for(1, None), Duration::from_millis(200));
        assert_eq!(c.delay_for(3, None), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_honours_longer_retry_after() {
        let c = client(5, 100);
        assert_eq!(
            c.delay_for(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        // Shorter hint does not shrink the backoff
        assert_eq!(
            c.delay_for(2, Some(Duration::from_millis(10))),
            Duration::from_millis(400)
        );
        // Hint is capped
        assert_eq!(
            c.delay_for(0, Some(Duration::from_secs(3600))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_delay_is_capped_for_many_retries() {
        let c = client(30, 1000);
        assert_eq!(c.delay_for(29, None), Duration::from_secs(5));
        assert_eq!(c.delay_for(40, None), Duration::from_secs(5));
        assert_eq!(c.delay_for(2, None), Duration::from_secs(4));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("açãoxyz", 3), "açã...");
    }
}
