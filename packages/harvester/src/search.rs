//! Paginated search of one court.
//!
//! Pages are walked with Elasticsearch `search_after`: each request is
//! sorted by `@timestamp`, and the `sort` values of the last hit become the
//! cursor for the next request.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::api::{decode_process, SearchResponse};
use crate::error::FetchError;
use crate::http::SearchBackend;
use crate::indicators::Extractor;
use crate::types::{CourtCode, ProcessRecord, SearchQuery};

/// Build the request body for one page.
///
/// Pages are ordered by `@timestamp` alone, the only sort key DataJud
/// documents for every court index. `search_after` is exclusive, so a hit
/// sharing the exact timestamp of the previous page's last hit is not
/// returned. Indexing timestamps carry millisecond precision, which keeps
/// such ties rare.
#[must_use]
pub fn build_search_body(query: &SearchQuery, search_after: Option<&[Value]>) -> Value {
    let mut body = json!({
        "size": query.page_size,
        "query": {
            "bool": {
                "should": [
                    { "match_phrase": { "partes.nome": query.party_name } },
                    { "match": { "partes.documento": query.tax_id } }
                ],
                "minimum_should_match": 1
            }
        },
        "sort": [{ "@timestamp": { "order": "asc" } }]
    });

    if let (Some(cursor), Some(map)) = (search_after, body.as_object_mut()) {
        map.insert("search_after".into(), Value::Array(cursor.to_vec()));
    }

    body
}

/// Fetch every matching process of `court`, up to the page ceiling.
///
/// Stops at the first empty page, the first page without a cursor, the
/// first short page, or after `query.max_pages_per_court` requests. Records
/// are deduplicated by process number, first occurrence wins. A failed
/// request aborts the whole court.
pub fn fetch_all(
    backend: &dyn SearchBackend,
    court: &CourtCode,
    query: &SearchQuery,
    extractor: &Extractor,
) -> Result<Vec<ProcessRecord>, FetchError> {
    let mut records: Vec<ProcessRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor: Option<Vec<Value>> = None;
    let page_size = usize::try_from(query.page_size).unwrap_or(usize::MAX);

    for page in 1..=query.max_pages_per_court {
        let body = build_search_body(query, cursor.as_deref());
        let raw = backend.search(court, &body)?;

        let response: SearchResponse =
            serde_json::from_value(raw).map_err(|e| FetchError {
                endpoint: format!("api_publica_{}/_search", court.as_str()),
                status: None,
                attempts: 1,
                reason: format!("unexpected response shape on page {page}: {e}"),
            })?;
        let hits = response.hits.hits;

        tracing::debug!(court = %court, page, hits = hits.len(), "Fetched page");

        if hits.is_empty() {
            break;
        }

        let short_page = hits.len() < page_size;
        cursor = hits.last().and_then(|h| h.sort.clone()).filter(|s| !s.is_empty());

        for hit in &hits {
            let Some(process) = decode_process(court, &hit.source) else {
                continue;
            };
            if !seen.insert(process.process_number.clone()) {
                tracing::debug!(court = %court, process = %process.process_number, "Duplicate hit");
                continue;
            }

            let indicators = extractor.extract(&process.movements);
            records.push(ProcessRecord {
                process_number: process.process_number,
                court: process.court,
                subject: process.subject,
                parties: process.parties,
                filing_date: process.filing_date,
                class: process.class,
                judging_body: process.judging_body,
                degree: process.degree,
                status: process.status,
                movements: process.movements,
                indicators,
            });
        }

        if short_page || cursor.is_none() {
            break;
        }

        if page == query.max_pages_per_court {
            tracing::info!(
                court = %court,
                max_pages = query.max_pages_per_court,
                "Page ceiling reached, results truncated"
            );
        }
    }

    Ok(records)
}
