//! Temporal cutoff applied to the collected dataset.

use chrono::NaiveDate;

use crate::types::ProcessRecord;

/// Date a record is judged by: its latest movement, else its filing date.
#[must_use]
pub fn effective_date(record: &ProcessRecord) -> Option<NaiveDate> {
    record.latest_movement_date().or(record.filing_date)
}

/// Keep records whose effective date is on or after `min_date`.
///
/// Relative order is preserved. A record with no usable date is dropped,
/// since it cannot be shown to meet the cutoff. Without a cutoff the input
/// is returned as is.
#[must_use]
pub fn filter_since(records: Vec<ProcessRecord>, min_date: Option<NaiveDate>) -> Vec<ProcessRecord> {
    let Some(cutoff) = min_date else {
        return records;
    };

    let before = records.len();
    let kept: Vec<ProcessRecord> = records
        .into_iter()
        .filter(|r| effective_date(r).is_some_and(|d| d >= cutoff))
        .collect();

    tracing::debug!(%cutoff, before, after = kept.len(), "Applied temporal filter");
    kept
}
