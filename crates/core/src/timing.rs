//! Elapsed-time derivation for status responses.
//!
//! Pure functions from a [`JobRecord`] to the human-readable strings the
//! status endpoint returns. Durations truncate to whole seconds and are
//! clamped at zero so clock skew between writer and reader can never
//! produce a negative figure.

use crate::job::{JobRecord, JobStatus};
use crate::types::Timestamp;

/// Derive the `timeInfo` string for a record.
///
/// `now` is only consulted for `Running` records, where the elapsed time
/// is re-evaluated on every call against the wall clock.
pub fn time_info(record: &JobRecord, now: Timestamp) -> String {
    match record.status {
        JobStatus::Failed => {
            let end = record.failed_at.unwrap_or(record.started_at);
            format!(
                "process failed after {} seconds",
                elapsed_seconds(record.started_at, end)
            )
        }
        JobStatus::Completed => {
            let end = record.completed_at.unwrap_or(record.started_at);
            format!(
                "compilation time {} seconds",
                elapsed_seconds(record.started_at, end)
            )
        }
        JobStatus::Running => {
            format!(
                "running for {} seconds",
                elapsed_seconds(record.started_at, now)
            )
        }
    }
}

/// Whole seconds between `start` and `end`, clamped at zero.
fn elapsed_seconds(start: Timestamp, end: Timestamp) -> i64 {
    (end - start).num_seconds().max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
