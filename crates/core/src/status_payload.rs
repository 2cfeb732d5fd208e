//! The composed status answer returned to pollers.
//!
//! Unknown identifiers are a normal outcome, not an error: they get the
//! `message` form. Known jobs get `processStatus` + `timeInfo`, plus the
//! recorded `failureReason` when the job failed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::job::{JobRecord, JobStatus};
use crate::timing;
use crate::types::Timestamp;

/// Status payload for a single job, as serialized to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    /// No record exists for the queried id.
    NotFound {
        message: String,
    },
    /// The job exists; status and derived timing text.
    Found {
        #[serde(rename = "processStatus")]
        process_status: JobStatus,
        #[serde(rename = "timeInfo")]
        time_info: String,
        #[serde(
            rename = "failureReason",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        failure_reason: Option<String>,
    },
}

impl StatusPayload {
    /// Payload for an identifier with no record. Accepts anything
    /// displayable so unparseable ids from the wire get the same answer
    /// as well-formed-but-unknown ones.
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            message: format!("process id {id} not found"),
        }
    }

    /// Compose the payload for an existing record. `now` feeds the
    /// running-time derivation and is re-evaluated on every query.
    pub fn from_record(record: &JobRecord, now: Timestamp) -> Self {
        Self::Found {
            process_status: record.status,
            time_info: timing::time_info(record, now),
            failure_reason: record.failure_reason.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::job::JobId;

    #[test]
    fn not_found_payload_names_the_id() {
        let id = JobId::new();
        let json = serde_json::to_value(StatusPayload::not_found(id)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "message": format!("process id {id} not found") })
        );
    }

    #[test]
    fn completed_payload_has_status_and_time_info_only() {
        let started = Utc::now();
        let mut record = JobRecord::running(started);
        record.complete(started + Duration::seconds(3)).unwrap();

        let json = serde_json::to_value(StatusPayload::from_record(&record, Utc::now())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "processStatus": "COMPLETED",
                "timeInfo": "compilation time 3 seconds",
            })
        );
    }

    #[test]
    fn failed_payload_includes_failure_reason() {
        let started = Utc::now();
        let mut record = JobRecord::running(started);
        record
            .fail(started + Duration::seconds(1), "ValueError: bad data")
            .unwrap();

        let json = serde_json::to_value(StatusPayload::from_record(&record, Utc::now())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "processStatus": "FAILED",
                "timeInfo": "process failed after 1 seconds",
                "failureReason": "ValueError: bad data",
            })
        );
    }

    #[test]
    fn running_payload_derives_elapsed_from_query_clock() {
        let started = Utc::now();
        let record = JobRecord::running(started);

        let payload = StatusPayload::from_record(&record, started + Duration::seconds(9));
        match payload {
            StatusPayload::Found {
                process_status,
                time_info,
                failure_reason,
            } => {
                assert_eq!(process_status, JobStatus::Running);
                assert_eq!(time_info, "running for 9 seconds");
                assert!(failure_reason.is_none());
            }
            other => panic!("expected Found payload, got {other:?}"),
        }
    }
}
