//! Job identifier and the per-job lifecycle record.
//!
//! A [`JobRecord`] is created exactly once, when execution begins, in the
//! `Running` state. It then makes at most one further transition, to
//! `Completed` or `Failed`, and is never mutated again. The record's JSON
//! form is the on-disk layout the status store persists, so the serde
//! attributes here define the wire format:
//!
//! ```json
//! {
//!   "status": "FAILED",
//!   "started_at": "2026-08-06T10:00:00Z",
//!   "failed_at": "2026-08-06T10:00:07Z",
//!   "failureReason": "..."
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Opaque, globally unique job identifier (UUID v4).
///
/// Generated once at submission time; used as the lookup key for all
/// status operations. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Job lifecycle status.
///
/// Transitions are monotone and terminal: `Running` -> `Completed` or
/// `Running` -> `Failed`, nothing after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// Persisted lifecycle record, one per [`JobId`].
///
/// Exactly one of `completed_at` / (`failed_at` + `failure_reason`) is
/// populated once the record is terminal; `started_at` is set at creation
/// and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<Timestamp>,
    #[serde(
        rename = "failureReason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,
}

impl JobRecord {
    /// Create the initial record: status `Running`, `started_at = now`.
    pub fn running(now: Timestamp) -> Self {
        Self {
            status: JobStatus::Running,
            started_at: now,
            completed_at: None,
            failed_at: None,
            failure_reason: None,
        }
    }

    /// Transition `Running` -> `Completed`, preserving `started_at`.
    pub fn complete(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.ensure_running(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Transition `Running` -> `Failed`, recording the diagnostic text.
    pub fn fail(&mut self, now: Timestamp, reason: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_running(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.failed_at = Some(now);
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn ensure_running(&self, to: JobStatus) -> Result<(), CoreError> {
        if self.status != JobStatus::Running {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
