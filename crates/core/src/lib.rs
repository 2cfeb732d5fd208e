//! Domain types for the autofit training connector.
//!
//! Everything here is pure data and logic: job identifiers, the per-job
//! lifecycle record and its state machine, timing derivation for status
//! responses, and the training request schema with its validators. No I/O
//! lives in this crate.

pub mod error;
pub mod job;
pub mod status_payload;
pub mod timing;
pub mod training;
pub mod types;
