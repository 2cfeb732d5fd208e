//! The job manager: public entry point for submission and status queries.
//!
//! `submit` allocates an identifier, starts isolated execution through
//! the configured [`JobLauncher`], and returns the id without waiting.
//! `query_status` re-reads the status store on every call and composes
//! the answer with the timing calculator, so it stays correct across
//! restarts of this process and independent of worker outcomes.

use std::sync::Arc;

use chrono::Utc;

use autofit_core::job::JobId;
use autofit_core::status_payload::StatusPayload;
use autofit_core::training::TrainRequest;
use autofit_store::{StatusStore, StoreError};

use crate::launcher::{JobLauncher, LaunchError};

/// Composes the status store, timing derivation, and an isolation
/// backend behind the submit/query contract.
pub struct JobManager {
    store: StatusStore,
    launcher: Arc<dyn JobLauncher>,
}

impl JobManager {
    pub fn new(store: StatusStore, launcher: Arc<dyn JobLauncher>) -> Self {
        Self { store, launcher }
    }

    /// Submit a training request: fresh id, fire-and-forget launch,
    /// immediate return. The job's eventual outcome is observable only
    /// through [`Self::query_status`].
    pub async fn submit(&self, request: &TrainRequest) -> Result<JobId, LaunchError> {
        let id = JobId::new();
        self.launcher.launch(id, request).await?;
        tracing::info!(job_id = %id, "Training job submitted");
        Ok(id)
    }

    /// Current status of `id`. Unknown ids are a normal outcome and get
    /// the not-found payload; only a store read fault is an error.
    pub fn query_status(&self, id: JobId) -> Result<StatusPayload, StoreError> {
        match self.store.read(id)? {
            None => Ok(StatusPayload::not_found(id)),
            Some(record) => Ok(StatusPayload::from_record(&record, Utc::now())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
