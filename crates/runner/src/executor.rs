//! The job executor: runs an opaque work function and guarantees the
//! status store sees exactly one RUNNING write followed by exactly one
//! terminal write, no matter how the work function ends.
//!
//! Both error returns and panics inside the work function are captured
//! and recorded as FAILED with a full diagnostic; neither can escape
//! into the surrounding process. Store faults are the one thing this
//! module cannot recover from -- they are logged loudly and returned to
//! the caller as a fatal executor error.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Utc;

use autofit_core::error::CoreError;
use autofit_core::job::{JobId, JobRecord, JobStatus};
use autofit_store::{StatusStore, StoreError};

/// Fatal faults in the executor itself, outside the work function.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Run `work` for job `id`, bracketing it with status-store writes.
///
/// Sequence:
/// 1. write `{RUNNING, started_at}` before any work happens;
/// 2. run `work` on a blocking thread, catching both `Err` and panics;
/// 3. write COMPLETED or FAILED, preserving `started_at`.
///
/// Returns the terminal status that was recorded. An `Err` return means
/// the store itself failed -- if that happens during the terminal write
/// the job is left visibly stuck at RUNNING, which is why it is logged
/// at error level with the job id.
pub async fn run_job<F>(store: &StatusStore, id: JobId, work: F) -> Result<JobStatus, ExecutorError>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    let mut record = JobRecord::running(Utc::now());
    store.write(id, &record).map_err(|e| {
        tracing::error!(job_id = %id, error = %e, "Failed to write initial RUNNING record");
        e
    })?;
    tracing::info!(job_id = %id, "process started");

    let outcome = tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(work))).await;

    let fault = match outcome {
        Ok(Ok(Ok(()))) => None,
        // Work function returned an error: capture the full chain.
        Ok(Ok(Err(err))) => Some(format!("{err:?}")),
        // Work function panicked: the unwind stops at this boundary.
        Ok(Err(panic)) => Some(panic_message(panic.as_ref())),
        // The blocking task itself was torn down (runtime shutdown).
        Err(join_err) => Some(format!("worker task aborted: {join_err}")),
    };

    let status = match fault {
        None => {
            record.complete(Utc::now())?;
            tracing::info!(job_id = %id, "process completed");
            JobStatus::Completed
        }
        Some(reason) => {
            tracing::error!(job_id = %id, reason = %reason, "process failed");
            record.fail(Utc::now(), reason)?;
            JobStatus::Failed
        }
    };

    store.write(id, &record).map_err(|e| {
        tracing::error!(
            job_id = %id,
            error = %e,
            "Failed to write terminal record; job appears stuck at RUNNING"
        );
        e
    })?;

    Ok(status)
}

/// Best-effort extraction of a panic payload into diagnostic text.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use autofit_core::job::JobStatus;
    use autofit_store::StatusStore;

    use super::*;

    fn temp_store() -> (tempfile::TempDir, StatusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn successful_work_records_completed() {
        let (_dir, store) = temp_store();
        let id = JobId::new();

        let status = run_job(&store, id, || Ok(())).await.unwrap();
        assert_eq!(status, JobStatus::Completed);

        let record = store.read(id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.completed_at.unwrap() >= record.started_at);
        assert!(record.failure_reason.is_none());
    }

    #[tokio::test]
    async fn erroring_work_records_failed_with_full_chain() {
        let (_dir, store) = temp_store();
        let id = JobId::new();

        let status = run_job(&store, id, || {
            Err(anyhow::anyhow!("bad data").context("loading dataset"))
        })
        .await
        .unwrap();
        assert_eq!(status, JobStatus::Failed);

        let record = store.read(id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        let reason = record.failure_reason.unwrap();
        assert!(reason.contains("bad data"), "reason was: {reason}");
        assert!(reason.contains("loading dataset"), "reason was: {reason}");
        assert!(record.failed_at.unwrap() >= record.started_at);
        assert!(record.completed_at.is_none());
    }

    #[tokio::test]
    async fn panicking_work_records_failed() {
        let (_dir, store) = temp_store();
        let id = JobId::new();

        let status = run_job(&store, id, || panic!("index out of range"))
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Failed);

        let record = store.read(id).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        let reason = record.failure_reason.unwrap();
        assert!(reason.contains("index out of range"), "reason was: {reason}");
    }

    #[tokio::test]
    async fn started_at_is_preserved_across_the_terminal_write() {
        let (_dir, store) = temp_store();
        let id = JobId::new();

        run_job(&store, id, || Ok(())).await.unwrap();
        let first = store.read(id).unwrap().unwrap();

        // The record on disk is the one the executor created at start;
        // its started_at must predate (or equal) the terminal stamp.
        assert!(first.started_at <= first.completed_at.unwrap());
    }

    #[tokio::test]
    async fn work_runs_in_order_running_then_terminal() {
        let (_dir, store) = temp_store();
        let id = JobId::new();

        // The work function observes its own RUNNING record: proof that
        // the initial write happens before the work is invoked.
        let observer = store.clone();
        let status = run_job(&store, id, move || {
            let record = observer.read(id)?.expect("record must exist during work");
            anyhow::ensure!(record.status == JobStatus::Running);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(status, JobStatus::Completed);
    }
}
