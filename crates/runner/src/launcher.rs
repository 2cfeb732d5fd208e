//! Pluggable isolation backends for job execution.
//!
//! [`JobLauncher`] is the seam between the dispatcher and the mechanism
//! that isolates a job from the request-serving process. The production
//! backend is [`ProcessLauncher`], which spawns one detached worker
//! process per job; [`TaskLauncher`] runs the executor on an in-process
//! tokio task and exists for tests and embedders that accept weaker
//! isolation.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use autofit_core::job::JobId;
use autofit_core::training::TrainRequest;
use autofit_store::{StatusStore, DATA_DIR_ENV};

use crate::executor;

/// Errors starting an isolated execution context.
///
/// These happen before any job record exists, so they surface to the
/// submitting caller; faults *inside* a launched job never appear here.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to serialize job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Failed to write job payload to worker stdin: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Starts isolated, fire-and-forget execution of a training job.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    /// Begin executing `request` as job `id`. Returns as soon as the
    /// execution context is started; never waits for the job itself.
    async fn launch(&self, id: JobId, request: &TrainRequest) -> Result<(), LaunchError>;
}

// ---------------------------------------------------------------------------
// ProcessLauncher
// ---------------------------------------------------------------------------

/// One OS process per job.
///
/// Spawns the `autofit-runner` binary with the job id as its argument
/// and the request JSON piped to stdin. The child is deliberately NOT
/// killed on drop: it must outlive the request that spawned it, and a
/// crash or OOM inside it cannot affect this process.
pub struct ProcessLauncher {
    worker_bin: PathBuf,
    data_dir: PathBuf,
}

impl ProcessLauncher {
    pub fn new(worker_bin: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            worker_bin: worker_bin.into(),
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl JobLauncher for ProcessLauncher {
    async fn launch(&self, id: JobId, request: &TrainRequest) -> Result<(), LaunchError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.worker_bin)
            .arg(id.to_string())
            .env(DATA_DIR_ENV, &self.data_dir)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(LaunchError::Spawn)?;

        // Hand the request over and close the pipe; the worker reads
        // stdin to EOF before it starts.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(LaunchError::Stdin)?;
        }

        tracing::info!(
            job_id = %id,
            worker_bin = %self.worker_bin.display(),
            pid = child.id(),
            "Worker process spawned",
        );

        // Dropping the handle detaches the child; the runtime reaps it
        // whenever it exits.
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TaskLauncher
// ---------------------------------------------------------------------------

/// Work-function factory used by [`TaskLauncher`]: builds the unit of
/// work for a given job from the submitted request.
pub type WorkFactory =
    dyn Fn(JobId, TrainRequest) -> Box<dyn FnOnce() -> anyhow::Result<()> + Send> + Send + Sync;

/// In-process backend: runs the executor on a spawned tokio task.
///
/// Panics and errors are still contained by the executor, but resource
/// exhaustion is not -- use [`ProcessLauncher`] wherever that matters.
pub struct TaskLauncher {
    store: StatusStore,
    factory: Arc<WorkFactory>,
}

impl TaskLauncher {
    pub fn new<F>(store: StatusStore, factory: F) -> Self
    where
        F: Fn(JobId, TrainRequest) -> Box<dyn FnOnce() -> anyhow::Result<()> + Send>
            + Send
            + Sync
            + 'static,
    {
        Self {
            store,
            factory: Arc::new(factory),
        }
    }
}

#[async_trait]
impl JobLauncher for TaskLauncher {
    async fn launch(&self, id: JobId, request: &TrainRequest) -> Result<(), LaunchError> {
        let work = (self.factory)(id, request.clone());
        let store = self.store.clone();

        tokio::spawn(async move {
            if let Err(e) = executor::run_job(&store, id, work).await {
                tracing::error!(job_id = %id, error = %e, "In-process job execution failed");
            }
        });

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
