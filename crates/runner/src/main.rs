//! The worker binary: one process per training job.
//!
//! Invoked by the API server's process launcher with the job id as the
//! sole argument and the `TrainRequest` JSON on stdin. Everything that
//! happens to the job after this point -- including panics and fatal
//! errors in the training code -- is reflected in the job's status
//! record, never in this process's exit code. A nonzero exit here means
//! the executor itself could not do its work (unusable store, malformed
//! stdin payload).

use std::process::ExitCode;

use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autofit_core::job::JobId;
use autofit_core::training::TrainRequest;
use autofit_runner::{executor, trainer};
use autofit_store::StatusStore;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autofit_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let id = match parse_job_id() {
        Ok(id) => id,
        Err(message) => {
            tracing::error!(error = %message, "Invalid worker invocation");
            return ExitCode::FAILURE;
        }
    };

    let request = match read_request().await {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to read training request from stdin");
            return ExitCode::FAILURE;
        }
    };

    let store = StatusStore::from_env();
    let job_dir = store.job_dir(id);

    let work = move || trainer::train_job(&job_dir, &request);
    match executor::run_job(&store, id, work).await {
        // FAILED is recorded job state, not a process error.
        Ok(status) => {
            tracing::info!(job_id = %id, status = %status, "Worker finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Executor fault");
            ExitCode::FAILURE
        }
    }
}

/// The job id is the single required positional argument.
fn parse_job_id() -> Result<JobId, String> {
    let arg = std::env::args()
        .nth(1)
        .ok_or_else(|| "usage: autofit-runner <job-id>".to_string())?;
    arg.parse()
        .map_err(|e| format!("'{arg}' is not a valid job id: {e}"))
}

/// Read the request payload piped to stdin by the launcher.
async fn read_request() -> anyhow::Result<TrainRequest> {
    let mut raw = Vec::new();
    tokio::io::stdin().read_to_end(&mut raw).await?;
    let request = serde_json::from_slice(&raw)?;
    Ok(request)
}
