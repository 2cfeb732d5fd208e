//! Handlers for model-training submission and status polling.
//!
//! Submission validates the request, fires the job, and returns the
//! process id without waiting. Status queries always answer 200 with a
//! payload reflecting RUNNING/COMPLETED/FAILED/not-found -- the query
//! path never fails because of the job's own outcome.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use autofit_core::job::JobId;
use autofit_core::status_payload::StatusPayload;
use autofit_core::training::{self, TrainRequest};

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// Response body for a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    #[serde(rename = "processId")]
    pub process_id: JobId,
}

/// POST /api/v1/trainModel
///
/// Validate the training request, launch it as an isolated job, and
/// return the process id immediately. The job's outcome is only
/// observable through `getStatus`.
pub async fn train_model(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> AppResult<impl IntoResponse> {
    training::validate_request(&request)?;

    let id = state.manager.submit(&request).await?;

    tracing::info!(
        job_id = %id,
        model_type = ?request.data.model_type,
        data_type = ?request.data.data_type,
        "Training request submitted",
    );

    Ok(Json(SubmitResponse {
        message: "Request submitted",
        process_id: id,
    }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Query parameters for `getStatus`.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "processId")]
    pub process_id: String,
}

/// GET /api/v1/getStatus?processId=...
///
/// Always 200 with a status payload. Ids that do not parse as job ids
/// get the same not-found answer as well-formed unknown ones; only a
/// store read fault is an error.
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<StatusPayload>> {
    let payload = match query.process_id.parse::<JobId>() {
        Ok(id) => state.manager.query_status(id)?,
        Err(_) => StatusPayload::not_found(&query.process_id),
    };

    tracing::debug!(process_id = %query.process_id, "Status query answered");
    Ok(Json(payload))
}
