//! Route definitions for the training connector endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::train;
use crate::state::AppState;

/// Routes mounted under `/api/v1`.
///
/// ```text
/// POST   /trainModel      -> train_model
/// GET    /getStatus       -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trainModel", post(train::train_model))
        .route("/getStatus", get(train::get_status))
}
