pub mod health;
pub mod train;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /trainModel        POST   submit a training job
/// /getStatus         GET    poll job status by processId
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(train::router())
}
