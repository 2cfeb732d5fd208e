use axum::Json;
use serde::Serialize;

/// Ping response payload.
#[derive(Serialize)]
pub struct PingResponse {
    pub message: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /ping -- liveness check for the connector.
pub async fn ping() -> Json<PingResponse> {
    tracing::info!("ping");
    Json(PingResponse {
        message: "pinging successfully!",
        version: env!("CARGO_PKG_VERSION"),
    })
}
