use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use autofit_api::config::ServerConfig;
use autofit_api::routes;
use autofit_api::state::AppState;
use autofit_core::job::JobId;
use autofit_runner::launcher::TaskLauncher;
use autofit_runner::manager::JobManager;
use autofit_store::StatusStore;

/// Build a test `ServerConfig` with safe defaults.
#[allow(dead_code)]
pub fn test_config(store: &StatusStore) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        data_dir: store.root().to_path_buf(),
        runner_bin: "autofit-runner".into(),
    }
}

/// Build the full application router with all middleware layers, backed
/// by a tempdir store and an in-process task launcher.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses -- only the isolation
/// backend is swapped: the launcher runs jobs on tokio tasks, with the
/// work chosen by the dataset URL:
///
/// - a URL containing `fail` errors with "ValueError: bad data";
/// - a URL containing `slow` sleeps two seconds, then succeeds;
/// - anything else succeeds immediately.
pub fn build_test_app(store: StatusStore) -> Router {
    let config = test_config(&store);

    let launcher = Arc::new(TaskLauncher::new(store.clone(), |_id, request| {
        let url = request.data.training_data.clone();
        Box::new(move || {
            if url.contains("fail") {
                anyhow::bail!("ValueError: bad data");
            }
            if url.contains("slow") {
                std::thread::sleep(Duration::from_secs(2));
            }
            Ok(())
        })
    }));
    let manager = Arc::new(JobManager::new(store, launcher));

    let state = AppState {
        config: Arc::new(config),
        manager,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Tempdir-backed store + app pair. Keep the tempdir alive for the
/// duration of the test.
pub fn test_app() -> (tempfile::TempDir, StatusStore, Router) {
    let dir = tempfile::tempdir().unwrap();
    let store = StatusStore::new(dir.path());
    let app = build_test_app(store.clone());
    (dir, store, app)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body against the app.
#[allow(dead_code)]
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the store until the job reaches a terminal state.
#[allow(dead_code)]
pub async fn wait_for_terminal(store: &StatusStore, id: JobId) {
    for _ in 0..250 {
        if let Some(record) = store.read(id).unwrap() {
            if record.status.is_terminal() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {id} never reached a terminal state");
}
