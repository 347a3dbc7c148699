//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::net::SocketAddr;
use std::time::Duration;
use tower::util::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use txflow_server::config::DemoConfig;
use txflow_server::demo::DemoView;
use txflow_server::server::{AppState, app_router};

/// Seeded demo configuration with millisecond pacing
pub fn fast_demo_config() -> DemoConfig {
    DemoConfig {
        seed: Some(7),
        window_size: 20,
        single_pending_delay: Duration::from_millis(1),
        single_processing_delay: Duration::from_millis(1),
        phase_pause: Duration::from_millis(1),
        concurrent_count: 20,
        sub_batch_size: 10,
        sub_batch_delay: Duration::from_millis(1),
        target_tps: 1000,
        high_load_duration: Duration::from_millis(20),
        high_load_interval: Duration::from_millis(10),
        failure_probability: 0.0,
        csv_chunk_rows: 2,
        csv_chunk_delay: Duration::from_millis(1),
    }
}

/// Create a test application router with state
pub fn create_test_app_with_state() -> (Router, AppState) {
    let app_state = AppState::new(fast_demo_config());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app_router(app_state.clone()).layer(cors);

    (app, app_state)
}

/// Create a test application router with all routes configured
pub fn create_test_app() -> Router {
    create_test_app_with_state().0
}

/// Send a GET request through the router
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a POST request with a text body through the router
pub async fn post(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "text/plain")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Poll the driver until the current run finishes
pub async fn wait_for_idle(state: &AppState) -> DemoView {
    tokio::time::timeout(Duration::from_secs(5), state.driver.wait_until_idle())
        .await
        .expect("demo run should finish");
    state.driver.view().await
}

/// Start a test server on a random port
pub async fn start_test_server() -> (SocketAddr, AppState, tokio::task::JoinHandle<()>) {
    let (app, state) = create_test_app_with_state();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, state, handle)
}
