//! HTTP route handlers for the demo API

use super::AppState;
use crate::demo::DemoView;
use crate::engine::csv::{SAMPLE_FILE_NAME, SAMPLE_ROWS, sample_csv};
use crate::protocol::CommandResponse;
use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

/// Process start time for uptime reporting
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the process start time (first call wins)
pub fn mark_started() {
    START_TIME.get_or_init(Instant::now);
}

fn uptime_seconds() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub demo_running: bool,
    pub connections: usize,
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        demo_running: state.driver.is_running().await,
        connections: state.connection_count().await,
        uptime_seconds: uptime_seconds(),
    })
}

/// GET /api/demo - Current phase, progress, metrics and recent records
pub async fn get_view(State(state): State<AppState>) -> Json<DemoView> {
    Json(state.driver.view().await)
}

/// POST /api/demo/start
pub async fn start_demo(State(state): State<AppState>) -> Json<CommandResponse> {
    let accepted = state.driver.start().await;
    respond(&state, accepted).await
}

/// POST /api/demo/reset
pub async fn reset_demo(State(state): State<AppState>) -> Json<CommandResponse> {
    let accepted = state.driver.reset().await;
    respond(&state, accepted).await
}

/// POST /api/demo/ingest - Body is the raw transaction file
pub async fn ingest_file(State(state): State<AppState>, body: String) -> Json<CommandResponse> {
    let accepted = state.driver.ingest(body).await;
    respond(&state, accepted).await
}

/// GET /api/demo/sample.csv - Downloadable sample transaction file
pub async fn download_sample(State(state): State<AppState>) -> impl IntoResponse {
    let mut rng = match state.driver.config().seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let body = sample_csv(&mut rng, SAMPLE_ROWS, Utc::now());
    tracing::debug!("Serving sample file ({} bytes)", body.len());

    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SAMPLE_FILE_NAME),
            ),
        ],
        body,
    )
}

async fn respond(state: &AppState, accepted: bool) -> Json<CommandResponse> {
    Json(CommandResponse {
        accepted,
        view: state.driver.view().await,
    })
}

/// Build demo API routes
pub fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_view))
        .route("/start", post(start_demo))
        .route("/reset", post(reset_demo))
        .route("/ingest", post(ingest_file))
        .route("/sample.csv", get(download_sample))
}
