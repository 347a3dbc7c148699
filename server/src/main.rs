use axum::{response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use txflow_server::config::Config;
use txflow_server::server::{AppState, app_router, routes::mark_started};

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Endpoint to expose metrics in Prometheus format
async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Mirror the latest demo snapshot into gauges (called periodically)
async fn update_gauge_metrics(state: &AppState) {
    let view = state.driver.view().await;
    let metrics = view.metrics;

    metrics::gauge!("txflow_demo_running").set(if view.running { 1.0 } else { 0.0 });
    metrics::gauge!("txflow_demo_progress").set(view.progress);
    metrics::gauge!("txflow_success_rate").set(metrics.success_rate);
    metrics::gauge!("txflow_latency_p95_ms").set(metrics.p95_latency_ms as f64);
    metrics::gauge!("txflow_ws_connections_active").set(state.connection_count().await as f64);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mark_started();

    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics();
    PROMETHEUS_HANDLE.set(prometheus_handle).ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "txflow=debug,txflow_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );
    info!(
        "Demo: seed={:?}, target_tps={}, high_load={:?}, window={}",
        config.demo.seed,
        config.demo.target_tps,
        config.demo.high_load_duration,
        config.demo.window_size
    );

    let app_state = AppState::new(config.demo.clone());

    // Periodic update of gauge metrics (every 5 seconds)
    let metrics_state = app_state.clone();
    let gauge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            update_gauge_metrics(&metrics_state).await;
        }
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app_router(app_state.clone())
        .route("/metrics/prometheus", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("TxFlow server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    gauge_task.abort();
    app_state.driver.shutdown().await;
    info!("TxFlow server stopped");

    Ok(())
}
