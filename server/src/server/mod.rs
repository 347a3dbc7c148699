//! HTTP and WebSocket host for the demo driver

pub mod routes;
pub mod websocket;

use crate::config::DemoConfig;
use crate::demo::DemoDriver;
use axum::{Router, routing::get};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use routes::demo_routes;
pub use websocket::ws_handler;

/// Connection state for a single WebSocket client
pub struct Connection {
    pub id: Uuid,
    pub connected_at: Instant,
}

/// Global connection registry
pub type ConnectionRegistry = Arc<RwLock<HashMap<Uuid, Connection>>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<DemoDriver>,
    pub connections: ConnectionRegistry,
}

impl AppState {
    pub fn new(config: DemoConfig) -> Self {
        Self::with_driver(Arc::new(DemoDriver::new(config)))
    }

    pub fn with_driver(driver: Arc<DemoDriver>) -> Self {
        Self {
            driver,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Router with health, demo API and WebSocket routes
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/ws", get(ws_handler))
        .nest("/api/demo", demo_routes())
        .with_state(state)
}
