//! TxFlow Server Library
//!
//! Transaction stream simulation, metrics aggregation and the demo driver,
//! exported for the binary, integration tests and benches.

pub mod config;
pub mod demo;
pub mod engine;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use demo::{DemoDriver, DemoView, Phase};
pub use engine::{MetricsAggregator, MetricsSnapshot, TransactionRecord, TxnStatus};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{AppState, app_router};
