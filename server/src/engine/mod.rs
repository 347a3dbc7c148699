//! Transaction stream simulation engine
//!
//! Synthetic record generation, file ingestion, fold-reduced metrics and the
//! bounded display window.

pub mod aggregator;
pub mod csv;
pub mod generator;
pub mod types;
pub mod window;

pub use aggregator::MetricsAggregator;
pub use generator::{HighLoadSchedule, StreamGenerator};
pub use types::{MetricsSnapshot, RecordError, TransactionRecord, TxnStatus};
pub use window::DisplayWindow;
