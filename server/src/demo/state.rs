use crate::config::DemoConfig;
use crate::engine::{DisplayWindow, MetricsAggregator, MetricsSnapshot, TransactionRecord};
use serde::{Deserialize, Serialize};

/// Stage of the demo sequence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Single,
    Concurrent,
    HighLoad,
    Csv,
    Complete,
}

impl Phase {
    /// Slice of the 0-100 progress range reserved for this phase
    pub fn progress_slice(self) -> (f64, f64) {
        match self {
            Phase::Idle => (0.0, 0.0),
            Phase::Single => (0.0, 20.0),
            Phase::Concurrent => (20.0, 50.0),
            Phase::HighLoad => (50.0, 100.0),
            Phase::Csv => (0.0, 100.0),
            Phase::Complete => (100.0, 100.0),
        }
    }

    /// Overall progress after completing `fraction` of this phase
    pub fn progress_at(self, fraction: f64) -> f64 {
        let (start, end) = self.progress_slice();
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        start + fraction * (end - start)
    }

    /// Human readable status line
    pub fn message(self, config: &DemoConfig) -> String {
        match self {
            Phase::Idle => "Ready to start demo".to_string(),
            Phase::Single => "Processing single transaction...".to_string(),
            Phase::Concurrent => format!(
                "Running concurrent transactions ({} TPS)...",
                config.concurrent_count
            ),
            Phase::HighLoad => format!("High load test ({} TPS target)...", config.target_tps),
            Phase::Csv => "Processing CSV file transactions...".to_string(),
            Phase::Complete => "Demo completed successfully!".to_string(),
        }
    }
}

/// Everything the presentation layer reads after a step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoView {
    pub phase: Phase,
    pub message: String,
    /// Overall progress, 0-100
    pub progress: f64,
    pub running: bool,
    pub metrics: MetricsSnapshot,
    /// Most recent records, newest first
    pub recent: Vec<TransactionRecord>,
}

/// Mutable demo state owned by the driver
#[derive(Debug, Clone)]
pub struct DemoState {
    pub phase: Phase,
    pub progress: f64,
    pub running: bool,
    pub aggregator: MetricsAggregator,
    pub window: DisplayWindow,
}

impl DemoState {
    pub fn new(window_size: usize) -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0.0,
            running: false,
            aggregator: MetricsAggregator::new(),
            window: DisplayWindow::new(window_size),
        }
    }

    /// Move progress forward; never backwards
    pub fn advance_progress(&mut self, progress: f64) {
        self.progress = self.progress.max(progress.clamp(0.0, 100.0));
    }

    /// Baseline metrics, empty window, idle
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.progress = 0.0;
        self.running = false;
        self.aggregator.reset();
        self.window.clear();
    }

    pub fn view(&self, config: &DemoConfig) -> DemoView {
        DemoView {
            phase: self.phase,
            message: self.phase.message(config),
            progress: self.progress,
            running: self.running,
            metrics: *self.aggregator.snapshot(),
            recent: self.window.to_vec(),
        }
    }
}
