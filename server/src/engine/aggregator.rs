//! Fold-reduced metrics over batches of transaction records
//!
//! The aggregator keeps no record history. Latency statistics describe the
//! most recently folded batch, while count and success rate are cumulative.

use super::types::{MetricsSnapshot, TransactionRecord};
use metrics::{gauge, histogram};
use std::time::Instant;
use tracing::debug;

const P50: f64 = 0.50;
const P95: f64 = 0.95;
const P99: f64 = 0.99;

/// Running metrics state
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    snapshot: MetricsSnapshot,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }

    /// Restore the baseline snapshot
    pub fn reset(&mut self) {
        self.snapshot = MetricsSnapshot::BASELINE;
    }

    /// Fold one batch into the running snapshot.
    ///
    /// The prior success count is reconstructed from `success_rate` and
    /// `total_count` instead of being stored, so the rate drifts by floating
    /// point rounding over many batches.
    pub fn fold(&mut self, batch: &[TransactionRecord]) {
        if batch.is_empty() {
            return;
        }
        let start = Instant::now();

        let mut latencies: Vec<u64> = batch
            .iter()
            .filter(|r| r.is_completed())
            .filter_map(|r| r.latency_ms())
            .collect();
        latencies.sort_unstable();
        let completed = batch.iter().filter(|r| r.is_completed()).count();

        let prev = self.snapshot;
        let total_count = prev.total_count + batch.len() as u64;
        let success_count = prev.total_count as f64 * (prev.success_rate / 100.0) + completed as f64;

        self.snapshot.total_count = total_count;
        self.snapshot.success_rate = success_count / total_count as f64 * 100.0;

        if !latencies.is_empty() {
            self.snapshot.p50_latency_ms = percentile(&latencies, P50);
            self.snapshot.p95_latency_ms = percentile(&latencies, P95);
            self.snapshot.p99_latency_ms = percentile(&latencies, P99);
            let sum: u64 = latencies.iter().sum();
            self.snapshot.avg_latency_ms = (sum as f64 / latencies.len() as f64).round() as u64;
        }

        debug!(
            "Folded batch of {} ({} completed): total={}, success_rate={:.2}",
            batch.len(),
            completed,
            self.snapshot.total_count,
            self.snapshot.success_rate
        );
        histogram!("txflow_fold_duration_seconds").record(start.elapsed());
    }

    /// Record the pacing rate of a high-load sub-batch.
    ///
    /// The rate is whole transactions per second, rounded down when the
    /// interval does not divide a second.
    pub fn record_throughput(&mut self, sub_batch_size: usize, interval_ms: u64) {
        if interval_ms == 0 {
            return;
        }
        let current = (sub_batch_size as u64).saturating_mul(1000) / interval_ms;
        self.snapshot.current_tps = current;
        self.snapshot.peak_tps = self.snapshot.peak_tps.max(current);

        gauge!("txflow_current_tps").set(self.snapshot.current_tps as f64);
        gauge!("txflow_peak_tps").set(self.snapshot.peak_tps as f64);
    }
}

/// Element at `floor(len * q)` of an ascending, non-empty slice
fn percentile(sorted: &[u64], q: f64) -> u64 {
    let idx = (sorted.len() as f64 * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
