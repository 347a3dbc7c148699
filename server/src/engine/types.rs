//! Transaction record and metrics snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by record lifecycle transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Transaction {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TxnStatus,
        to: TxnStatus,
    },
}

/// Status tag of a synthetic transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TxnStatus {
    /// Completed and failed records carry a latency
    pub fn is_terminal(self) -> bool {
        matches!(self, TxnStatus::Completed | TxnStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxnStatus::Pending => "pending",
            TxnStatus::Processing => "processing",
            TxnStatus::Completed => "completed",
            TxnStatus::Failed => "failed",
        }
    }

    /// Case-insensitive parse of a status column value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TxnStatus::Pending),
            "processing" => Some(TxnStatus::Processing),
            "completed" => Some(TxnStatus::Completed),
            "failed" => Some(TxnStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single synthetic transaction.
///
/// Fields are private so that `latency_ms` is present exactly when the
/// status is terminal. Latency is attached by `complete`/`fail` or by the
/// terminal constructors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    id: String,
    amount: f64,
    status: TxnStatus,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

impl TransactionRecord {
    /// New record that has not started processing
    pub fn pending(id: impl Into<String>, amount: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            amount,
            status: TxnStatus::Pending,
            created_at,
            latency_ms: None,
        }
    }

    /// Record created directly in a terminal status
    pub fn finished(
        id: impl Into<String>,
        amount: f64,
        created_at: DateTime<Utc>,
        succeeded: bool,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            status: if succeeded {
                TxnStatus::Completed
            } else {
                TxnStatus::Failed
            },
            created_at,
            latency_ms: Some(latency_ms),
        }
    }

    /// Build a record with an arbitrary status. Latency is kept only for
    /// terminal statuses.
    pub fn with_status(
        id: impl Into<String>,
        amount: f64,
        created_at: DateTime<Utc>,
        status: TxnStatus,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            status,
            created_at,
            latency_ms: status.is_terminal().then_some(latency_ms),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn status(&self) -> TxnStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn is_completed(&self) -> bool {
        self.status == TxnStatus::Completed
    }

    /// pending -> processing
    pub fn begin_processing(&mut self) -> Result<(), RecordError> {
        self.transition(TxnStatus::Processing, None)
    }

    /// processing -> completed
    pub fn complete(&mut self, latency_ms: u64) -> Result<(), RecordError> {
        self.transition(TxnStatus::Completed, Some(latency_ms))
    }

    /// processing -> failed
    pub fn fail(&mut self, latency_ms: u64) -> Result<(), RecordError> {
        self.transition(TxnStatus::Failed, Some(latency_ms))
    }

    fn transition(&mut self, to: TxnStatus, latency_ms: Option<u64>) -> Result<(), RecordError> {
        let allowed = matches!(
            (self.status, to),
            (TxnStatus::Pending, TxnStatus::Processing)
                | (TxnStatus::Processing, TxnStatus::Completed)
                | (TxnStatus::Processing, TxnStatus::Failed)
        );
        if !allowed {
            return Err(RecordError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.latency_ms = latency_ms;
        Ok(())
    }
}

/// Cumulative metrics exposed to the presentation layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_count: u64,
    /// Percentage (0-100) of all-time records that completed
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    /// Whole transactions per second of the last high-load sub-batch
    pub current_tps: u64,
    pub peak_tps: u64,
}

impl MetricsSnapshot {
    /// All-zero counters with a 100% success baseline
    pub const BASELINE: MetricsSnapshot = MetricsSnapshot {
        total_count: 0,
        success_rate: 100.0,
        avg_latency_ms: 0,
        p50_latency_ms: 0,
        p95_latency_ms: 0,
        p99_latency_ms: 0,
        current_tps: 0,
        peak_tps: 0,
    };

    /// One-line run summary, used when a demo completes
    pub fn summary(&self) -> String {
        format!(
            "processed {} transactions with {:.1}% success rate, peak TPS {}, P99 latency {}ms",
            self.total_count, self.success_rate, self.peak_tps, self.p99_latency_ms
        )
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::BASELINE
    }
}
