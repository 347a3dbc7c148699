//! Synthetic transaction stream generator
//!
//! Each load profile builds batches of records with a fixed shape and
//! randomized content. Pacing between batches is left to the caller.

use super::types::TransactionRecord;
use chrono::{DateTime, Utc};
use metrics::counter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::time::Duration;

/// Amount used by the single-transaction profile
pub const SINGLE_AMOUNT: f64 = 1000.0;

/// Latency of the single-transaction profile, in ms
pub const SINGLE_LATENCY_MS: Range<u64> = 30..50;
/// Latency of concurrent records, in ms
pub const CONCURRENT_LATENCY_MS: Range<u64> = 10..40;
/// Latency of high-load records, in ms
pub const HIGH_LOAD_LATENCY_MS: Range<u64> = 5..55;

/// Amount range of concurrent records
pub const CONCURRENT_AMOUNT: Range<u64> = 100..5100;
/// Amount range of high-load records
pub const HIGH_LOAD_AMOUNT: Range<u64> = 100..10100;

/// Sub-batch cadence of the high-load profile.
///
/// Every `interval` the profile emits `floor(target_tps * interval / 1000)`
/// records, for `duration / interval` iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighLoadSchedule {
    pub target_tps: u64,
    pub duration: Duration,
    pub interval: Duration,
}

impl HighLoadSchedule {
    pub fn new(target_tps: u64, duration: Duration, interval: Duration) -> Self {
        Self {
            target_tps,
            duration,
            interval,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    /// Records emitted per interval
    pub fn sub_batch_size(&self) -> usize {
        (self.target_tps.saturating_mul(self.interval_ms()) / 1000) as usize
    }

    /// Number of sub-batches over the whole duration
    pub fn iterations(&self) -> usize {
        match self.interval_ms() {
            0 => 0,
            interval => (self.duration.as_millis() as u64 / interval) as usize,
        }
    }

    /// Throughput represented by one sub-batch
    pub fn rate(&self) -> u64 {
        match self.interval_ms() {
            0 => 0,
            interval => (self.sub_batch_size() as u64).saturating_mul(1000) / interval,
        }
    }
}

/// Split `0..count` into ascending sub-batch ranges of at most `sub_batch_size`
pub fn sub_batches(count: usize, sub_batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = sub_batch_size.max(1);
    (0..count)
        .step_by(step)
        .map(move |start| start..(start + step).min(count))
}

/// Generator of synthetic transaction records
#[derive(Debug)]
pub struct StreamGenerator<R = StdRng> {
    rng: R,
    seq: u64,
}

impl StreamGenerator<StdRng> {
    /// Generator seeded from `seed`, or from OS entropy when `None`
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(rng)
    }
}

impl<R: Rng> StreamGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, seq: 0 }
    }

    /// Access the underlying RNG (used by file ingestion fallbacks)
    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Draw a latency uniformly from `range`
    pub fn latency(&mut self, range: Range<u64>) -> u64 {
        self.rng.random_range(range)
    }

    /// Single profile: one pending record, advanced by the caller
    pub fn single(&mut self, now: DateTime<Utc>) -> TransactionRecord {
        counter!("txflow_records_generated_total", "profile" => "single").increment(1);
        TransactionRecord::pending(
            format!("TXN{}", now.timestamp_millis()),
            SINGLE_AMOUNT,
            now,
        )
    }

    /// Concurrent profile: completed records for the input indices `range`
    pub fn concurrent_batch(
        &mut self,
        range: Range<usize>,
        now: DateTime<Utc>,
    ) -> Vec<TransactionRecord> {
        let millis = now.timestamp_millis();
        let batch: Vec<_> = range
            .map(|i| {
                let amount = self.rng.random_range(CONCURRENT_AMOUNT) as f64;
                let latency = self.rng.random_range(CONCURRENT_LATENCY_MS);
                TransactionRecord::finished(format!("TXN{millis}-{i}"), amount, now, true, latency)
            })
            .collect();
        counter!("txflow_records_generated_total", "profile" => "concurrent")
            .increment(batch.len() as u64);
        batch
    }

    /// High-load profile: `size` records, each failing with `failure_probability`
    pub fn high_load_batch(
        &mut self,
        size: usize,
        failure_probability: f64,
        now: DateTime<Utc>,
    ) -> Vec<TransactionRecord> {
        let millis = now.timestamp_millis();
        let p_fail = if failure_probability.is_finite() {
            failure_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let batch: Vec<_> = (0..size)
            .map(|_| {
                self.seq += 1;
                let amount = self.rng.random_range(HIGH_LOAD_AMOUNT) as f64;
                let succeeded = !self.rng.random_bool(p_fail);
                let latency = self.rng.random_range(HIGH_LOAD_LATENCY_MS);
                TransactionRecord::finished(
                    format!("TXN-HL-{millis}-{}", self.seq),
                    amount,
                    now,
                    succeeded,
                    latency,
                )
            })
            .collect();
        counter!("txflow_records_generated_total", "profile" => "highload")
            .increment(batch.len() as u64);
        batch
    }
}
