//! Server configuration
//!
//! Configuration is loaded from environment variables layered over defaults.
//! Unparseable values keep the default.

use crate::engine::HighLoadSchedule;
use crate::engine::window::DEFAULT_WINDOW_SIZE;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,

    /// Demo run configuration
    pub demo: DemoConfig,
}

/// Pacing and sizing of a demo run
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Seed for reproducible runs (OS entropy when unset)
    pub seed: Option<u64>,
    /// Number of recent records kept for display
    pub window_size: usize,

    /// Delay between pending and processing for the single transaction
    pub single_pending_delay: Duration,
    /// Delay between processing and completed for the single transaction
    pub single_processing_delay: Duration,
    /// Pause after the single-transaction phase
    pub phase_pause: Duration,

    /// Records emitted by the concurrent phase
    pub concurrent_count: usize,
    /// Records per concurrent sub-batch
    pub sub_batch_size: usize,
    /// Suspension between concurrent sub-batches
    pub sub_batch_delay: Duration,

    /// High-load target throughput
    pub target_tps: u64,
    /// High-load wall-clock duration
    pub high_load_duration: Duration,
    /// High-load sub-batch interval
    pub high_load_interval: Duration,
    /// Probability that a high-load record fails
    pub failure_probability: f64,

    /// Ingested rows per emitted chunk
    pub csv_chunk_rows: usize,
    /// Suspension between ingested chunks
    pub csv_chunk_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            demo: DemoConfig::default(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: None,
            window_size: DEFAULT_WINDOW_SIZE,
            single_pending_delay: Duration::from_millis(50),
            single_processing_delay: Duration::from_millis(100),
            phase_pause: Duration::from_millis(1000),
            concurrent_count: 100,
            sub_batch_size: 10,
            sub_batch_delay: Duration::from_millis(100),
            target_tps: 1000,
            high_load_duration: Duration::from_millis(3000),
            high_load_interval: Duration::from_millis(100),
            failure_probability: 0.02,
            csv_chunk_rows: 10,
            csv_chunk_delay: Duration::from_millis(100),
        }
    }
}

impl DemoConfig {
    pub fn high_load_schedule(&self) -> HighLoadSchedule {
        HighLoadSchedule::new(
            self.target_tps,
            self.high_load_duration,
            self.high_load_interval,
        )
    }
}

/// Largest accepted `DEMO_TARGET_TPS`
pub const MAX_TARGET_TPS: u64 = 1_000_000;

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|val| val.trim().parse().ok())
}

fn millis_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    parse_var::<u64>(lookup, key).map(Duration::from_millis)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // Server config
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT") {
            config.port = port;
        }

        // Demo config
        let demo = &mut config.demo;
        if let Some(seed) = parse_var(&lookup, "DEMO_SEED") {
            demo.seed = Some(seed);
        }
        if let Some(size) = parse_var(&lookup, "DEMO_WINDOW_SIZE") {
            demo.window_size = size;
        }
        if let Some(delay) = millis_var(&lookup, "DEMO_SINGLE_PENDING_MS") {
            demo.single_pending_delay = delay;
        }
        if let Some(delay) = millis_var(&lookup, "DEMO_SINGLE_PROCESSING_MS") {
            demo.single_processing_delay = delay;
        }
        if let Some(pause) = millis_var(&lookup, "DEMO_PHASE_PAUSE_MS") {
            demo.phase_pause = pause;
        }
        if let Some(count) = parse_var(&lookup, "DEMO_CONCURRENT_COUNT") {
            demo.concurrent_count = count;
        }
        if let Some(size) = parse_var::<usize>(&lookup, "DEMO_SUB_BATCH_SIZE")
            && size > 0
        {
            demo.sub_batch_size = size;
        }
        if let Some(delay) = millis_var(&lookup, "DEMO_SUB_BATCH_DELAY_MS") {
            demo.sub_batch_delay = delay;
        }
        if let Some(tps) = parse_var::<u64>(&lookup, "DEMO_TARGET_TPS")
            && tps <= MAX_TARGET_TPS
        {
            demo.target_tps = tps;
        }
        if let Some(duration) = millis_var(&lookup, "DEMO_HIGHLOAD_DURATION_MS") {
            demo.high_load_duration = duration;
        }
        if let Some(interval) = millis_var(&lookup, "DEMO_HIGHLOAD_INTERVAL_MS")
            && !interval.is_zero()
        {
            demo.high_load_interval = interval;
        }
        if let Some(p) = parse_var::<f64>(&lookup, "DEMO_FAILURE_PROBABILITY")
            && (0.0..=1.0).contains(&p)
        {
            demo.failure_probability = p;
        }
        if let Some(rows) = parse_var::<usize>(&lookup, "DEMO_CSV_CHUNK_ROWS")
            && rows > 0
        {
            demo.csv_chunk_rows = rows;
        }
        if let Some(delay) = millis_var(&lookup, "DEMO_CSV_CHUNK_DELAY_MS") {
            demo.csv_chunk_delay = delay;
        }

        config
    }
}
