//! Demo driver: sequences load profiles and publishes state after each step
//!
//! The driver owns the demo state machine. A run executes as a single tokio
//! task that suspends between sub-batches; aborting the task drops any
//! pending timer.

use crate::config::DemoConfig;
use crate::demo::state::{DemoState, DemoView, Phase};
use crate::engine::csv::parse_transactions;
use crate::engine::generator::{SINGLE_LATENCY_MS, StreamGenerator, sub_batches};
use crate::engine::TransactionRecord;
use chrono::Utc;
use metrics::counter;
use std::slice;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Upper bound on records reserved up front for one phase
const MAX_PREALLOCATED: usize = 1 << 16;

/// Handle to the demo state machine
pub struct DemoDriver {
    inner: Arc<DriverInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct DriverInner {
    config: DemoConfig,
    state: RwLock<DemoState>,
    updates: watch::Sender<DemoView>,
}

impl DemoDriver {
    pub fn new(config: DemoConfig) -> Self {
        let state = DemoState::new(config.window_size);
        let (updates, _) = watch::channel(state.view(&config));
        Self {
            inner: Arc::new(DriverInner {
                config,
                state: RwLock::new(state),
                updates,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.inner.config
    }

    /// Current state, read directly
    pub async fn view(&self) -> DemoView {
        let state = self.inner.state.read().await;
        state.view(&self.inner.config)
    }

    /// Receiver that always holds the latest published view
    pub fn subscribe(&self) -> watch::Receiver<DemoView> {
        self.inner.updates.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.read().await.running
    }

    /// Start the scripted sequence: single, concurrent, high-load.
    ///
    /// Returns false without touching state when a run is in progress.
    pub async fn start(&self) -> bool {
        let launched = self
            .launch(Phase::Single, |inner| async move { inner.run_scripted().await })
            .await;
        if !launched {
            debug!("Start ignored: demo already running");
            return false;
        }
        info!("Started demo run");
        counter!("txflow_demo_runs_total", "kind" => "scripted").increment(1);
        true
    }

    /// Replay an uploaded transaction file.
    ///
    /// Empty contents (no file selected) and calls during a run are no-ops.
    pub async fn ingest(&self, contents: String) -> bool {
        if contents.trim().is_empty() {
            debug!("Ingest ignored: no file contents");
            return false;
        }
        let bytes = contents.len();
        let launched = self
            .launch(Phase::Csv, move |inner| async move {
                inner.run_file(contents).await
            })
            .await;
        if !launched {
            debug!("Ingest ignored: demo already running");
            return false;
        }
        info!("Ingesting transaction file ({} bytes)", bytes);
        counter!("txflow_demo_runs_total", "kind" => "csv").increment(1);
        true
    }

    /// Restore baseline metrics and go idle. No-op while running.
    pub async fn reset(&self) -> bool {
        let view = {
            let mut state = self.inner.state.write().await;
            if state.running {
                debug!("Reset ignored: demo running");
                return false;
            }
            state.reset();
            state.view(&self.inner.config)
        };
        self.inner.updates.send_replace(view);
        info!("Demo reset");
        true
    }

    /// Abandon any run in progress
    pub async fn shutdown(&self) {
        // Held until running is cleared so no launch interleaves
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.inner
            .update(|state| {
                if state.running {
                    warn!("Demo run abandoned in phase {:?}", state.phase);
                }
                state.running = false;
            })
            .await;
    }

    /// Resolve once no run is in progress
    pub async fn wait_until_idle(&self) {
        let mut updates = self.subscribe();
        let _ = updates.wait_for(|view| !view.running).await;
    }

    /// Mark the state as running in `phase`. False if already running.
    async fn begin(&self, phase: Phase) -> bool {
        let view = {
            let mut state = self.inner.state.write().await;
            if state.running {
                return false;
            }
            state.running = true;
            state.phase = phase;
            state.progress = 0.0;
            state.window.clear();
            state.view(&self.inner.config)
        };
        self.inner.updates.send_replace(view);
        true
    }

    /// Begin `phase` and spawn its run while holding the task slot, so the
    /// running flag and the stored handle always change together.
    async fn launch<F, Fut>(&self, phase: Phase, run: F) -> bool
    where
        F: FnOnce(Arc<DriverInner>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.task.lock().await;
        if !self.begin(phase).await {
            return false;
        }
        let handle = tokio::spawn(run(Arc::clone(&self.inner)));
        if let Some(previous) = task.replace(handle) {
            // Already finished: begin() saw running == false
            previous.abort();
        }
        true
    }
}

impl Drop for DemoDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl DriverInner {
    /// Apply `f` to the state and publish the resulting view
    async fn update(&self, f: impl FnOnce(&mut DemoState)) {
        let view = {
            let mut state = self.state.write().await;
            f(&mut state);
            state.view(&self.config)
        };
        self.updates.send_replace(view);
    }

    async fn enter(&self, phase: Phase) {
        debug!("Entering phase {:?}", phase);
        self.update(|state| {
            state.phase = phase;
            state.advance_progress(phase.progress_at(0.0));
        })
        .await;
    }

    async fn run_scripted(&self) {
        let mut generator = StreamGenerator::from_seed(self.config.seed);
        self.run_single(&mut generator).await;
        self.run_concurrent(&mut generator).await;
        self.run_high_load(&mut generator).await;
        self.finish().await;
    }

    async fn run_file(&self, contents: String) {
        let mut generator = StreamGenerator::from_seed(self.config.seed);
        let (records, fallbacks) = parse_transactions(&contents, &mut generator, Utc::now());
        if fallbacks.total() > 0 {
            warn!(
                "Substituted fallbacks: {} ids, {} amounts, {} statuses, {} timestamps",
                fallbacks.id, fallbacks.amount, fallbacks.status, fallbacks.timestamp
            );
        }

        let total = records.len();
        let chunk_rows = self.config.csv_chunk_rows.max(1);
        let mut done = 0;
        for chunk in records.chunks(chunk_rows) {
            done += chunk.len();
            let progress = Phase::Csv.progress_at(done as f64 / total as f64);
            self.update(|state| {
                state.window.push_batch(chunk);
                state.advance_progress(progress);
            })
            .await;
            if done < total {
                sleep(self.config.csv_chunk_delay).await;
            }
        }

        self.update(|state| {
            state.aggregator.fold(&records);
            state.advance_progress(Phase::Csv.progress_at(1.0));
        })
        .await;
        self.finish().await;
    }

    /// One record walked through pending, processing and completed
    async fn run_single(&self, generator: &mut StreamGenerator) {
        self.enter(Phase::Single).await;

        let mut record = generator.single(Utc::now());
        self.update(|state| state.window.push_batch(slice::from_ref(&record)))
            .await;
        sleep(self.config.single_pending_delay).await;

        if let Err(e) = record.begin_processing() {
            warn!("{}", e);
        }
        self.update(|state| state.window.replace_front(record.clone()))
            .await;
        sleep(self.config.single_processing_delay).await;

        if let Err(e) = record.complete(generator.latency(SINGLE_LATENCY_MS)) {
            warn!("{}", e);
        }
        self.update(|state| {
            state.window.replace_front(record.clone());
            state.aggregator.fold(slice::from_ref(&record));
        })
        .await;

        sleep(self.config.phase_pause).await;
        self.update(|state| state.advance_progress(Phase::Single.progress_at(1.0)))
            .await;
    }

    async fn run_concurrent(&self, generator: &mut StreamGenerator) {
        self.enter(Phase::Concurrent).await;

        let count = self.config.concurrent_count;
        let mut records: Vec<TransactionRecord> = Vec::with_capacity(count);
        for range in sub_batches(count, self.config.sub_batch_size) {
            let progress = Phase::Concurrent.progress_at(range.start as f64 / count as f64);
            let batch = generator.concurrent_batch(range, Utc::now());
            self.update(|state| {
                state.window.push_batch(&batch);
                state.advance_progress(progress);
            })
            .await;
            records.extend(batch);
            sleep(self.config.sub_batch_delay).await;
        }

        self.update(|state| {
            state.aggregator.fold(&records);
            state.advance_progress(Phase::Concurrent.progress_at(1.0));
        })
        .await;
    }

    async fn run_high_load(&self, generator: &mut StreamGenerator) {
        self.enter(Phase::HighLoad).await;

        let schedule = self.config.high_load_schedule();
        let iterations = schedule.iterations();
        let size = schedule.sub_batch_size();
        debug!(
            "High load: {} sub-batches of {} every {:?}",
            iterations, size, schedule.interval
        );

        let mut records: Vec<TransactionRecord> =
            Vec::with_capacity(iterations.saturating_mul(size).min(MAX_PREALLOCATED));
        for i in 0..iterations {
            let batch =
                generator.high_load_batch(size, self.config.failure_probability, Utc::now());
            let progress = Phase::HighLoad.progress_at(i as f64 / iterations as f64);
            self.update(|state| {
                state.window.push_batch(&batch);
                state.advance_progress(progress);
                state
                    .aggregator
                    .record_throughput(batch.len(), schedule.interval_ms());
            })
            .await;
            records.extend(batch);
            sleep(schedule.interval).await;
        }

        self.update(|state| {
            state.aggregator.fold(&records);
            state.advance_progress(Phase::HighLoad.progress_at(1.0));
        })
        .await;
    }

    async fn finish(&self) {
        let mut summary = String::new();
        self.update(|state| {
            state.phase = Phase::Complete;
            state.progress = 100.0;
            state.running = false;
            summary = state.aggregator.snapshot().summary();
        })
        .await;
        info!("Demo completed: {}", summary);
    }
}
