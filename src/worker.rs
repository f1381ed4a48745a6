// Sampling worker: one interval drives sampler -> rate -> aggregator, publishes the live status,
// and upserts the day on flush ticks, on rollover and on shutdown.
// Store failures are logged and retried on the next flush; the loop never stops for them.

use crate::aggregator::Aggregator;
use crate::models::{DailyUsage, LiveStatus, Sample};
use crate::sampler::{CounterSource, NetworkSampler, RateComputer, Tick, TickKind};
use crate::usage_repo::UsageRepo;
use chrono::{Days, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Sampler, aggregator, store and channels for the worker.
pub struct WorkerDeps<S> {
    pub sampler: NetworkSampler<S>,
    /// Seeded with today's stored row so totals survive restarts.
    pub aggregator: Aggregator,
    pub usage_repo: Arc<UsageRepo>,
    pub live_tx: watch::Sender<LiveStatus>,
    pub ws_live_connections: Arc<AtomicUsize>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    pub max_tick_gap_secs: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// 0 disables pruning on rollover.
    pub retention_days: u32,
}

#[derive(Debug, Default)]
struct WorkerStats {
    flushes_total: u64,
    flush_failures_total: u64,
    reset_ticks_total: u64,
    gap_ticks_total: u64,
}

pub fn spawn<S: CounterSource>(
    deps: WorkerDeps<S>,
    config: WorkerConfig,
) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        sampler,
        aggregator,
        usage_repo,
        live_tx,
        ws_live_connections,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        max_tick_gap_secs,
        stats_log_interval_secs,
        retention_days,
    } = config;

    let worker_span = tracing::debug_span!("worker", sample_interval_ms);
    tokio::spawn(
        async move {
            let sampler = Arc::new(Mutex::new(sampler));
            let mut rate_computer = RateComputer::new(Duration::from_secs(max_tick_gap_secs));
            let mut pipeline = Pipeline::new(aggregator, usage_repo, live_tx, retention_days);

            let mut tick = interval(Duration::from_millis(sample_interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let sample = match read_sample(&sampler).await {
                            Ok(Some(s)) => s,
                            Ok(None) => continue,
                            Err(e) => {
                                tracing::warn!(error = %e, operation = "sample", "sampling failed");
                                continue;
                            }
                        };
                        let Some(t) = rate_computer.advance(sample) else {
                            continue;
                        };
                        let now = chrono::Local::now();
                        pipeline.on_tick(now.date_naive(), now.timestamp_millis(), &t).await;
                    }
                    _ = &mut shutdown_rx => {
                        pipeline.flush().await;
                        if !pipeline.pending.is_empty() {
                            tracing::warn!(
                                unsaved_days = pipeline.pending.len(),
                                "shutting down with unsaved finalized days"
                            );
                        }
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        let read_failures = sampler.lock().map(|s| s.read_failures()).unwrap_or(0);
                        let stats = &pipeline.stats;
                        tracing::info!(
                            ws_live_clients = ws_live_connections.load(Ordering::Relaxed),
                            flushes_total = stats.flushes_total,
                            flush_failures_total = stats.flush_failures_total,
                            reset_ticks_total = stats.reset_ticks_total,
                            gap_ticks_total = stats.gap_ticks_total,
                            counter_read_failures = read_failures,
                            "app stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

/// Samples on the blocking pool. None until the counters have been read once.
async fn read_sample<S: CounterSource>(
    sampler: &Arc<Mutex<NetworkSampler<S>>>,
) -> anyhow::Result<Option<Sample>> {
    let sampler = sampler.clone();
    tokio::task::spawn_blocking(move || {
        let mut sampler = sampler
            .lock()
            .map_err(|e| anyhow::anyhow!("sampler lock poisoned: {}", e))?;
        let sample = sampler.sample();
        Ok(sampler.has_reading().then_some(sample))
    })
    .await
    .map_err(|e| anyhow::anyhow!("sampler task join: {}", e))?
}

/// Everything a tick touches after the rate is known.
struct Pipeline {
    aggregator: Aggregator,
    usage_repo: Arc<UsageRepo>,
    live_tx: watch::Sender<LiveStatus>,
    /// Finalized days whose upsert has not succeeded yet, oldest first.
    pending: Vec<DailyUsage>,
    stats: WorkerStats,
    retention_days: u32,
}

impl Pipeline {
    fn new(
        aggregator: Aggregator,
        usage_repo: Arc<UsageRepo>,
        live_tx: watch::Sender<LiveStatus>,
        retention_days: u32,
    ) -> Self {
        Self {
            aggregator,
            usage_repo,
            live_tx,
            pending: Vec::new(),
            stats: WorkerStats::default(),
            retention_days,
        }
    }

    /// Applies one tick dated `day`, publishes the live status, then persists:
    /// on rollover the finalized day is written before old rows are pruned.
    async fn on_tick(&mut self, day: NaiveDate, timestamp: i64, t: &Tick) {
        match t.kind {
            TickKind::Reset => {
                self.stats.reset_ticks_total += 1;
                tracing::debug!(operation = "compute_rate", "counter reset, tick ignored");
            }
            TickKind::Gap => {
                self.stats.gap_ticks_total += 1;
                tracing::debug!(
                    operation = "compute_rate",
                    elapsed_ms = t.elapsed.as_millis() as u64,
                    "tick gap too long, rate discarded"
                );
            }
            TickKind::Normal => {}
        }

        let outcome = self.aggregator.on_tick(day, t);
        self.live_tx.send_replace(self.aggregator.status(timestamp));

        if let Some(done) = outcome.finalized {
            tracing::info!(
                day = %done.day,
                bytes_sent = done.bytes_sent,
                bytes_recv = done.bytes_recv,
                active_seconds = done.active_seconds,
                "day finalized"
            );
            self.pending.push(done);
            self.flush().await;
            prune_expired(
                &self.usage_repo,
                self.aggregator.current().day,
                self.retention_days,
            )
            .await;
        } else if outcome.flush_due {
            self.flush().await;
        }
    }

    /// Writes queued finalized days (oldest first), then the in-progress day.
    /// Anything that fails stays queued or is rewritten on the next call.
    async fn flush(&mut self) {
        while let Some(day) = self.pending.first() {
            if let Err(e) = self.usage_repo.upsert(day).await {
                self.stats.flush_failures_total += 1;
                tracing::warn!(
                    error = %e,
                    day = %day.day,
                    operation = "upsert",
                    "saving finalized day failed, will retry"
                );
                return;
            }
            self.pending.remove(0);
        }
        let current = self.aggregator.current();
        match self.usage_repo.upsert(current).await {
            Ok(()) => {
                self.stats.flushes_total += 1;
                tracing::debug!(
                    operation = "upsert",
                    day = %current.day,
                    bytes_sent = current.bytes_sent,
                    bytes_recv = current.bytes_recv,
                    "day flushed"
                );
            }
            Err(e) => {
                self.stats.flush_failures_total += 1;
                tracing::warn!(
                    error = %e,
                    operation = "upsert",
                    "flushing current day failed, will retry"
                );
            }
        }
    }
}

/// First day kept when keeping `retention_days` days up to `today`. None when retention is off.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> Option<NaiveDate> {
    if retention_days == 0 {
        return None;
    }
    today.checked_sub_days(Days::new(u64::from(retention_days) - 1))
}

/// Deletes rows older than the retention window. Failures are logged only.
pub async fn prune_expired(usage_repo: &UsageRepo, today: NaiveDate, retention_days: u32) {
    let Some(cutoff) = retention_cutoff(today, retention_days) else {
        return;
    };
    match usage_repo.prune_before(cutoff).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(pruned_days = n, cutoff = %cutoff, "old usage pruned"),
        Err(e) => tracing::warn!(error = %e, operation = "prune_before", "pruning failed"),
    }
}
