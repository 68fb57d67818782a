// src/tracker/mod.rs - Warning tracker: weighted violation accumulation and escalation

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::config::FilterConfig;
use crate::filters::WordFilters;
use crate::types::{NewUserWarning, SteamId, UserWarning};

/// Metrics sink for tracker events. Injected explicitly rather than
/// registered globally; [`NoopMetrics`] is the default.
pub trait TrackerMetrics: Send + Sync {
    fn filter_matched(&self) {}
    fn warning_issued(&self) {}
    fn warnings_exceeded(&self) {}
    fn event_dropped(&self) {}
}

pub struct NoopMetrics;

impl TrackerMetrics for NoopMetrics {}

/// Outcome strategies invoked by the tracker. Implementations are
/// side-effecting only; their errors are logged at the invocation site and
/// never alter the ledger.
#[async_trait]
pub trait WarningHandler: Send + Sync {
    /// A warning accumulated but the user stayed at or below the limit.
    async fn on_warning(&self, warning: &NewUserWarning) -> Result<()>;

    /// The user's cumulative weight strictly exceeded the limit.
    async fn on_exceeded(&self, warning: &NewUserWarning) -> Result<()>;
}

type Ledger = HashMap<SteamId, Vec<UserWarning>>;

/// Cloneable handle for producers and admin surfaces: queues events,
/// snapshots state and reloads config while the tracker loop runs.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<NewUserWarning>,
    warnings: Arc<RwLock<Ledger>>,
    config: Arc<RwLock<FilterConfig>>,
    metrics: Arc<dyn TrackerMetrics>,
}

impl TrackerHandle {
    /// Queue a warning event without blocking. When the channel is full
    /// the event is dropped: a burst of warnings loses one weight unit,
    /// not correctness, and the chat path must never stall.
    pub fn queue(&self, event: NewUserWarning) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Warning queue full, dropping event for {}",
                    event.warning.steam_id
                );
                self.metrics.event_dropped();
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Warning tracker stopped, event discarded");
            }
        }
    }

    /// Snapshot of every user's active warnings. Keys are strings so the
    /// payload survives javascript frontends without BigInt.
    pub async fn state(&self) -> HashMap<String, Vec<UserWarning>> {
        let warnings = self.warnings.read().await;

        warnings
            .iter()
            .map(|(steam_id, entries)| (steam_id.to_string(), entries.clone()))
            .collect()
    }

    /// Replace the tracker configuration at runtime.
    pub async fn set_config(&self, config: FilterConfig) {
        *self.config.write().await = config;
    }
}

/// Accumulates weighted warnings per user inside a sliding window and
/// escalates once the configured weight is strictly exceeded.
///
/// All ledger mutation happens on the tracker's own loop; the lock around
/// the map only exists so handles can take state snapshots.
pub struct WarningTracker {
    filters: Arc<WordFilters>,
    config: Arc<RwLock<FilterConfig>>,
    warnings: Arc<RwLock<Ledger>>,
    handler: Box<dyn WarningHandler>,
    metrics: Arc<dyn TrackerMetrics>,
    rx: mpsc::Receiver<NewUserWarning>,
}

impl WarningTracker {
    pub const DEFAULT_QUEUE_DEPTH: usize = 64;

    pub fn new(
        filters: Arc<WordFilters>,
        config: FilterConfig,
        handler: Box<dyn WarningHandler>,
        metrics: Arc<dyn TrackerMetrics>,
        queue_depth: usize,
    ) -> (Self, TrackerHandle) {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let config = Arc::new(RwLock::new(config));
        let warnings: Arc<RwLock<Ledger>> = Arc::new(RwLock::new(HashMap::new()));

        let handle = TrackerHandle {
            tx,
            warnings: warnings.clone(),
            config: config.clone(),
            metrics: metrics.clone(),
        };

        let tracker = Self {
            filters,
            config,
            warnings,
            handler,
            metrics,
            rx,
        };

        (tracker, handle)
    }

    /// Event loop. Waits on the sweep timer, the inbound event channel and
    /// the shutdown signal; processing is serialized so ledger mutations
    /// are free of data races. Events still queued at shutdown are
    /// dropped (at-most-once delivery).
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Warning tracker started");

        // The sweep deadline persists across event processing; a busy
        // event channel must not postpone eviction. The deadline is only
        // rearmed after a sweep runs, re-reading the configured interval
        // so config reloads take effect.
        let mut next_sweep =
            tokio::time::Instant::now() + self.config.read().await.check_timeout();

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_sweep) => {
                    self.sweep(Utc::now()).await;
                    next_sweep =
                        tokio::time::Instant::now() + self.config.read().await.check_timeout();
                }
                event = self.rx.recv() => {
                    match event {
                        Some(event) => self.trigger(event).await,
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        info!("Warning tracker stopped");
    }

    /// Process one matched-filter event.
    async fn trigger(&self, mut event: NewUserWarning) {
        if !event.warning.steam_id.valid() {
            debug!("Dropping warning with invalid steam id");
            return;
        }

        // Trigger counters record every match, even for disabled filters
        // and in dry-run mode. Persistence failures are non-fatal.
        if let Err(err) = self
            .filters
            .record_trigger(event.warning.matched_filter.filter_id)
            .await
        {
            error!("Failed to update filter trigger count: {err}");
        }

        self.metrics.filter_matched();

        // A disabled filter exists for logging and statistics only.
        if !event.warning.matched_filter.is_enabled {
            return;
        }

        let config = self.config.read().await.clone();

        if config.dry {
            return;
        }

        let steam_id = event.warning.steam_id;

        let current_weight = {
            let mut warnings = self.warnings.write().await;
            let ledger = warnings.entry(steam_id).or_default();

            let previous: u32 = ledger
                .iter()
                .map(|entry| entry.matched_filter.weight)
                .sum();
            let total = previous + event.warning.matched_filter.weight;

            event.warning.current_total = total;
            ledger.push(event.warning.clone());

            total
        };

        if current_weight > config.max_weight {
            info!(
                "Warn limit exceeded for {} (weight {} > {})",
                steam_id, current_weight, config.max_weight
            );
            self.metrics.warnings_exceeded();

            if let Err(err) = self.handler.on_exceeded(&event).await {
                error!("Failed to execute warning exceeded handler: {err:#}");
            }

            if config.reset_on_escalation {
                self.warnings.write().await.remove(&steam_id);
            }
        } else {
            self.metrics.warning_issued();

            if let Err(err) = self.handler.on_warning(&event).await {
                error!("Failed to execute warning handler: {err:#}");
            }
        }
    }

    /// Evict warnings older than the match timeout and drop users whose
    /// ledgers become empty. Running totals are recomputed for survivors.
    async fn sweep(&self, now: DateTime<Utc>) {
        let match_timeout = self.config.read().await.match_timeout();
        let mut warnings = self.warnings.write().await;

        warnings.retain(|_, ledger| {
            ledger.retain(|entry| now - entry.created_on < match_timeout);

            if ledger.is_empty() {
                return false;
            }

            let mut total = 0;
            for entry in ledger.iter_mut() {
                total += entry.matched_filter.weight;
                entry.current_total = total;
            }

            true
        });
    }
}
