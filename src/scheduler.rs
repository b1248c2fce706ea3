//! Collection Scheduler
//!
//! A single background task owns the API client and the snapshot publisher, so
//! collection cycles can never overlap.
//!
//! # States
//!
//! ```text
//!            timer / trigger              failure
//!   Idle ───────────────────► Collecting ─────────► Backoff
//!    ▲                            │  ▲                  │
//!    └────────── success ─────────┘  └── delay elapsed ─┘
//! ```
//!
//! # Triggers
//!
//! Cycles start when the periodic timer fires or when a scrape finds the snapshot
//! older than `max_age` and calls [`CollectionTrigger::request`]. The trigger
//! channel holds a single slot, so concurrent requests coalesce. Requests are
//! ignored while backing off or when the previous cycle started less than
//! `min_interval` ago, and requests that arrive during a cycle are discarded when
//! it ends.

use crate::config::CollectionConfig;
use crate::error::ApiError;
use crate::metrics::ExporterMetrics;
use crate::monitor::{normalize, Monitor};
use crate::snapshot::{Snapshot, SnapshotPublisher};
use crate::uptimerobot::UptimeRobotClient;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Collecting,
    Backoff,
}

/// Exponential retry delay: `initial * 2^(failures - 1)`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            failures: 0,
        }
    }

    /// Record a failure and return the delay before the next attempt.
    ///
    /// Rate limiting counts as two failures and never retries sooner than the
    /// `Retry-After` upstream asked for.
    pub fn on_failure(&mut self, error: &ApiError) -> Duration {
        let steps = match error {
            ApiError::RateLimited { .. } => 2,
            _ => 1,
        };
        self.failures = self.failures.saturating_add(steps);

        let exponent = (self.failures - 1).min(31);
        let delay = self
            .initial
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max);

        match error {
            ApiError::RateLimited {
                retry_after: Some(retry_after),
                ..
            } => delay.max(*retry_after),
            _ => delay,
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Handle used by scrape handlers to ask for an early refresh.
#[derive(Debug, Clone)]
pub struct CollectionTrigger {
    tx: mpsc::Sender<()>,
}

impl CollectionTrigger {
    /// Request a cycle without waiting for it. Returns `false` when a request
    /// is already pending.
    pub fn request(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Result of one collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Success { monitors: usize },
    Failure { error: ApiError, retry_in: Duration },
}

pub struct Scheduler {
    client: Arc<UptimeRobotClient>,
    publisher: SnapshotPublisher,
    metrics: ExporterMetrics,
    settings: CollectionConfig,
    triggers: mpsc::Receiver<()>,
    state: SchedulerState,
    backoff: Backoff,
    last_started: Option<Instant>,
}

impl Scheduler {
    pub fn new(
        client: Arc<UptimeRobotClient>,
        publisher: SnapshotPublisher,
        metrics: ExporterMetrics,
        settings: CollectionConfig,
    ) -> (Self, CollectionTrigger) {
        let (tx, triggers) = mpsc::channel(1);
        let scheduler = Self {
            client,
            publisher,
            metrics,
            settings,
            triggers,
            state: SchedulerState::Idle,
            backoff: Backoff::new(settings.backoff_initial, settings.backoff_max),
            last_started: None,
        };
        (scheduler, CollectionTrigger { tx })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run cycles forever, starting with one immediately.
    pub async fn run(mut self) {
        let mut next_run = Instant::now();

        loop {
            let on_demand = tokio::select! {
                _ = tokio::time::sleep_until(next_run) => false,
                Some(()) = self.triggers.recv() => true,
            };

            if on_demand && !self.accepts_trigger() {
                continue;
            }

            let started = Instant::now();
            let outcome = self.collect_once().await;
            self.discard_pending_triggers();

            next_run = match outcome {
                CycleOutcome::Success { .. } => {
                    started + self.settings.interval.max(self.settings.min_interval)
                }
                CycleOutcome::Failure { retry_in, .. } => Instant::now() + retry_in,
            };
        }
    }

    /// Fetch, normalize and publish once. Always publishes, success or not.
    pub async fn collect_once(&mut self) -> CycleOutcome {
        self.transition(SchedulerState::Collecting);
        self.last_started = Some(Instant::now());
        info!("Collecting monitors from UptimeRobot");

        let timer = Instant::now();
        let result = self.client.fetch_all_monitors().await;
        let elapsed = timer.elapsed();
        let finished_at = Utc::now();

        match result {
            Ok(raw) => {
                let monitors: Vec<Monitor> = raw.iter().map(normalize).collect();
                let count = monitors.len();

                self.publisher
                    .publish(Snapshot::success(monitors, finished_at, elapsed));
                self.backoff.reset();
                self.metrics
                    .record_success(count, finished_at.timestamp_millis() as f64 / 1000.0);
                self.transition(SchedulerState::Idle);

                info!(
                    "Collected {} monitors in {:.3}s",
                    count,
                    elapsed.as_secs_f64()
                );
                CycleOutcome::Success { monitors: count }
            }
            Err(error) => {
                let retry_in = self.retry_delay(&error);
                let previous = self
                    .publisher
                    .current()
                    .and_then(|snapshot| snapshot.monitors.clone());
                let stale = previous.is_some();

                match &error {
                    ApiError::Auth(_) => error!(
                        kind = error.kind(),
                        retry_in_secs = retry_in.as_secs_f64(),
                        "UptimeRobot rejected the API key: {}",
                        error
                    ),
                    _ => warn!(
                        kind = error.kind(),
                        retry_in_secs = retry_in.as_secs_f64(),
                        serving_stale = stale,
                        "Collection failed: {}",
                        error
                    ),
                }

                self.publisher.publish(Snapshot::failure(
                    error.clone(),
                    previous,
                    finished_at,
                    elapsed,
                ));
                self.metrics.record_failure(&error, retry_in);
                self.transition(SchedulerState::Backoff);

                CycleOutcome::Failure { error, retry_in }
            }
        }
    }

    fn retry_delay(&mut self, error: &ApiError) -> Duration {
        let mut delay = self.backoff.on_failure(error);
        if matches!(error, ApiError::Auth(_)) {
            // A bad key will not fix itself sooner than the normal schedule.
            delay = delay.max(self.settings.interval);
        }
        delay.max(self.settings.min_interval)
    }

    fn accepts_trigger(&self) -> bool {
        if self.state == SchedulerState::Backoff {
            debug!("Ignoring collection request while backing off");
            return false;
        }
        if let Some(last) = self.last_started {
            if last.elapsed() < self.settings.min_interval {
                debug!("Ignoring collection request inside the minimum interval");
                return false;
            }
        }
        true
    }

    fn discard_pending_triggers(&mut self) {
        while self.triggers.try_recv().is_ok() {
            debug!("Dropping collection request received mid-cycle");
        }
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Scheduler state change");
            self.state = next;
        }
    }
}
