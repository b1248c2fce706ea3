//! Snapshot Cache
//!
//! Holds the latest collection result. The scheduler is the only writer and
//! owns the [`SnapshotPublisher`]; HTTP handlers hold cloned [`SnapshotReader`]s.
//!
//! The current value lives in a `tokio::sync::watch` channel as an
//! `Option<Arc<Snapshot>>`: `None` until the first cycle completes, then a whole
//! snapshot swapped in at once. Readers clone the `Arc` under a short read lock
//! and never observe a partially written snapshot.

use crate::error::ApiError;
use crate::monitor::Monitor;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Immutable result of one collection cycle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Monitors from the latest successful cycle, in upstream order.
    /// `None` until some cycle has succeeded.
    pub monitors: Option<Arc<Vec<Monitor>>>,
    pub collected_at: DateTime<Utc>,
    pub duration_seconds: f64,
    /// Set when this cycle failed; `monitors` then holds the previous data.
    pub error: Option<ApiError>,
    /// Publish sequence number, starting at 1.
    pub generation: u64,
}

impl Snapshot {
    pub fn success(
        monitors: Vec<Monitor>,
        collected_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            monitors: Some(Arc::new(monitors)),
            collected_at,
            duration_seconds: duration.as_secs_f64(),
            error: None,
            generation: 0,
        }
    }

    /// A failed cycle that keeps serving `previous` data, if any.
    pub fn failure(
        error: ApiError,
        previous: Option<Arc<Vec<Monitor>>>,
        collected_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            monitors: previous,
            collected_at,
            duration_seconds: duration.as_secs_f64(),
            error: Some(error),
            generation: 0,
        }
    }

    /// Whether any cycle has ever produced monitor data.
    pub fn has_data(&self) -> bool {
        self.monitors.is_some()
    }

    pub fn monitors(&self) -> &[Monitor] {
        self.monitors.as_deref().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.collected_at).to_std().unwrap_or_default()
    }
}

/// Create an uninitialized cache.
pub fn cache() -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(None);
    (
        SnapshotPublisher { tx, generation: 0 },
        SnapshotReader { rx },
    )
}

/// Write side of the cache. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
    generation: u64,
}

impl SnapshotPublisher {
    /// Atomically replace the current snapshot and return the published value.
    pub fn publish(&mut self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        self.generation += 1;
        snapshot.generation = self.generation;
        let snapshot = Arc::new(snapshot);
        // send_replace succeeds even when every reader has been dropped
        self.tx.send_replace(Some(snapshot.clone()));
        snapshot
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }
}

/// Read side of the cache.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl SnapshotReader {
    /// Latest published snapshot, or `None` before the first publish.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.rx.borrow().clone()
    }
}
