use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::metrics::{MetricsCollector, Sample};
use crate::store::FlagStore;

/// Milliseconds as a float, the unit every endpoint reports.
pub fn as_millis_f64(latency: Duration) -> f64 {
    latency.as_secs_f64() * 1_000.0
}

/// Fire-and-forget persistence of latency samples.
///
/// `record` returns immediately; the SQLite insert runs on a tracked task so
/// shutdown can drain what is still in flight. A failed insert is logged and
/// dropped.
#[derive(Clone)]
pub struct LatencyRecorder {
    store: FlagStore,
    metrics: Arc<MetricsCollector>,
    tasks: TaskTracker,
}

impl LatencyRecorder {
    pub fn new(store: FlagStore, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            store,
            metrics,
            tasks: TaskTracker::new(),
        }
    }

    /// A successful call: update the live view and queue the insert.
    pub fn record(&self, source: &'static str, name: String, latency: Duration) {
        self.metrics.record(Sample {
            source,
            name: name.clone(),
            latency_us: latency.as_micros() as u64,
            success: true,
        });

        let store = self.store.clone();
        let latency_ms = as_millis_f64(latency);
        self.tasks.spawn(async move {
            match store.insert_performance(&name, latency_ms).await {
                Ok(()) => debug!(%name, latency_ms, "latency sample stored"),
                Err(err) => warn!(%name, latency_ms, error = %err, "failed to store latency sample"),
            }
        });
    }

    /// A failed call only counts towards the live view.
    pub fn record_failure(&self, source: &'static str, name: String, latency: Duration) {
        self.metrics.record(Sample {
            source,
            name,
            latency_us: latency.as_micros() as u64,
            success: false,
        });
    }

    /// Writes that have been queued but not finished.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every queued write has finished. New writes may be queued
    /// while this runs; they are waited for as well.
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
