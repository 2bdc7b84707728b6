use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::summary::{latency_histogram, LatencySummary};
use super::Sample;

/// How many individual samples we keep for the live feed
const MAX_RECENT_SAMPLES: usize = 200;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe in-memory view of every timed call since startup.
/// Handlers feed it through the recorder; `/api/metrics` reads snapshots.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// A single entry in the live feed.
#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub recorded_at: DateTime<Utc>,
    pub source: &'static str,
    pub name: String,
    pub latency_ms: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub requests: u64,
    pub errors: u64,
    /// Successful calls only
    pub latency: LatencySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sources: BTreeMap<&'static str, SourceStats>,
    pub total_requests: u64,
    pub total_errors: u64,
    pub requests_per_sec: f64,
    pub elapsed_secs: f64,
    pub recent_samples: Vec<SampleRecord>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    sources: BTreeMap<&'static str, SourceAccumulator>,
    total_requests: u64,
    total_errors: u64,
    recent_samples: VecDeque<SampleRecord>,
    // Anchor for requests/sec, set by the first sample
    start_time: Option<Instant>,
}

struct SourceAccumulator {
    hist: Histogram<u64>,
    requests: u64,
    errors: u64,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn record(&self, sample: Sample) {
        self.inner.lock().record(sample);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            total_requests: 0,
            total_errors: 0,
            recent_samples: VecDeque::with_capacity(MAX_RECENT_SAMPLES + 1),
            start_time: None,
        }
    }

    fn record(&mut self, sample: Sample) {
        self.start_time.get_or_insert_with(Instant::now);

        self.total_requests += 1;
        let acc = self
            .sources
            .entry(sample.source)
            .or_insert_with(|| SourceAccumulator {
                hist: latency_histogram(),
                requests: 0,
                errors: 0,
            });
        acc.requests += 1;

        if sample.success {
            acc.hist.saturating_record(sample.latency_us.max(1));
        } else {
            acc.errors += 1;
            self.total_errors += 1;
        }

        self.recent_samples.push_back(SampleRecord {
            recorded_at: Utc::now(),
            source: sample.source,
            name: sample.name,
            latency_ms: sample.latency_us as f64 / 1_000.0,
            success: sample.success,
        });
        if self.recent_samples.len() > MAX_RECENT_SAMPLES {
            self.recent_samples.pop_front();
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let elapsed_secs = self
            .start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let requests_per_sec = if elapsed_secs > 0.0 {
            self.total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        let sources = self
            .sources
            .iter()
            .map(|(source, acc)| {
                (
                    *source,
                    SourceStats {
                        requests: acc.requests,
                        errors: acc.errors,
                        latency: LatencySummary::from_histogram(&acc.hist),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            sources,
            total_requests: self.total_requests,
            total_errors: self.total_errors,
            requests_per_sec,
            elapsed_secs,
            // Newest first for the feed
            recent_samples: self.recent_samples.iter().rev().cloned().collect(),
        }
    }
}
