pub mod collector;
pub mod summary;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use summary::LatencySummary;

/// One timed call against a flag source, as seen by the live view.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Source label, e.g. "redis kv"
    pub source: &'static str,
    /// Caller-chosen sample name (`?name=`), also used for persistence
    pub name: String,
    /// Wall time around the I/O call in microseconds
    pub latency_us: u64,
    /// false when the call failed and nothing was persisted
    pub success: bool,
}
