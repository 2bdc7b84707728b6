pub mod config;
pub mod handlers;
pub mod kv;
pub mod metrics;
pub mod middleware;
pub mod providers;
pub mod recorder;
pub mod seed;
pub mod server;
pub mod store;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use config::Config;
use kv::KvStore;
use metrics::MetricsCollector;
use providers::PeerService;
use recorder::LatencyRecorder;
use store::FlagStore;

/// Failures while wiring the outbound clients at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configcat client: {0}")]
    ConfigCat(#[from] configcat::ClientError),
}

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Config,

    /// One pooled HTTP client for every outbound call.
    pub http: reqwest::Client,

    pub kv: Arc<dyn KvStore>,
    pub store: FlagStore,

    /// Vendor SDK client; `None` when `CC_KEY` is unset.
    pub configcat: Option<configcat::Client>,

    /// `None` when `PEER_SERVICE_URL` is unset.
    pub peer: Option<PeerService>,

    /// Persists successful samples in the background.
    pub recorder: LatencyRecorder,

    /// Live per-source view; handlers push samples, SSE reads snapshots.
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(
        config: Config,
        kv: Arc<dyn KvStore>,
        store: FlagStore,
    ) -> Result<Self, StateError> {
        let http = providers::http::build_client(config.http_timeout)?;

        let configcat = config
            .configcat
            .as_ref()
            .map(|cc| providers::configcat::build_client(cc, config.http_timeout))
            .transpose()?;
        let peer = config
            .peer_service_url
            .as_ref()
            .map(|url| PeerService::new(http.clone(), url.as_str()));

        let metrics = Arc::new(MetricsCollector::new());
        let recorder = LatencyRecorder::new(store.clone(), metrics.clone());

        Ok(Self {
            config,
            http,
            kv,
            store,
            configcat,
            peer,
            recorder,
            metrics,
        })
    }
}
