pub mod configcat;
pub mod http;
pub mod launchdarkly;
pub mod peer;
pub mod rest;

use std::time::Duration;

use thiserror::Error;

pub use peer::PeerService;

/// A value together with the wall-clock time it took to obtain it.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub value: T,
    pub latency: Duration,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("{url} returned a body that is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("rpc {method} failed: {message}")]
    Rpc { method: &'static str, message: String },
}
