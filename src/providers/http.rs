use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ProviderError, Timed};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared outbound client. Every provider call goes through it.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).user_agent(USER_AGENT).build()
}

/// Send `request` and time it until the response headers arrive.
///
/// The body is not read here, so decoding stays outside the measured window.
/// Non-2xx answers are errors.
pub async fn send_timed(request: RequestBuilder) -> Result<Timed<Response>, ProviderError> {
    let t0 = Instant::now();
    let response = request.send().await.map_err(|source| ProviderError::Http {
        url: source.url().map(ToString::to_string).unwrap_or_default(),
        source,
    })?;
    let latency = t0.elapsed();

    let url = response.url().to_string();
    let status = response.status();
    debug!(%url, %status, latency_us = latency.as_micros() as u64, "upstream responded");

    if !status.is_success() {
        return Err(ProviderError::Status { url, status });
    }

    Ok(Timed {
        value: response,
        latency,
    })
}

pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let url = response.url().to_string();
    response
        .json()
        .await
        .map_err(|source| ProviderError::Decode { url, source })
}
