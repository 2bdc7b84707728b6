use reqwest::Client;
use serde_json::Value;

use super::http::{decode_json, send_timed};
use super::{ProviderError, Timed};

/// Plain `GET` against an arbitrary JSON endpoint, timed until headers.
pub async fn fetch_json(http: &Client, url: &str) -> Result<Timed<Value>, ProviderError> {
    let timed = send_timed(http.get(url)).await?;
    let latency = timed.latency;
    let body = decode_json(timed.value).await?;
    Ok(Timed {
        value: body,
        latency,
    })
}
