use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::Value;

use super::http::{decode_json, send_timed};
use super::{ProviderError, Timed};

/// Fetch flags from the LaunchDarkly REST API.
///
/// The latency covers the round trip up to the response headers; parsing the
/// flag document happens afterwards.
pub async fn fetch_flags(
    http: &Client,
    url: &str,
    api_key: &str,
) -> Result<Timed<Value>, ProviderError> {
    let timed = send_timed(http.get(url).header(AUTHORIZATION, api_key)).await?;
    let flags = decode_json(timed.value).await?;
    Ok(Timed {
        value: flags,
        latency: timed.latency,
    })
}
