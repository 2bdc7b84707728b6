use std::time::Instant;

use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::http::{decode_json, send_timed};
use super::{ProviderError, Timed};

/// Only this header survives when a request is forwarded to the peer.
const FORWARDED_HEADER: &str = "x-request-id";

const GET_FLAGS: &str = "getFlags";

/// Client for the peer flag service, reachable in two call styles:
/// forwarding the incoming REST request, or a JSON-RPC `getFlags` call.
#[derive(Clone)]
pub struct PeerService {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: [Value; 0],
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

impl PeerService {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Replay a `GET` for `path_and_query` against the peer.
    ///
    /// Timed until the peer's response headers arrive; the JSON body is
    /// decoded afterwards.
    pub async fn forward(
        &self,
        path_and_query: &str,
        headers: &HeaderMap,
    ) -> Result<Timed<Value>, ProviderError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let mut request = self.http.get(url);
        if let Some(id) = headers.get(FORWARDED_HEADER) {
            request = request.header(FORWARDED_HEADER, id.clone());
        }

        let timed = send_timed(request).await?;
        let body = decode_json(timed.value).await?;
        Ok(Timed {
            value: body,
            latency: timed.latency,
        })
    }

    /// Call `getFlags` over RPC. The latency includes decoding the result,
    /// since that is part of an RPC call returning a value.
    pub async fn get_flags(&self) -> Result<Timed<Value>, ProviderError> {
        let url = format!("{}/rpc", self.base_url);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method: GET_FLAGS,
            params: [],
        };

        let t0 = Instant::now();
        let timed = send_timed(self.http.post(url).json(&body)).await?;
        let response: RpcResponse = decode_json(timed.value).await?;
        let latency = t0.elapsed();

        match response {
            RpcResponse {
                error: Some(err), ..
            } => Err(ProviderError::Rpc {
                method: GET_FLAGS,
                message: err.message,
            }),
            RpcResponse { result, .. } => Ok(Timed {
                value: result.unwrap_or(Value::Null),
                latency,
            }),
        }
    }
}
