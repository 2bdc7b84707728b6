use std::sync::Arc;
use std::time::Instant;

use axum::extract::{OriginalUri, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::providers::rest;
use crate::AppState;

use super::{finish, AppError, FlagResponse, NameQuery};

const SAME_ZONE_SOURCE: &str = "peer service REST API";
const EXTERNAL_SOURCE: &str = "external REST API";
const RPC_SOURCE: &str = "peer service RPC";

// ─── GET /restapi-same-zone ──────────────────────────────────────
/// Replays this very request (path, query, request id) against the peer
/// service and returns whatever JSON it answers.

pub async fn restapi_same_zone(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("rest-same-zone");
    let Some(peer) = &state.peer else {
        return Err(AppError::NotConfigured("PEER_SERVICE_URL"));
    };
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let t0 = Instant::now();
    let outcome = peer
        .forward(path_and_query, &headers)
        .await
        .map_err(AppError::from);

    finish(&state, SAME_ZONE_SOURCE, name, t0, outcome)
}

// ─── GET /restapi ────────────────────────────────────────────────

pub async fn restapi(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("restapi");

    let t0 = Instant::now();
    let outcome = rest::fetch_json(&state.http, &state.config.restapi_url)
        .await
        .map_err(AppError::from);

    finish(&state, EXTERNAL_SOURCE, name, t0, outcome)
}

// ─── GET /rpc ────────────────────────────────────────────────────

pub async fn rpc(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("rpc");
    let Some(peer) = &state.peer else {
        return Err(AppError::NotConfigured("PEER_SERVICE_URL"));
    };

    let t0 = Instant::now();
    let outcome = peer.get_flags().await.map_err(AppError::from);

    finish(&state, RPC_SOURCE, name, t0, outcome)
}
