use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::providers::{launchdarkly, Timed};
use crate::AppState;

use super::{finish, AppError, FlagResponse, NameQuery};

const CONFIGCAT_SOURCE: &str = "config cat SDK";
const LAUNCHDARKLY_SOURCE: &str = "launch darkly API";

// ─── GET /configcat ──────────────────────────────────────────────
/// Times one SDK evaluation. The SDK never fails: on any problem it serves
/// the default (`true`), so this endpoint always records a sample.

pub async fn configcat(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("cc");
    let (Some(client), Some(cfg)) = (&state.configcat, &state.config.configcat) else {
        return Err(AppError::NotConfigured("CC_KEY"));
    };

    let t0 = Instant::now();
    let value = client.get_value(&cfg.flag_key, true, None).await;
    let latency = t0.elapsed();
    tracing::debug!(flag = %cfg.flag_key, value, "configcat evaluated");

    let outcome = Ok(Timed {
        value: Value::Bool(value),
        latency,
    });
    finish(&state, CONFIGCAT_SOURCE, name, t0, outcome)
}

// ─── GET /ldflag ─────────────────────────────────────────────────

pub async fn launchdarkly(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("ld");
    let Some(ld) = &state.config.launchdarkly else {
        return Err(AppError::NotConfigured("LD_URL/LD_KEY"));
    };

    let t0 = Instant::now();
    let outcome = launchdarkly::fetch_flags(&state.http, &ld.url, &ld.api_key)
        .await
        .map_err(AppError::from);

    finish(&state, LAUNCHDARKLY_SOURCE, name, t0, outcome)
}
