use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;

use crate::kv;
use crate::providers::Timed;
use crate::AppState;

use super::{finish, AppError, FlagResponse, NameQuery};

const KV_SOURCE: &str = "redis kv";
const SQLITE_SOURCE: &str = "sqlite";

/// Row read by `/db`.
const FLAG_ID: i64 = 1;

// ─── GET /kv ─────────────────────────────────────────────────────
/// Timed: GET of the flag key plus JSON parse. A missing key is `null`.

pub async fn kv(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("kv");

    let t0 = Instant::now();
    let outcome = kv::get_json(state.kv.as_ref(), &state.config.kv_flag_key)
        .await
        .map(|value| Timed {
            value,
            latency: t0.elapsed(),
        })
        .map_err(AppError::from);

    finish(&state, KV_SOURCE, name, t0, outcome)
}

// ─── GET /db ─────────────────────────────────────────────────────
/// Timed: `SELECT … FROM flagship WHERE id = 1`. Answers the row list,
/// which is empty when the row does not exist.

pub async fn db(
    State(state): State<Arc<AppState>>,
    query: NameQuery,
) -> Result<Json<FlagResponse>, AppError> {
    let name = query.sample_name("d1");

    let t0 = Instant::now();
    let outcome = match state.store.flags_by_id(FLAG_ID).await {
        Ok(rows) => {
            let latency = t0.elapsed();
            serde_json::to_value(rows)
                .map(|value| Timed { value, latency })
                .map_err(|e| AppError::Internal(e.to_string()))
        }
        Err(err) => Err(AppError::from(err)),
    };

    finish(&state, SQLITE_SOURCE, name, t0, outcome)
}
