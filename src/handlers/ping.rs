use std::time::Instant;

use axum::Json;
use serde::Serialize;

use crate::recorder::as_millis_f64;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub latency: f64,
    pub source: &'static str,
}

// ─── GET /ping ───────────────────────────────────────────────────
/// Baseline: the timer wraps no work at all. Nothing is recorded.

pub async fn ping() -> Json<PingResponse> {
    let t0 = Instant::now();
    let latency = t0.elapsed();

    Json(PingResponse {
        latency: as_millis_f64(latency),
        source: "PING",
    })
}
