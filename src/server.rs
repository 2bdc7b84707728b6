use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with every timed endpoint, the analysis
/// endpoints and the middleware stack.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Baseline ────────────────────────────────────────────
        .route("/ping", get(handlers::ping::ping))
        // ── Flag providers ──────────────────────────────────────
        .route("/configcat", get(handlers::sources::configcat))
        .route("/ldflag", get(handlers::sources::launchdarkly))
        // ── Storage ─────────────────────────────────────────────
        .route("/kv", get(handlers::storage::kv))
        .route("/db", get(handlers::storage::db))
        // ── Inter-service calls ─────────────────────────────────
        .route(
            "/restapi-same-zone",
            get(handlers::services::restapi_same_zone),
        )
        .route("/restapi", get(handlers::services::restapi))
        .route("/rpc", get(handlers::services::rpc))
        // ── Analysis ────────────────────────────────────────────
        .route("/api/performance", get(handlers::performance::recent))
        .route(
            "/api/performance/summary",
            get(handlers::performance::summary),
        )
        .route("/api/metrics", get(handlers::metrics::get_metrics))
        .route(
            "/api/metrics/stream",
            get(handlers::metrics::metrics_stream),
        )
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}
