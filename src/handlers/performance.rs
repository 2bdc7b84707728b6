use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::metrics::LatencySummary;
use crate::store::PerformanceRow;
use crate::AppState;

use super::{ApiQuery, AppError};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1_000;
/// Matches SQLite's `current_timestamp`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub name: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PerformanceSummary {
    pub since: Option<String>,
    pub total_samples: u64,
    pub names: BTreeMap<String, LatencySummary>,
}

// ─── GET /api/performance ────────────────────────────────────────

pub async fn recent(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<Json<Vec<PerformanceRow>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let name = query.name.filter(|n| !n.is_empty());

    let rows = state.store.recent_performance(name, limit).await?;
    Ok(Json(rows))
}

// ─── GET /api/performance/summary ────────────────────────────────
/// Per-name percentiles over everything stored since `since`.

pub async fn summary(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<Json<PerformanceSummary>, AppError> {
    let since = match query.since.filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(normalize_timestamp(&raw)?),
        None => None,
    };

    let names = state.store.performance_summary(since.clone()).await?;
    let total_samples: u64 = names.values().map(|summary| summary.count).sum();

    Ok(Json(PerformanceSummary {
        since,
        total_samples,
        names,
    }))
}

fn normalize_timestamp(raw: &str) -> Result<String, AppError> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| {
            AppError::BadRequest(format!(
                "since must look like 2024-01-31 23:59:00, got {raw:?}"
            ))
        })?;
    Ok(parsed.format(TIMESTAMP_FORMAT).to_string())
}
