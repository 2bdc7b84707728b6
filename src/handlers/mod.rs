pub mod metrics;
pub mod performance;
pub mod ping;
pub mod services;
pub mod sources;
pub mod storage;

use std::time::Instant;

use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::kv::KvError;
use crate::providers::{ProviderError, Timed};
use crate::recorder::as_millis_f64;
use crate::store::StoreError;
use crate::AppState;

// ─── Shared response shape ───────────────────────────────────────

/// What every flag endpoint answers with.
#[derive(Debug, Clone, Serialize)]
pub struct FlagResponse {
    /// Milliseconds spent in the timed call
    pub latency: f64,
    pub source: &'static str,
    pub flags: Value,
}

/// `?name=` labels the stored sample. Absent or empty means the
/// endpoint's default; when repeated, the first occurrence wins.
#[derive(Debug, Default)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for NameQuery
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        let name = pairs
            .into_iter()
            .find(|(key, _)| key == "name")
            .map(|(_, value)| value);
        Ok(Self { name })
    }
}

/// `Query` whose rejection is an [`AppError`], so malformed query strings
/// get the same JSON error body as everything else.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl NameQuery {
    pub fn sample_name(self, default: &str) -> String {
        self.name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default.to_owned())
    }
}

/// The common tail of every timed endpoint: a success is recorded (live view
/// plus background insert) and returned; a failure only reaches the live view.
pub(crate) fn finish(
    state: &AppState,
    source: &'static str,
    name: String,
    started: Instant,
    outcome: Result<Timed<Value>, AppError>,
) -> Result<Json<FlagResponse>, AppError> {
    match outcome {
        Ok(timed) => {
            state.recorder.record(source, name, timed.latency);
            Ok(Json(FlagResponse {
                latency: as_millis_f64(timed.latency),
                source,
                flags: timed.value,
            }))
        }
        Err(err) => {
            state.recorder.record_failure(source, name, started.elapsed());
            Err(err)
        }
    }
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("upstream: {0}")]
    Upstream(#[from] ProviderError),
    #[error("kv: {0}")]
    Kv(#[from] KvError),
    #[error("database: {0}")]
    Database(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Kv(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_falls_back_to_default() {
        let q = NameQuery {
            name: Some(String::new()),
        };
        assert_eq!(q.sample_name("kv"), "kv");
        assert_eq!(NameQuery::default().sample_name("d1"), "d1");
        let q = NameQuery {
            name: Some("edge-eu".into()),
        };
        assert_eq!(q.sample_name("kv"), "edge-eu");
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            AppError::NotConfigured("LD_URL").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        let rpc = ProviderError::Rpc {
            method: "getFlags",
            message: "boom".into(),
        };
        assert_eq!(AppError::from(rpc).status(), StatusCode::BAD_GATEWAY);
    }
}
