//! Liveness and readiness probes

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use mcr_common::config::StoreBackend;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub store: StoreCheck,
}

#[derive(Serialize)]
pub struct StoreCheck {
    pub backend: StoreBackend,
    /// "up" or "down"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: mcr_common::VERSION,
    })
}

/// Ready once the report store answers a ping
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let backend = state.config.store.backend;
    let started = Instant::now();

    let store = match state.reports.ping().await {
        Ok(()) => StoreCheck {
            backend,
            status: "up",
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, backend = ?backend, "Report store is not reachable");
            StoreCheck {
                backend,
                status: "down",
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let (code, status) = if store.error.is_none() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadyResponse {
            status,
            checks: ReadyChecks { store },
        }),
    )
}
