//! Health and readiness endpoints.
//!
//! # Health vs Readiness
//!
//! - **Health** (`GET /health`): always 200, reports upstream reachability
//!   and uptime in the body
//! - **Readiness** (`GET /ready`): 503 until the MLS provider probe has
//!   succeeded, so a load balancer never routes search traffic at an
//!   instance that cannot serve it

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// Whether the most recent MLS probe succeeded
    pub upstream_connected: bool,
    /// Service version
    pub version: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint.
///
/// Always returns 200 OK with status details in the body.
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstream_connected = state.is_upstream_healthy();

    Json(HealthResponse {
        status: if upstream_connected {
            "healthy"
        } else {
            "degraded"
        }
        .to_string(),
        upstream_connected,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for load balancer probes.
///
/// Returns 200 OK once the upstream probe has succeeded,
/// 503 Service Unavailable otherwise.
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.is_upstream_healthy() {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
