//! Health check endpoint
//!
//! Probes every configured backend and reports per-service reachability.
//! Always answers 200; the body's `status` carries the verdict.

use crate::handlers::AppState;
use crate::models::{OverallStatus, ServiceStatus};
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy", "degraded" or "unhealthy"
    pub status: OverallStatus,
    /// Probe result per logical model key
    pub services: BTreeMap<String, ServiceStatus>,
    /// Every configured key, in configuration order
    pub configured_models: Vec<String>,
}

/// GET /health handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let report = state.health().check_all().await;

    tracing::debug!(
        status = ?report.status,
        reachable = report.reachable_count(),
        total = report.services.len(),
        "Health check completed"
    );

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: report.status,
            services: report.services,
            configured_models: state.registry().keys().map(str::to_string).collect(),
        }),
    )
}
