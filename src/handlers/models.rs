//! Models endpoint handler
//!
//! Lists the configured model keys via GET /models. Never contacts a
//! backend.

use crate::handlers::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;

/// Response for GET /models endpoint
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Logical keys in configuration order
    pub models: Vec<String>,
    /// Logical key → backend model identifier
    pub model_mapping: BTreeMap<String, String>,
}

/// GET /models handler
pub async fn handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    let registry = state.registry();
    Json(ModelsResponse {
        models: registry.keys().map(str::to_string).collect(),
        model_mapping: registry.mapping(),
    })
}
