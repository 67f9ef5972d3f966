//! Error types for ollamaverse
//!
//! All errors implement `IntoResponse` for Axum handlers. Every backend
//! communication failure is converted into one of these variants at the
//! handler boundary, so nothing escapes as an unhandled fault.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    /// Body could not be read as a chat request
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Neither `prompt` nor `messages` carried any text
    #[error("Missing {0}")]
    MissingInput(String),

    #[error("Model '{model}' not available")]
    ModelNotConfigured {
        model: String,
        available: Vec<String>,
    },

    #[error("Invalid token")]
    Unauthorized,

    #[error("Ollama service for '{model}' is not available")]
    BackendUnavailable { model: String, url: String },

    #[error("Request timeout - model took too long to respond ({timeout_seconds}s)")]
    UpstreamTimeout { url: String, timeout_seconds: u64 },

    #[error("Failed to communicate with Ollama: {reason}")]
    UpstreamError { url: String, reason: String },

    #[error("Empty response from model")]
    EmptyGeneration { model: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short label used for metrics and request logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => "config",
            Self::InvalidBody(_) => "invalid_body",
            Self::MissingInput(_) => "missing_input",
            Self::ModelNotConfigured { .. } => "model_not_configured",
            Self::Unauthorized => "unauthorized",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamError { .. } => "upstream_error",
            Self::EmptyGeneration { .. } => "empty_generation",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::MissingInput(_) | Self::ModelNotConfigured { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::UpstreamError { .. }
            | Self::EmptyGeneration { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        match self {
            // Internal details are logged, never returned
            Self::Internal(_) => {
                body.insert("error".into(), json!("Internal server error"));
            }
            Self::ModelNotConfigured { available, .. } => {
                body.insert("error".into(), json!(self.to_string()));
                body.insert("available_models".into(), json!(available));
            }
            Self::BackendUnavailable { url, .. } | Self::UpstreamError { url, .. } => {
                body.insert("error".into(), json!(self.to_string()));
                body.insert("ollama_url".into(), json!(url));
            }
            Self::UpstreamTimeout {
                url,
                timeout_seconds,
            } => {
                body.insert("error".into(), json!(self.to_string()));
                body.insert("ollama_url".into(), json!(url));
                body.insert("timeout_seconds".into(), json!(timeout_seconds));
            }
            _ => {
                body.insert("error".into(), json!(self.to_string()));
            }
        }
        Value::Object(body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "Internal error while handling request");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
