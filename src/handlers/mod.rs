//! HTTP request handlers for the ollamaverse API

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::auth::TokenValidator;
use crate::models::{HealthChecker, ModelRegistry, OllamaClient};
use std::sync::Arc;
use std::time::Duration;

pub mod ask;
pub mod health;
pub mod metrics;
pub mod models;

/// Application state shared across all handlers
///
/// Everything is built once at startup and never mutated; all fields are
/// Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: Arc<ModelRegistry>,
    client: Arc<OllamaClient>,
    metrics: Arc<Metrics>,
    health: Arc<HealthChecker>,
    token_validator: Option<Arc<TokenValidator>>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the metrics registry cannot be
    /// created.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let registry = Arc::new(ModelRegistry::from_config(&config));

        let client = Arc::new(OllamaClient::new(
            Duration::from_secs(config.server.request_timeout_seconds),
            Duration::from_secs(config.server.probe_timeout_seconds),
        )?);

        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?,
        );

        let health = Arc::new(HealthChecker::new(
            client.clone(),
            registry.clone(),
            metrics.clone(),
        ));

        let token_validator = if config.auth.enabled {
            tracing::info!("Token authentication enabled for chat endpoints");
            Some(Arc::new(TokenValidator::new(&config.auth.secret)))
        } else {
            None
        };

        Ok(Self {
            config,
            registry,
            client,
            metrics,
            health,
            token_validator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    /// Token validator, present only when authentication is enabled
    pub fn token_validator(&self) -> Option<&TokenValidator> {
        self.token_validator.as_deref()
    }
}
