//! Reachability checks for backend services
//!
//! Probes every registered backend concurrently. Each probe carries its own
//! timeout, so a slow or dead backend only affects its own entry in the
//! report.

use crate::metrics::{Metrics, log_recording_failure};
use crate::models::client::OllamaClient;
use crate::models::registry::{BackendDescriptor, ModelRegistry};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregate status across all backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Every backend answered
    Healthy,
    /// Some, but not all, backends answered
    Degraded,
    /// No backend answered
    Unhealthy,
}

impl OverallStatus {
    pub fn from_counts(reachable: usize, total: usize) -> Self {
        if total > 0 && reachable == total {
            OverallStatus::Healthy
        } else if reachable > 0 {
            OverallStatus::Degraded
        } else {
            OverallStatus::Unhealthy
        }
    }
}

/// Probe result for one logical model's backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub url: String,
    pub connected: bool,
    /// Models the backend reports (empty when unreachable)
    pub models: Vec<String>,
    /// Whether the configured backend model is among `models`
    pub model_loaded: bool,
}

/// Result of probing every backend once
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub services: BTreeMap<String, ServiceStatus>,
}

impl HealthReport {
    pub fn reachable_count(&self) -> usize {
        self.services.values().filter(|s| s.connected).count()
    }
}

/// Concurrent prober over the model registry
pub struct HealthChecker {
    client: Arc<OllamaClient>,
    registry: Arc<ModelRegistry>,
    metrics: Arc<Metrics>,
}

impl HealthChecker {
    pub fn new(
        client: Arc<OllamaClient>,
        registry: Arc<ModelRegistry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            registry,
            metrics,
        }
    }

    /// Probe a single backend
    pub async fn check(&self, descriptor: &BackendDescriptor) -> ServiceStatus {
        match self.client.probe(descriptor).await {
            Ok(models) => {
                let model_loaded = models.iter().any(|m| m == descriptor.backend_model());
                ServiceStatus {
                    url: descriptor.base_url().to_string(),
                    connected: true,
                    models,
                    model_loaded,
                }
            }
            Err(e) => {
                tracing::debug!(
                    model = %descriptor.key(),
                    url = %descriptor.base_url(),
                    error = %e,
                    "Backend probe failed"
                );
                log_recording_failure(
                    "record_probe_failure",
                    self.metrics.record_probe_failure(descriptor.key()),
                );
                ServiceStatus {
                    url: descriptor.base_url().to_string(),
                    connected: false,
                    models: Vec::new(),
                    model_loaded: false,
                }
            }
        }
    }

    /// Probe every backend concurrently
    pub async fn check_all(&self) -> HealthReport {
        let probes = self.registry.iter().map(|d| async move {
            let status = self.check(d).await;
            (d.key().to_string(), status)
        });

        let services: BTreeMap<String, ServiceStatus> = join_all(probes).await.into_iter().collect();
        let reachable = services.values().filter(|s| s.connected).count();

        HealthReport {
            status: OverallStatus::from_counts(reachable, services.len()),
            services,
        }
    }

    /// Probe every backend once and log what was found
    ///
    /// Used at startup; never fails.
    pub async fn log_startup_report(&self) -> HealthReport {
        tracing::info!(
            backends = self.registry.len(),
            "Checking backend services"
        );

        let report = self.check_all().await;

        for descriptor in self.registry.iter() {
            let Some(status) = report.services.get(descriptor.key()) else {
                continue;
            };
            if !status.connected {
                tracing::warn!(
                    model = %descriptor.key(),
                    url = %status.url,
                    "Backend not reachable"
                );
            } else if status.model_loaded {
                tracing::info!(
                    model = %descriptor.key(),
                    backend_model = %descriptor.backend_model(),
                    url = %status.url,
                    "Backend connected and model available"
                );
            } else {
                tracing::warn!(
                    model = %descriptor.key(),
                    backend_model = %descriptor.backend_model(),
                    url = %status.url,
                    available = ?status.models,
                    "Backend connected but model not found"
                );
            }
        }

        report
    }
}
