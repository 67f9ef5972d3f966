//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use crate::config::{LogFormat, ObservabilityConfig};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Default filter directive for a given level
pub fn default_directive(level: &str) -> String {
    format!("ollamaverse={},tower_http=info", level)
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Examples
///
/// ```no_run
/// let config = ollamaverse::config::ObservabilityConfig::default();
/// ollamaverse::telemetry::init(&config);
/// tracing::info!("Application started");
/// ```
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

        let registry = tracing_subscriber::registry().with(filter);
        match config.log_format {
            LogFormat::Pretty => registry.with(fmt::layer()).init(),
            LogFormat::Json => registry.with(fmt::layer().json()).init(),
        }
    });
}
