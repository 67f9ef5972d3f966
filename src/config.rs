//! Configuration management for ollamaverse
//!
//! Parses TOML configuration files, layers environment overrides on top and
//! provides typed access to settings. Without a file, a built-in registry
//! describing the two default Ollama services is used.

use crate::error::{AppError, AppResult};
use crate::models::WireShape;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Upper bound for any configured timeout, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a whole generation call, body included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Deadline for a single reachability probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            probe_timeout_seconds: default_probe_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    120
}

fn default_probe_timeout() -> u64 {
    5
}

/// One routable model
///
/// Fields are private; entries are created by deserialization or
/// [`ModelEntry::new`] and checked by [`Config::validate`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelEntry {
    /// Logical key callers use in the `model` field
    key: String,
    /// Base URL of the Ollama service (no trailing slash)
    base_url: String,
    #[serde(default)]
    shape: WireShape,
    /// Model identifier the backend knows; defaults to `key`
    #[serde(default)]
    backend_model: Option<String>,
}

impl ModelEntry {
    pub fn new(
        key: impl Into<String>,
        base_url: impl Into<String>,
        shape: WireShape,
        backend_model: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            base_url: base_url.into(),
            shape,
            backend_model,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn shape(&self) -> WireShape {
        self.shape
    }

    /// Real backend model id (falls back to the logical key)
    pub fn backend_model(&self) -> &str {
        self.backend_model.as_deref().unwrap_or(&self.key)
    }

    /// Name of the environment variable overriding this entry's URL
    ///
    /// `smollm2` → `OLLAMA_SMOLLM2_URL`, `llama-3.1` → `OLLAMA_LLAMA_3_1_URL`
    pub fn url_env_var(&self) -> String {
        let key: String = self
            .key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("OLLAMA_{}_URL", key)
    }
}

/// Routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Key used when a request omits `model`
    #[serde(default)]
    pub default_model: Option<String>,
}

/// Token validation settings
///
/// Disabled unless explicitly switched on.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    /// HS256 signing secret
    #[serde(default)]
    pub secret: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Built-in configuration matching the stock two-service deployment
    pub fn builtin() -> Self {
        Self {
            server: ServerConfig::default(),
            models: vec![
                ModelEntry::new(
                    "smollm2",
                    "http://ollama-smollm2:11434",
                    WireShape::Generate,
                    Some("smollm2:135m-instruct-q8_0".to_string()),
                ),
                ModelEntry::new(
                    "tinyllama",
                    "http://ollama-tinyllama:11434",
                    WireShape::Generate,
                    Some("tinyllama:latest".to_string()),
                ),
            ],
            routing: RoutingConfig {
                default_model: Some("smollm2".to_string()),
            },
            auth: AuthConfig {
                enabled: false,
                secret: "supersecret".to_string(),
            },
            observability: ObservabilityConfig::default(),
        }
    }

    /// Load configuration from a file (or the built-in defaults) and apply
    /// process environment overrides
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::builtin(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let mut config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config.normalize();
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Apply environment overrides using the given variable lookup
    ///
    /// Recognised: `PORT`, `JWT_SECRET`, `AUTH_ENABLED` and one
    /// `OLLAMA_<KEY>_URL` per model entry.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                AppError::Config(format!("PORT must be a valid port number, got '{}'", port))
            })?;
        }

        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.secret = secret;
        }

        if let Some(enabled) = lookup("AUTH_ENABLED") {
            self.auth.enabled = match enabled.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(AppError::Config(format!(
                        "AUTH_ENABLED must be true or false, got '{}'",
                        other
                    )));
                }
            };
        }

        for entry in &mut self.models {
            let var = entry.url_env_var();
            if let Some(url) = lookup(&var) {
                tracing::debug!(
                    model = %entry.key,
                    env_var = %var,
                    url = %url,
                    "Backend URL overridden from environment"
                );
                entry.base_url = url;
            }
        }

        Ok(())
    }

    /// Canonicalize values that have more than one accepted spelling
    fn normalize(&mut self) {
        for entry in &mut self.models {
            let trimmed = entry.base_url.trim().trim_end_matches('/').to_string();
            entry.base_url = trimmed;
        }
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()`, `load()` and `from_str()`; can also be called
    /// explicitly on hand-built configs.
    pub fn validate(&self) -> AppResult<()> {
        if self.models.is_empty() {
            return Err(AppError::Config(
                "at least one [[models]] entry is required.\n\n\
                Example:\n\
                [[models]]\n\
                key = \"smollm2\"\n\
                base_url = \"http://localhost:11434\"\n\
                shape = \"generate\"\n\
                backend_model = \"smollm2:135m-instruct-q8_0\""
                    .to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.models {
            if entry.key.trim().is_empty() {
                return Err(AppError::Config(
                    "model key cannot be empty or whitespace".to_string(),
                ));
            }

            if !seen.insert(entry.key.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate model key '{}'. Each [[models]] key must be unique.",
                    entry.key
                )));
            }

            if !entry.base_url.starts_with("http://") && !entry.base_url.starts_with("https://")
            {
                return Err(AppError::Config(format!(
                    "model '{}' has invalid base_url '{}'. \
                    base_url must start with 'http://' or 'https://'.",
                    entry.key, entry.base_url
                )));
            }

            if entry.backend_model().trim().is_empty() {
                return Err(AppError::Config(format!(
                    "model '{}' has an empty backend_model",
                    entry.key
                )));
            }
        }

        for (name, value) in [
            (
                "server.request_timeout_seconds",
                self.server.request_timeout_seconds,
            ),
            (
                "server.probe_timeout_seconds",
                self.server.probe_timeout_seconds,
            ),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
            if value > MAX_TIMEOUT_SECONDS {
                return Err(AppError::Config(format!(
                    "{} cannot exceed {} seconds, got {}",
                    name, MAX_TIMEOUT_SECONDS, value
                )));
            }
        }

        if let Some(default_model) = &self.routing.default_model {
            if !self.models.iter().any(|m| &m.key == default_model) {
                return Err(AppError::Config(format!(
                    "routing.default_model '{}' is not a configured model key",
                    default_model
                )));
            }
        }

        if self.auth.enabled && self.auth.secret.is_empty() {
            return Err(AppError::Config(
                "auth.enabled requires a non-empty auth.secret (or JWT_SECRET)".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let mut config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.normalize();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 9000
request_timeout_seconds = 90

[[models]]
key = "smollm2"
base_url = "http://ollama-smollm2:11434/"
shape = "generate"
backend_model = "smollm2:135m-instruct-q8_0"

[[models]]
key = "llama3"
base_url = "http://ollama-llama:11434"
shape = "chat"

[routing]
default_model = "smollm2"

[observability]
log_level = "debug"
log_format = "json"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout_seconds, 90);
        assert_eq!(config.server.probe_timeout_seconds, 5);
        assert_eq!(config.routing.default_model.as_deref(), Some("smollm2"));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.auth.enabled);
    }

    #[test]
    fn test_model_entries_are_normalized() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.models[0].base_url(), "http://ollama-smollm2:11434");
        assert_eq!(config.models[0].backend_model(), "smollm2:135m-instruct-q8_0");
        assert_eq!(config.models[1].shape(), WireShape::Chat);
        // backend_model falls back to the key
        assert_eq!(config.models[1].backend_model(), "llama3");
    }

    #[test]
    fn test_builtin_config_is_valid() {
        let config = Config::builtin();
        config.validate().expect("built-in config should validate");
        let keys: Vec<_> = config.models.iter().map(|m| m.key()).collect();
        assert_eq!(keys, vec!["smollm2", "tinyllama"]);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_seconds, 120);
        assert_eq!(config.routing.default_model.as_deref(), Some("smollm2"));
    }

    #[test]
    fn test_env_overrides_replace_port_secret_and_urls() {
        let mut config = Config::builtin();
        config
            .apply_env_overrides(env(&[
                ("PORT", "5001"),
                ("JWT_SECRET", "rotated"),
                ("AUTH_ENABLED", "true"),
                ("OLLAMA_SMOLLM2_URL", "http://10.0.0.5:11434"),
            ]))
            .expect("overrides should apply");

        assert_eq!(config.server.port, 5001);
        assert_eq!(config.auth.secret, "rotated");
        assert!(config.auth.enabled);
        assert_eq!(config.models[0].base_url(), "http://10.0.0.5:11434");
        assert_eq!(config.models[1].base_url(), "http://ollama-tinyllama:11434");
    }

    #[test]
    fn test_invalid_port_override_is_rejected() {
        let mut config = Config::builtin();
        let err = config
            .apply_env_overrides(env(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_url_env_var_name() {
        let entry = ModelEntry::new("llama-3.1", "http://h", WireShape::Chat, None);
        assert_eq!(entry.url_env_var(), "OLLAMA_LLAMA_3_1_URL");
    }

    #[test]
    fn test_empty_models_rejected() {
        let err = Config::from_str("models = []").unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let toml = r#"
[[models]]
key = "a"
base_url = "http://h1:11434"

[[models]]
key = "a"
base_url = "http://h2:11434"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate model key 'a'"));
    }

    #[test]
    fn test_bad_scheme_rejected() {
        let toml = r#"
[[models]]
key = "a"
base_url = "ftp://h1:11434"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
[server]
request_timeout_seconds = 0

[[models]]
key = "a"
base_url = "http://h1:11434"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("request_timeout_seconds"));
    }

    #[test]
    fn test_unknown_default_model_rejected() {
        let toml = r#"
[[models]]
key = "a"
base_url = "http://h1:11434"

[routing]
default_model = "b"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("default_model"));
    }

    #[test]
    fn test_auth_requires_secret() {
        let toml = r#"
[[models]]
key = "a"
base_url = "http://h1:11434"

[auth]
enabled = true
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("auth.secret"));
    }

    #[test]
    fn test_unknown_shape_rejected_at_parse_time() {
        let toml = r#"
[[models]]
key = "a"
base_url = "http://h1:11434"
shape = "completions"
"#;
        assert!(matches!(
            Config::from_str(toml),
            Err(AppError::ConfigParseFailed { .. })
        ));
    }
}
