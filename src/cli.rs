//! Command-line interface for ollamaverse
//!
//! Provides argument parsing and subcommand handling for the ollamaverse binary.

use clap::{Parser, Subcommand};

/// Model-routing proxy for Ollama backends
#[derive(Parser)]
#[command(name = "ollamaverse")]
#[command(version)]
#[command(about = "Model-routing proxy for Ollama backends")]
#[command(
    long_about = "ollamaverse exposes one HTTP API in front of several Ollama services, \
    routing each chat request to the backend registered for its model key."
)]
pub struct Cli {
    /// Path to configuration file (built-in two-model setup when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# ollamaverse configuration
#
# Every value below can be left out; the defaults are shown.
# Environment overrides applied after loading:
#   PORT, JWT_SECRET, AUTH_ENABLED, OLLAMA_<KEY>_URL (e.g. OLLAMA_SMOLLM2_URL)

[server]
host = "0.0.0.0"
port = 8000

# Deadline for one generation request, in seconds (1-600)
request_timeout_seconds = 120

# Deadline for one reachability probe, in seconds (1-600)
probe_timeout_seconds = 5

# ─────────────────────────────────────────────────────────────────────────────
# MODELS
# ─────────────────────────────────────────────────────────────────────────────
#
# One entry per logical model key.
#   key           - name callers put in the "model" field
#   base_url      - Ollama service root (no /api suffix)
#   shape         - "generate" (/api/generate) or "chat" (/api/chat)
#   backend_model - model id sent to the backend (defaults to key)

[[models]]
key = "smollm2"
base_url = "http://ollama-smollm2:11434"
shape = "generate"
backend_model = "smollm2:135m-instruct-q8_0"

[[models]]
key = "tinyllama"
base_url = "http://ollama-tinyllama:11434"
shape = "generate"
backend_model = "tinyllama:latest"

[routing]
# Key used when a request omits "model"
default_model = "smollm2"

[auth]
# Require an HS256 JWT on /ask and /ollama/chat
enabled = false
secret = "change-me"

[observability]
# trace, debug, info, warn, error (RUST_LOG takes precedence)
log_level = "info"
# "pretty" or "json"
log_format = "pretty"
"#
}
