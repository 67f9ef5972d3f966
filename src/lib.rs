//! ollamaverse - model-routing proxy for Ollama backends
//!
//! Exposes one HTTP API (`/health`, `/models`, `/ask`) in front of several
//! Ollama services and forwards each chat request to the backend registered
//! for its model key, reassembling streamed replies into a single response.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod server;
pub mod telemetry;
