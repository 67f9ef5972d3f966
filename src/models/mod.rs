//! Backend model registry, wire formats and the Ollama client
//!
//! The registry maps logical keys to backend descriptors; `wire` and
//! `stream` describe what goes over the wire; `client` and `health` talk to
//! the backends.

pub mod client;
pub mod health;
pub mod registry;
pub mod stream;
pub mod wire;

pub use client::{BackendError, Generation, OllamaClient};
pub use health::{HealthChecker, HealthReport, OverallStatus, ServiceStatus};
pub use registry::{BackendDescriptor, ModelRegistry};
pub use wire::{ChatInput, ChatMessage, WireShape};
