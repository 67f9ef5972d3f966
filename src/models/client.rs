//! HTTP client for Ollama-compatible backends
//!
//! Wraps a shared `reqwest::Client` and knows the two backend calls the
//! router makes: the list-models probe and the generation request. Every call
//! carries its own deadline; nothing is retried.

use crate::error::AppError;
use crate::models::registry::BackendDescriptor;
use crate::models::stream::{Reassembly, StreamFailure, reassemble};
use crate::models::wire::{BackendChunk, ChatInput, TagsResponse};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;

/// Content type Ollama uses for streamed replies
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Longest error body excerpt kept from a failed backend reply
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

/// Failures talking to a backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request to {url} timed out after {timeout_seconds}s")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("could not reach {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("{url} returned an unreadable body: {reason}")]
    InvalidBody { url: String, reason: String },

    #[error("{url} reported an error: {message}")]
    Backend { url: String, message: String },
}

impl BackendError {
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::InvalidBody { url, .. }
            | Self::Backend { url, .. } => url,
        }
    }

    fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_seconds: timeout.as_secs(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout {
                url,
                timeout_seconds,
            } => AppError::UpstreamTimeout {
                url,
                timeout_seconds,
            },
            other => AppError::UpstreamError {
                url: other.url().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Text produced by one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Generated text, whitespace-trimmed
    pub text: String,
    /// Stream lines skipped because they did not parse
    pub skipped_lines: usize,
}

/// Client for Ollama-compatible backends
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            request_timeout,
            probe_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Probe a backend by listing its models
    ///
    /// Any 2xx reply counts as reachable. A reply whose body is not a model
    /// list still counts as reachable, with an empty list.
    pub async fn probe(&self, descriptor: &BackendDescriptor) -> Result<Vec<String>, BackendError> {
        let url = descriptor.tags_url();

        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(&url, self.probe_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                url,
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) => Ok(tags.models.into_iter().map(|m| m.name).collect()),
            Err(e) => {
                tracing::debug!(
                    model = %descriptor.key(),
                    url = %url,
                    error = %e,
                    "Backend reachable but model list unreadable"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Send a generation request and reduce the reply to its text
    ///
    /// The whole exchange (headers and body) is bounded by the request
    /// timeout. The reply is treated as a stream when the caller asked for
    /// one or when the backend labels it as NDJSON.
    pub async fn generate(
        &self,
        descriptor: &BackendDescriptor,
        input: &ChatInput,
        stream: bool,
    ) -> Result<Generation, BackendError> {
        let url = descriptor.generation_url();
        let body = descriptor
            .shape()
            .build_request(descriptor.backend_model(), input, stream);

        tracing::debug!(
            model = %descriptor.key(),
            backend_model = %descriptor.backend_model(),
            shape = %descriptor.shape(),
            url = %url,
            stream = stream,
            "Sending generation request"
        );

        let exchange = async {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| BackendError::from_reqwest(&url, self.request_timeout, e))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(BackendError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }

            let is_ndjson = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with(NDJSON_CONTENT_TYPE));

            if stream || is_ndjson {
                self.read_stream(descriptor, &url, response).await
            } else {
                self.read_single(descriptor, &url, response).await
            }
        };

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                url: descriptor.generation_url(),
                timeout_seconds: self.request_timeout.as_secs(),
            }),
        }
    }

    async fn read_single(
        &self,
        descriptor: &BackendDescriptor,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Generation, BackendError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::from_reqwest(url, self.request_timeout, e))?;

        let chunk: BackendChunk =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::InvalidBody {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(message) = chunk.error {
            return Err(BackendError::Backend {
                url: url.to_string(),
                message,
            });
        }

        let text = descriptor
            .shape()
            .fragment(&chunk)
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(Generation {
            text,
            skipped_lines: 0,
        })
    }

    async fn read_stream(
        &self,
        descriptor: &BackendDescriptor,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Generation, BackendError> {
        let Reassembly {
            text,
            fragments,
            skipped,
        } = reassemble(descriptor.shape(), response.bytes_stream())
            .await
            .map_err(|failure| match failure {
                StreamFailure::Transport(e) => {
                    BackendError::from_reqwest(url, self.request_timeout, e)
                }
                StreamFailure::Backend(message) => BackendError::Backend {
                    url: url.to_string(),
                    message,
                },
            })?;

        if skipped > 0 {
            tracing::debug!(
                model = %descriptor.key(),
                skipped_lines = skipped,
                fragments = fragments,
                "Stream contained malformed lines"
            );
        }

        Ok(Generation {
            text: text.trim().to_string(),
            skipped_lines: skipped,
        })
    }
}

/// Pull a readable message out of an error reply
///
/// Ollama answers errors with `{"error": "..."}`; anything else is
/// returned as a truncated excerpt.
fn error_message(body: &str) -> String {
    if let Ok(chunk) = serde_json::from_str::<BackendChunk>(body) {
        if let Some(message) = chunk.error {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty error body".to_string();
    }
    trimmed.chars().take(ERROR_BODY_PREVIEW_CHARS).collect()
}
