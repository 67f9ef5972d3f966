//! Chat endpoint handler
//!
//! Serves `POST /ask` and its alias `POST /ollama/chat`: validates the
//! request, resolves the model key, checks the backend is reachable and
//! forwards the prompt in the backend's wire shape.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::{UNCONFIGURED_MODEL_LABEL, log_recording_failure};
use crate::middleware::RequestId;
use crate::models::{ChatInput, ChatMessage};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Chat request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    /// Logical model key; falls back to `routing.default_model`
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    /// Only read by the auth middleware
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl AskRequest {
    /// Validated textual input
    ///
    /// A non-blank `prompt` wins; otherwise a message list counts when at
    /// least one message has non-blank content.
    pub fn input(&self) -> AppResult<ChatInput> {
        if let Some(prompt) = self.prompt.as_deref() {
            if !prompt.trim().is_empty() {
                return Ok(ChatInput::Prompt(prompt.to_string()));
            }
        }

        match &self.messages {
            Some(messages) if messages.iter().any(|m| !m.content.trim().is_empty()) => {
                Ok(ChatInput::Messages(messages.clone()))
            }
            _ => Err(AppError::MissingInput("prompt".to_string())),
        }
    }
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    /// Logical key the request was routed by
    pub model: String,
    /// Model identifier the backend ran
    pub ollama_model: String,
    /// Seconds spent on the request, two decimals
    pub processing_time: f64,
}

/// POST /ask handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Json<AskResponse>> {
    let started = Instant::now();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = AppError::InvalidBody(rejection.body_text());
            log_failure(&request_id, UNCONFIGURED_MODEL_LABEL, 0, started, &err);
            record_outcome(&state, UNCONFIGURED_MODEL_LABEL, err.kind());
            return Err(err);
        }
    };

    let key = request
        .model
        .clone()
        .or_else(|| state.config().routing.default_model.clone())
        .unwrap_or_default();

    let label = if state.registry().contains(&key) {
        key.as_str()
    } else {
        UNCONFIGURED_MODEL_LABEL
    };

    let prompt_chars = request.input().map(|i| i.char_len()).unwrap_or(0);
    let result = ask(&state, &request, &key).await;

    match &result {
        Ok(reply) => {
            tracing::info!(
                request_id = %request_id,
                model = %key,
                ollama_model = %reply.ollama_model,
                prompt_chars,
                response_chars = reply.response.chars().count(),
                elapsed_seconds = started.elapsed().as_secs_f64(),
                outcome = "success",
                "Chat request completed"
            );
            record_outcome(&state, label, "success");
        }
        Err(e) => {
            log_failure(&request_id, &key, prompt_chars, started, e);
            record_outcome(&state, label, e.kind());
        }
    }

    result.map(|mut reply| {
        reply.processing_time = round_seconds(started.elapsed().as_secs_f64());
        Json(reply)
    })
}

/// Validate, resolve, probe and forward one request
async fn ask(state: &AppState, request: &AskRequest, key: &str) -> AppResult<AskResponse> {
    let input = request.input()?;
    let descriptor = state.registry().resolve(key)?;

    if let Err(e) = state.client().probe(descriptor).await {
        tracing::debug!(
            model = %key,
            url = %descriptor.base_url(),
            error = %e,
            "Backend probe failed before dispatch"
        );
        log_recording_failure(
            "record_probe_failure",
            state.metrics().record_probe_failure(key),
        );
        return Err(AppError::BackendUnavailable {
            model: key.to_string(),
            url: descriptor.base_url().to_string(),
        });
    }

    let upstream_started = Instant::now();
    let generation = state
        .client()
        .generate(descriptor, &input, request.stream)
        .await?;

    let metrics = state.metrics();
    log_recording_failure(
        "record_upstream_duration",
        metrics.record_upstream_duration(key, upstream_started.elapsed().as_secs_f64()),
    );
    log_recording_failure(
        "record_skipped_lines",
        metrics.record_skipped_lines(key, generation.skipped_lines),
    );

    if generation.text.is_empty() {
        return Err(AppError::EmptyGeneration {
            model: key.to_string(),
        });
    }

    Ok(AskResponse {
        response: generation.text,
        model: key.to_string(),
        ollama_model: descriptor.backend_model().to_string(),
        processing_time: 0.0,
    })
}

fn log_failure(
    request_id: &RequestId,
    model: &str,
    prompt_chars: usize,
    started: Instant,
    err: &AppError,
) {
    tracing::warn!(
        request_id = %request_id,
        model = %model,
        prompt_chars,
        elapsed_seconds = started.elapsed().as_secs_f64(),
        outcome = err.kind(),
        error = %err,
        "Chat request failed"
    );
}

fn record_outcome(state: &AppState, model: &str, outcome: &str) {
    log_recording_failure(
        "record_request",
        state.metrics().record_request(model, outcome),
    );
}

fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
