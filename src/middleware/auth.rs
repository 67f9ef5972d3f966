//! Optional token authentication for the chat endpoints
//!
//! When `[auth] enabled = true`, `/ask` and `/ollama/chat` require an HS256
//! JWT signed with the configured secret. The token is read from an
//! `Authorization: Bearer` header or, failing that, from the `token` field
//! of the JSON body.

use crate::error::AppError;
use crate::handlers::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

/// Largest body buffered while looking for a `token` field
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// HS256 token validator
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens need not carry exp/aud; an exp that is present is still checked
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check signature and any time-based claims
    pub fn validate(&self, token: &str) -> Result<(), jsonwebtoken::errors::Error> {
        decode::<serde_json::Value>(token, &self.key, &self.validation).map(|_| ())
    }
}

/// Extract bearer token from an Authorization header value.
///
/// Expects format: `Bearer <token>`
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Pull the `token` field out of a JSON request body
fn body_token(bytes: &Bytes) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value.get("token")?.as_str().map(str::to_string)
}

/// Middleware rejecting chat requests without a valid token
///
/// A no-op when authentication is disabled. The body is buffered only when
/// no bearer header is present, and is handed on to the handler unchanged.
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(validator) = state.token_validator() else {
        return next.run(request).await;
    };

    let header_token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string);

    let (token, request) = match header_token {
        Some(token) => (Some(token), request),
        None => {
            let (parts, body) = request.into_parts();
            let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(error = %e, "Could not buffer request body for token lookup");
                    return AppError::Unauthorized.into_response();
                }
            };
            let token = body_token(&bytes);
            (token, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    let Some(token) = token else {
        tracing::warn!(uri = %request.uri(), "Rejected request without token");
        return AppError::Unauthorized.into_response();
    };

    if let Err(e) = validator.validate(&token) {
        tracing::warn!(uri = %request.uri(), error = %e, "Rejected request with invalid token");
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}
