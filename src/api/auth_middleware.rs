//! API-key gatekeeping for the user and Spotify resource routes.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;


/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Expected API key. `None` disables the check (development mode).
#[derive(Clone, Default)]
pub struct ApiKeyState {
    expected: Option<Arc<str>>,
}

impl ApiKeyState {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    pub fn enabled(&self) -> bool {
        self.expected.is_some()
    }
}

/// Authorization errors
#[derive(Debug, PartialEq)]
pub enum AuthError {
    /// Header absent or not valid UTF-8
    Missing,
    /// Header present but wrong
    Mismatch,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Missing => write!(f, "Missing {} header", API_KEY_HEADER),
            AuthError::Mismatch => write!(f, "Invalid {} header", API_KEY_HEADER),
        }
    }
}

/// Check the `x-api-key` header against the configured key.
///
/// Always Ok when no key is configured.
pub fn check_api_key(headers: &HeaderMap, state: &ApiKeyState) -> Result<(), AuthError> {
    let Some(expected) = state.expected.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Missing)?;

    if provided != expected {
        return Err(AuthError::Mismatch);
    }

    Ok(())
}

/// Middleware applied with `middleware::from_fn_with_state`.
pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = check_api_key(req.headers(), &state) {
        warn!(path = %req.uri().path(), reason = %e, "API key rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid or missing API Key credentials" })),
        )
            .into_response();
    }
    next.run(req).await
}
