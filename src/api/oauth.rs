//! Spotify authorization-code flow endpoints.
//!
//! 1. Client opens GET /spotify/auth/:user_id/login → redirect to Spotify
//! 2. User authorizes on Spotify
//! 3. Spotify redirects to /users/auth/callback?code=..&state=<user_id>
//! 4. Exchange code for tokens, store encrypted credentials
//!
//! Both routes are browser-facing and sit outside the API-key check.

use super::error::AppError;
use crate::credentials::{Credential, CredentialStore};
use crate::spotify::OAuthFlow;
use crate::users::UserStore;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{Json, Redirect},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared application state for OAuth API
pub struct OAuthAppState {
    pub oauth: Arc<OAuthFlow>,
    pub user_store: Arc<UserStore>,
    pub credential_store: Arc<CredentialStore>,
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// OAuth success response
#[derive(Debug, Serialize)]
pub struct OAuthSuccessResponse {
    message: String,
    user_id: i64,
}

/// Create OAuth API router
pub fn create_oauth_router(state: OAuthAppState) -> Router {
    Router::new()
        .route("/spotify/auth/:user_id/login", get(oauth_login))
        .route("/users/auth/callback", get(oauth_callback))
        .with_state(Arc::new(state))
}

/// GET /spotify/auth/:user_id/login
///
/// Redirects to the Spotify authorize page; 404 if the user is unknown.
async fn oauth_login(
    State(state): State<Arc<OAuthAppState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Redirect, AppError> {
    let Path(user_id) = user_id?;
    if !state.user_store.exists(user_id)? {
        warn!(user_id, "OAuth login for unknown user");
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!(user_id, "Redirecting to Spotify authorization");
    Ok(Redirect::temporary(&state.oauth.authorize_url(user_id)))
}

/// GET /users/auth/callback
///
/// `state` carries the user id in plain text, so it is validated (parses,
/// user exists) before any token is exchanged or stored.
async fn oauth_callback(
    State(state): State<Arc<OAuthAppState>>,
    callback: Result<Query<OAuthCallback>, QueryRejection>,
) -> Result<Json<OAuthSuccessResponse>, AppError> {
    let Query(callback) = callback?;
    if let Some(err) = callback.error {
        warn!(error = %err, "Spotify authorization denied");
        return Err(AppError::BadRequest(format!("Spotify Error: {}", err)));
    }

    let (Some(code), Some(raw_state)) = (callback.code, callback.state) else {
        return Err(AppError::BadRequest("Missing code or state".to_string()));
    };

    let user_id: i64 = raw_state
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid state (user_id)".to_string()))?;

    if !state.user_store.exists(user_id)? {
        warn!(user_id, "OAuth callback for unknown user");
        return Err(AppError::NotFound("User not found".to_string()));
    }

    debug!(user_id, "Exchanging authorization code");

    let token = state.oauth.exchange_code(&code).await.ok_or_else(|| {
        error!(user_id, "Authorization code exchange failed");
        AppError::BadGateway("Authentication failed".to_string())
    })?;

    let credential = Credential::from_token(user_id, &token, Utc::now());
    state.credential_store.save(&credential)?;

    info!(
        user_id,
        has_refresh_token = credential.refresh_token.is_some(),
        expires_at = %credential.expires_at,
        "Spotify account connected"
    );

    Ok(Json(OAuthSuccessResponse {
        message: "Spotify Connected!".to_string(),
        user_id,
    }))
}
