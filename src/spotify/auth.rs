//! Spotify OAuth 2.0 authorization-code flow.
//!
//! Builds the authorize redirect and talks to the token endpoint. Both token
//! grants authenticate with HTTP Basic (client id/secret) and send a
//! form-encoded body.
//!
//! Failures never propagate out of this module: they are logged and reported
//! as `None`, which callers treat as "authentication failed".

use crate::config::SpotifyConfig;
use crate::credentials::TokenResult;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest token lifetime accepted from the token endpoint (one year).
const MAX_EXPIRES_IN_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Authorize-URL builder and token-endpoint client.
pub struct OAuthFlow {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    scopes: String,
    http_client: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(config: &SpotifyConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scopes: config.scopes.clone(),
            http_client,
        })
    }

    /// Build the provider authorize URL for `user_id`.
    ///
    /// `state` is the stringified user id; the callback must parse it back and
    /// check the user exists before trusting it.
    pub fn authorize_url(&self, user_id: i64) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&state={}&scope={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            user_id,
            urlencoding::encode(&self.scopes),
        )
    }

    /// Exchange an authorization code for a token set.
    ///
    /// Returns None on a non-2xx response or any transport failure.
    pub async fn exchange_code(&self, code: &str) -> Option<TokenResult> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        debug!("Exchanging authorization code for token");

        match self.request_token(&form).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Authorization code exchange failed");
                None
            }
        }
    }

    /// Mint a new access token from a refresh token.
    ///
    /// Spotify does not always rotate refresh tokens; when the response omits
    /// one, `refresh_token` is carried forward into the result. Single
    /// attempt: a transport failure is reported as None, not retried.
    pub async fn refresh(&self, refresh_token: &str) -> Option<TokenResult> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        match self.request_token(&form).await {
            Ok(mut token) => {
                if token.refresh_token.is_none() {
                    token.refresh_token = Some(refresh_token.to_string());
                }
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResult> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(anyhow!(
                "Token endpoint returned status {}: {}",
                status,
                body
            ));
        }

        let mut token: TokenResult = response
            .json()
            .await
            .context("Failed to parse token response")?;

        if !(0..=MAX_EXPIRES_IN_SECONDS).contains(&token.expires_in) {
            return Err(anyhow!(
                "Token endpoint returned out-of-range expires_in: {}",
                token.expires_in
            ));
        }
        token.issued_at = Utc::now();

        debug!(
            has_refresh_token = token.refresh_token.is_some(),
            expires_in = token.expires_in,
            "Token endpoint responded"
        );

        Ok(token)
    }
}
