//! Single chokepoint that hands out usable access tokens.

use super::auth::OAuthFlow;
use crate::credentials::CredentialStore;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Returns a currently valid access token for a user, refreshing and
/// persisting it when the stored one is stale.
///
/// No in-process cache: every call reads the credential store. Two requests
/// racing on a stale token may both refresh; the later write wins.
pub struct TokenGuard {
    credential_store: Arc<CredentialStore>,
    oauth: Arc<OAuthFlow>,
    expiry_margin_seconds: i64,
}

impl TokenGuard {
    pub fn new(
        credential_store: Arc<CredentialStore>,
        oauth: Arc<OAuthFlow>,
        expiry_margin_seconds: i64,
    ) -> Self {
        Self {
            credential_store,
            oauth,
            expiry_margin_seconds,
        }
    }

    /// Returns a usable access token for `user_id`.
    ///
    /// # Returns
    /// * `Ok(Some(token))` - Stored token is fresh, or was refreshed and persisted
    /// * `Ok(None)` - No credential, no refresh token, or refresh failed;
    ///   the user has to run the authorize flow again
    /// * `Err` - Credential storage failed
    pub async fn ensure_valid_token(&self, user_id: i64) -> Result<Option<String>> {
        let Some(mut credential) = self.credential_store.get(user_id)? else {
            debug!(user_id, "No Spotify credentials stored");
            return Ok(None);
        };

        if !credential.is_expired(self.expiry_margin_seconds, Utc::now()) {
            return Ok(Some(credential.access_token));
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            warn!(user_id, "Access token expired and no refresh token stored");
            return Ok(None);
        };

        info!(user_id, "Refreshing Spotify access token");

        let Some(refreshed) = self.oauth.refresh(&refresh_token).await else {
            warn!(user_id, "Refresh rejected, re-authorization required");
            return Ok(None);
        };

        credential.apply_refresh(&refreshed, Utc::now());
        self.credential_store
            .save(&credential)
            .context("Failed to persist refreshed credentials")?;

        info!(
            user_id,
            issued_at = %refreshed.issued_at,
            expires_at = %credential.expires_at,
            "Spotify access token refreshed"
        );

        Ok(Some(credential.access_token))
    }
}
