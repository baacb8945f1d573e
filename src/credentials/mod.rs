//! Per-user Spotify credentials.
//!
//! Each user has at most one [`Credential`] row. It is created when the OAuth
//! callback succeeds, overwritten in place on every refresh and removed only
//! when the owning user is deleted.
//!
//! # Lifecycle
//!
//! ```text
//! UNAUTHENTICATED --callback--> VALID --expiry--> STALE --refresh ok--> VALID
//!                                                   |
//!                                                   +--refresh fails / no refresh token--> UNUSABLE
//! ```
//!
//! UNUSABLE is left only by running the full authorize flow again.
//!
//! Access and refresh tokens are sealed with AES-256-GCM before they reach
//! SQLite; see [`TokenCipher`].

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

mod encryption;
mod storage;

pub use encryption::TokenCipher;
pub use storage::CredentialStore;

/// Token set returned by the provider's token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds, relative to issuance
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    /// When this token set was received
    #[serde(skip, default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Stored OAuth credential for one user.
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    /// Space-delimited granted scopes
    pub scope: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Credential {
    /// Builds a fresh credential from a code-exchange result.
    ///
    /// `expires_at` is computed from `now`, not from `token.issued_at`.
    /// An out-of-range `expires_in` yields a credential that is already stale.
    pub fn from_token(user_id: i64, token: &TokenResult, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
            expires_at: expiry_after(now, token.expires_in),
            scope: token.scope.clone(),
        }
    }

    /// True once `now` is within `margin_seconds` of `expires_at` (or past it).
    pub fn is_expired(&self, margin_seconds: i64, now: DateTime<Utc>) -> bool {
        let threshold = Duration::try_seconds(margin_seconds)
            .and_then(|margin| self.expires_at.checked_sub_signed(margin))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        now > threshold
    }

    /// Overwrites token fields with a refresh result.
    ///
    /// The refresh token is replaced only when the provider sent a new one,
    /// and the scope only when it is non-empty.
    pub fn apply_refresh(&mut self, token: &TokenResult, now: DateTime<Utc>) {
        self.access_token = token.access_token.clone();
        self.token_type = token.token_type.clone();
        self.expires_in = token.expires_in;
        self.expires_at = expiry_after(now, token.expires_in);
        if let Some(refresh_token) = &token.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
        if !token.scope.is_empty() {
            self.scope = token.scope.clone();
        }
    }
}

/// `now + expires_in` seconds, falling back to `now` when the sum is out of range.
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now)
}
