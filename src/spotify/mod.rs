//! Spotify integration: OAuth flow, token lifecycle and Web API client.
//!
//! ```text
//! SpotifyClient ──> TokenGuard ──> CredentialStore
//!                       │
//!                       └──> OAuthFlow (refresh) ──> token endpoint
//! ```
//!
//! Expected authentication failures surface as [`SpotifyError`] variants, never
//! as panics or opaque errors, so the HTTP layer can tell "needs login" apart
//! from a provider outage.

mod auth;
mod client;
mod guard;
mod types;

pub use auth::OAuthFlow;
pub use client::SpotifyClient;
pub use guard::TokenGuard;
pub use types::{Artist, FollowTarget, FollowingStatus, Track};

/// Outcome of a failed provider operation.
#[derive(Debug)]
pub enum SpotifyError {
    /// User never authorized, or the stored token could not be refreshed
    NoValidToken,
    /// Spotify answered 401 despite a locally valid token (revoked, clock skew)
    TokenRejected,
    /// Timeout, non-2xx status or unreadable response
    Transport(anyhow::Error),
}

impl SpotifyError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SpotifyError::NoValidToken => "no_valid_token",
            SpotifyError::TokenRejected => "token_expired_or_invalid",
            SpotifyError::Transport(_) => "transport_failure",
        }
    }
}

impl std::fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotifyError::NoValidToken => write!(f, "No valid Spotify token for user"),
            SpotifyError::TokenRejected => write!(f, "Spotify rejected the access token"),
            SpotifyError::Transport(e) => write!(f, "Spotify request failed: {:#}", e),
        }
    }
}

impl std::error::Error for SpotifyError {}

impl From<anyhow::Error> for SpotifyError {
    fn from(e: anyhow::Error) -> Self {
        SpotifyError::Transport(e)
    }
}

impl From<reqwest::Error> for SpotifyError {
    fn from(e: reqwest::Error) -> Self {
        SpotifyError::Transport(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SpotifyError::NoValidToken.code(), "no_valid_token");
        assert_eq!(SpotifyError::TokenRejected.code(), "token_expired_or_invalid");
        assert_eq!(
            SpotifyError::Transport(anyhow::anyhow!("boom")).code(),
            "transport_failure"
        );
    }

    #[test]
    fn test_transport_display_includes_cause() {
        let err = SpotifyError::from(anyhow::anyhow!("connection reset"));
        assert!(err.to_string().contains("connection reset"));
    }
}
