use super::guard::TokenGuard;
use super::types::{
    Artist, ArtistSearchResponse, FollowTarget, FollowedArtistsResponse, FollowingStatus, Track,
    TrackSearchResponse,
};
use super::SpotifyError;
use crate::config::SpotifyConfig;
use anyhow::{anyhow, Context};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Ids per `/me/following/contains` request (provider limit).
const CONTAINS_CHUNK_SIZE: usize = 50;

/// Page size for followed artists.
const FOLLOWED_ARTISTS_LIMIT: u32 = 20;

/// Spotify Web API client acting on behalf of a stored user.
///
/// Every call first asks the [`TokenGuard`] for a usable token and
/// short-circuits with [`SpotifyError::NoValidToken`] without touching the
/// network when there is none.
pub struct SpotifyClient {
    http_client: Client,
    base_url: String,
    guard: Arc<TokenGuard>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig, guard: Arc<TokenGuard>) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build Spotify HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            guard,
        })
    }

    /// Search artists by free text. `limit` is clamped to 1..=50.
    pub async fn search_artists(
        &self,
        user_id: i64,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Artist>, SpotifyError> {
        let response: ArtistSearchResponse = self.search(user_id, query, "artist", limit).await?;
        Ok(response.artists.items)
    }

    /// Search tracks by free text. `limit` is clamped to 1..=50.
    pub async fn search_tracks(
        &self,
        user_id: i64,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, SpotifyError> {
        let response: TrackSearchResponse = self.search(user_id, query, "track", limit).await?;
        Ok(response.tracks.items)
    }

    /// Follow artists or users. Spotify answers 204 (sometimes 200) with no body.
    pub async fn follow(
        &self,
        user_id: i64,
        ids: &[String],
        target: FollowTarget,
    ) -> Result<(), SpotifyError> {
        let token = self.token(user_id).await?;
        let url = format!("{}/me/following", self.base_url);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&token)
            .query(&[("type", target.as_str())])
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .context("Failed to send follow request")?;

        check_response_status(&response)?;
        debug!(user_id, count = ids.len(), target = %target, "Followed on Spotify");
        Ok(())
    }

    /// Artists the user follows (first page).
    pub async fn followed_artists(&self, user_id: i64) -> Result<Vec<Artist>, SpotifyError> {
        let limit = FOLLOWED_ARTISTS_LIMIT.to_string();
        let response: FollowedArtistsResponse = self
            .get_json(
                user_id,
                "/me/following",
                &[("type", "artist"), ("limit", limit.as_str())],
            )
            .await?;
        Ok(response.artists.items)
    }

    /// Whether the user follows each id, in request order.
    ///
    /// Ids are sent in chunks of 50. A response whose length does not match
    /// its chunk is treated as a transport failure.
    pub async fn check_following(
        &self,
        user_id: i64,
        ids: &[String],
        target: FollowTarget,
    ) -> Result<Vec<FollowingStatus>, SpotifyError> {
        let mut statuses = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(CONTAINS_CHUNK_SIZE) {
            let joined = chunk.join(",");
            let flags: Vec<bool> = self
                .get_json(
                    user_id,
                    "/me/following/contains",
                    &[("type", target.as_str()), ("ids", joined.as_str())],
                )
                .await?;

            if flags.len() != chunk.len() {
                return Err(SpotifyError::Transport(anyhow!(
                    "Following check returned {} results for {} ids",
                    flags.len(),
                    chunk.len()
                )));
            }

            statuses.extend(chunk.iter().zip(flags).map(|(id, is_following)| {
                FollowingStatus {
                    id: id.clone(),
                    is_following,
                }
            }));
        }

        Ok(statuses)
    }

    async fn search<T: DeserializeOwned>(
        &self,
        user_id: i64,
        query: &str,
        kind: &str,
        limit: u32,
    ) -> Result<T, SpotifyError> {
        let limit = limit.clamp(1, 50).to_string();
        self.get_json(
            user_id,
            "/search",
            &[("q", query), ("type", kind), ("limit", limit.as_str())],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        user_id: i64,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SpotifyError> {
        let token = self.token(user_id).await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        check_response_status(&response)?;

        let body = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))?;
        Ok(body)
    }

    async fn token(&self, user_id: i64) -> Result<String, SpotifyError> {
        match self.guard.ensure_valid_token(user_id).await? {
            Some(token) => Ok(token),
            None => Err(SpotifyError::NoValidToken),
        }
    }
}

/// 401 means the provider rejected a token we believed valid; anything else
/// non-2xx is a transport failure.
fn check_response_status(response: &reqwest::Response) -> Result<(), SpotifyError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => {
            warn!(url = %response.url().path(), "Spotify rejected access token");
            Err(SpotifyError::TokenRejected)
        }
        s if !s.is_success() => Err(SpotifyError::Transport(anyhow!(
            "Spotify API error: {}",
            s
        ))),
        _ => Ok(()),
    }
}
