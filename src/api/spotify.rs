//! Spotify resource endpoints acting on behalf of a stored user.

use super::error::AppError;
use crate::spotify::{Artist, FollowTarget, FollowingStatus, SpotifyClient, Track};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Shared application state for the Spotify API
pub struct SpotifyAppState {
    pub client: Arc<SpotifyClient>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    user_id: Option<i64>,
    q: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FollowQuery {
    user_id: Option<i64>,
    #[serde(rename = "type")]
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContainsQuery {
    user_id: Option<i64>,
    #[serde(rename = "type")]
    target: Option<String>,
    ids: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FollowedArtistsResponse {
    count: usize,
    items: Vec<Artist>,
}

/// Create Spotify API router
pub fn create_spotify_router(state: SpotifyAppState) -> Router {
    Router::new()
        .route("/spotify/search/artist", get(search_artists))
        .route("/spotify/search/track", get(search_tracks))
        .route("/spotify/me/following", put(follow))
        .route("/spotify/me/following/artists", get(followed_artists))
        .route("/spotify/me/following/contains", get(check_following))
        .with_state(Arc::new(state))
}

fn require_user_id(user_id: Option<i64>) -> Result<i64, AppError> {
    user_id.ok_or_else(|| AppError::BadRequest("Missing 'user_id' parameter".to_string()))
}

fn parse_target(raw: Option<&str>) -> Result<FollowTarget, AppError> {
    raw.ok_or_else(|| AppError::BadRequest("Missing 'type' parameter".to_string()))?
        .parse()
        .map_err(AppError::BadRequest)
}

/// Validated `(user_id, q, limit)` for both search endpoints.
fn search_params(query: SearchQuery) -> Result<(i64, String, u32), AppError> {
    let user_id = require_user_id(query.user_id)?;
    let q = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'q' parameter".to_string()))?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 50);
    Ok((user_id, q, limit))
}

/// Split `a,b,,c` into trimmed, non-empty ids.
fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET /spotify/search/artist?user_id&q[&limit]
async fn search_artists(
    State(state): State<Arc<SpotifyAppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Artist>>, AppError> {
    let Query(query) = query?;
    let (user_id, q, limit) = search_params(query)?;
    debug!(user_id, q = %q, limit, "Artist search");
    let artists = state.client.search_artists(user_id, &q, limit).await?;
    Ok(Json(artists))
}

/// GET /spotify/search/track?user_id&q[&limit]
async fn search_tracks(
    State(state): State<Arc<SpotifyAppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Track>>, AppError> {
    let Query(query) = query?;
    let (user_id, q, limit) = search_params(query)?;
    debug!(user_id, q = %q, limit, "Track search");
    let tracks = state.client.search_tracks(user_id, &q, limit).await?;
    Ok(Json(tracks))
}

/// PUT /spotify/me/following?user_id&type  body: {"ids": [...]}
async fn follow(
    State(state): State<Arc<SpotifyAppState>>,
    query: Result<Query<FollowQuery>, QueryRejection>,
    body: Result<Json<FollowRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let user_id = require_user_id(query.user_id)?;
    let target = parse_target(query.target.as_deref())?;
    let Json(body) = body?;
    let ids: Vec<String> = body
        .ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(AppError::BadRequest("'ids' cannot be empty".to_string()));
    }

    state.client.follow(user_id, &ids, target).await?;

    Ok(Json(json!({
        "message": format!("Successfully followed {} {}(s)", ids.len(), target)
    })))
}

/// GET /spotify/me/following/artists?user_id
async fn followed_artists(
    State(state): State<Arc<SpotifyAppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<FollowedArtistsResponse>, AppError> {
    let Query(query) = query?;
    let user_id = require_user_id(query.user_id)?;
    let items = state.client.followed_artists(user_id).await?;
    Ok(Json(FollowedArtistsResponse {
        count: items.len(),
        items,
    }))
}

/// GET /spotify/me/following/contains?user_id&type&ids=a,b
async fn check_following(
    State(state): State<Arc<SpotifyAppState>>,
    query: Result<Query<ContainsQuery>, QueryRejection>,
) -> Result<Json<Vec<FollowingStatus>>, AppError> {
    let Query(query) = query?;
    let user_id = require_user_id(query.user_id)?;
    let target = parse_target(query.target.as_deref())?;
    let ids = split_ids(query.ids.as_deref().unwrap_or_default());
    if ids.is_empty() {
        return Err(AppError::BadRequest("Missing 'ids' parameter".to_string()));
    }

    let statuses = state.client.check_following(user_id, &ids, target).await?;
    Ok(Json(statuses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_deserialization() {
        let query: SearchQuery = serde_urlencoded::from_str("user_id=3&q=daft+punk").unwrap();
        let (user_id, q, limit) = search_params(query).unwrap();
        assert_eq!(user_id, 3);
        assert_eq!(q, "daft punk");
        assert_eq!(limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_search_limit_clamped() {
        let query: SearchQuery =
            serde_urlencoded::from_str("user_id=3&q=x&limit=0").unwrap();
        assert_eq!(search_params(query).unwrap().2, 1);

        let query: SearchQuery =
            serde_urlencoded::from_str("user_id=3&q=x&limit=99").unwrap();
        assert_eq!(search_params(query).unwrap().2, 50);
    }

    #[test]
    fn test_search_requires_user_and_query() {
        let query: SearchQuery = serde_urlencoded::from_str("q=x").unwrap();
        assert!(matches!(search_params(query), Err(AppError::BadRequest(_))));

        let query: SearchQuery = serde_urlencoded::from_str("user_id=1&q=%20%20").unwrap();
        assert!(matches!(search_params(query), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_follow_query_type_rename() {
        let query: FollowQuery = serde_urlencoded::from_str("user_id=1&type=user").unwrap();
        assert_eq!(
            parse_target(query.target.as_deref()).unwrap(),
            FollowTarget::User
        );
    }

    #[test]
    fn test_parse_target_rejects_unknown() {
        assert!(matches!(
            parse_target(Some("playlist")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(parse_target(None), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_follow_request_without_ids_defaults_empty() {
        let body: FollowRequest = serde_json::from_str("{}").unwrap();
        assert!(body.ids.is_empty());
    }

    #[test]
    fn test_split_ids() {
        assert_eq!(split_ids("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_ids(" , ").is_empty());
    }
}
