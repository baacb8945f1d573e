//! User profile CRUD and favorites.

use super::error::AppError;
use crate::favorites::{FavoriteEntry, FavoriteKind, FavoritesService};
use crate::users::{User, UserInput, UserStore};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state for the users API
pub struct UsersAppState {
    pub user_store: Arc<UserStore>,
    pub favorites: Arc<FavoritesService>,
}

/// User with their saved favorites
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    user: User,
    favorite_artists: Vec<FavoriteEntry>,
    favorite_tracks: Vec<FavoriteEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistNameQuery {
    artist_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackNameQuery {
    track_name: Option<String>,
}

/// Create users API router
pub fn create_users_router(state: UsersAppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/favorites/artists", post(add_favorite_artist))
        .route("/users/:id/favorites/tracks", post(add_favorite_track))
        .with_state(Arc::new(state))
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn required_name(raw: Option<String>, param: &str) -> Result<String, AppError> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing '{}' parameter", param)))
}

/// GET /users
async fn list_users(
    State(state): State<Arc<UsersAppState>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.user_store.list()?))
}

/// POST /users
async fn create_user(
    State(state): State<Arc<UsersAppState>>,
    input: Result<Json<UserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(input) = input?;
    let input = input.normalize()?;
    let user = state.user_store.create(&input)?;
    info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/:id
async fn get_user(
    State(state): State<Arc<UsersAppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserDetail>, AppError> {
    let Path(id) = id?;
    let user = state.user_store.get(id)?.ok_or_else(user_not_found)?;
    Ok(Json(UserDetail {
        favorite_artists: state.favorites.list(FavoriteKind::Artist, id)?,
        favorite_tracks: state.favorites.list(FavoriteKind::Track, id)?,
        user,
    }))
}

/// PUT /users/:id
async fn update_user(
    State(state): State<Arc<UsersAppState>>,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let input = input.normalize()?;
    let user = state
        .user_store
        .update(id, &input)?
        .ok_or_else(user_not_found)?;
    info!(user_id = id, "User updated");
    Ok(Json(user))
}

/// DELETE /users/:id
async fn delete_user(
    State(state): State<Arc<UsersAppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    if !state.user_store.delete(id)? {
        return Err(user_not_found());
    }
    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/:id/favorites/artists?artist_name=
///
/// Saves the top search match. Re-saving an artist returns the stored entry.
async fn add_favorite_artist(
    State(state): State<Arc<UsersAppState>>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<ArtistNameQuery>, QueryRejection>,
) -> Result<Json<FavoriteEntry>, AppError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let artist_name = required_name(query.artist_name, "artist_name")?;
    if !state.user_store.exists(id)? {
        return Err(user_not_found());
    }

    let artist = state
        .favorites
        .find_artist_to_save(id, &artist_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Artist not found on Spotify".to_string()))?;

    let entry = state.favorites.save_artist(id, &artist)?;
    info!(user_id = id, spotify_id = %entry.spotify_id, "Favorite artist saved");
    Ok(Json(entry))
}

/// POST /users/:id/favorites/tracks?track_name=
async fn add_favorite_track(
    State(state): State<Arc<UsersAppState>>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<TrackNameQuery>, QueryRejection>,
) -> Result<Json<FavoriteEntry>, AppError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let track_name = required_name(query.track_name, "track_name")?;
    if !state.user_store.exists(id)? {
        return Err(user_not_found());
    }

    let track = state
        .favorites
        .find_track_to_save(id, &track_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Track not found on Spotify".to_string()))?;

    let entry = state.favorites.save_track(id, &track)?;
    info!(user_id = id, spotify_id = %entry.spotify_id, "Favorite track saved");
    Ok(Json(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_name() {
        assert_eq!(
            required_name(Some("  Daft Punk ".to_string()), "artist_name").unwrap(),
            "Daft Punk"
        );
        assert!(matches!(
            required_name(Some("   ".to_string()), "artist_name"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            required_name(None, "track_name"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_user_detail_serialization() {
        let detail = UserDetail {
            user: User {
                id: 1,
                name: "Ada Lovelace".to_string(),
                age: 36,
                music_preferences: vec!["baroque".to_string()],
            },
            favorite_artists: vec![FavoriteEntry {
                user_id: 1,
                spotify_id: "a1".to_string(),
                name: "Bach".to_string(),
            }],
            favorite_tracks: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Ada Lovelace");
        assert_eq!(
            json["favorite_artists"][0],
            serde_json::json!({"spotify_id": "a1", "name": "Bach"})
        );
        assert!(json["favorite_tracks"].as_array().unwrap().is_empty());
    }
}
