// HTTP API: users, Spotify resources, OAuth flow

pub mod auth_middleware;
mod error;
pub mod oauth;
pub mod spotify;
pub mod users;

pub use auth_middleware::{require_api_key, ApiKeyState, API_KEY_HEADER};
pub use error::AppError;
pub use oauth::{create_oauth_router, OAuthAppState};
pub use spotify::{create_spotify_router, SpotifyAppState};
pub use users::{create_users_router, UsersAppState};
