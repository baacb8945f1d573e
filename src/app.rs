//! Component wiring shared by the binary and the router tests.

use crate::api::{
    create_oauth_router, create_spotify_router, create_users_router, require_api_key,
    ApiKeyState, OAuthAppState, SpotifyAppState, UsersAppState,
};
use crate::config::AppConfig;
use crate::credentials::{CredentialStore, TokenCipher};
use crate::db::SharedConnection;
use crate::favorites::{FavoriteStore, FavoritesService};
use crate::spotify::{OAuthFlow, SpotifyClient, TokenGuard};
use crate::users::UserStore;
use anyhow::Result;
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Build the full HTTP router over an open database.
///
/// OAuth routes are mounted without the API-key layer; user and Spotify
/// resource routes sit behind it.
pub fn build_router(config: &AppConfig, conn: SharedConnection, cipher: TokenCipher) -> Result<Router> {
    let user_store = Arc::new(UserStore::new(conn.clone()));
    let credential_store = Arc::new(CredentialStore::new(conn.clone(), cipher));
    let favorite_store = Arc::new(FavoriteStore::new(conn));

    let oauth = Arc::new(OAuthFlow::new(&config.spotify)?);
    let guard = Arc::new(TokenGuard::new(
        Arc::clone(&credential_store),
        Arc::clone(&oauth),
        config.spotify.expiry_margin_seconds,
    ));
    let client = Arc::new(SpotifyClient::new(&config.spotify, guard)?);
    let favorites = Arc::new(FavoritesService::new(Arc::clone(&client), favorite_store));

    let api_key = ApiKeyState::new(config.server.api_key.clone());
    if api_key.enabled() {
        info!("API key check enabled");
    } else {
        warn!("No API key configured, user and Spotify routes are open");
    }

    let users_router = create_users_router(UsersAppState {
        user_store: Arc::clone(&user_store),
        favorites,
    })
    .route_layer(middleware::from_fn_with_state(api_key.clone(), require_api_key));

    let spotify_router = create_spotify_router(SpotifyAppState { client })
        .route_layer(middleware::from_fn_with_state(api_key, require_api_key));

    let oauth_router = create_oauth_router(OAuthAppState {
        oauth,
        user_store,
        credential_store,
    });

    Ok(Router::new()
        .merge(users_router)
        .merge(spotify_router)
        .merge(oauth_router)
        .layer(CorsLayer::permissive()))
}
