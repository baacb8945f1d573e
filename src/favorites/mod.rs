//! Favorites: save an artist or track only once Spotify confirms it exists.

use serde::Serialize;
use std::sync::Arc;

use crate::spotify::{Artist, SpotifyClient, SpotifyError, Track};

mod store;

pub use store::FavoriteStore;

/// A saved artist or track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteEntry {
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub spotify_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Artist,
    Track,
}

impl FavoriteKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            FavoriteKind::Artist => "saved_artists",
            FavoriteKind::Track => "saved_tracks",
        }
    }
}

/// Composes provider search with local persistence.
pub struct FavoritesService {
    client: Arc<SpotifyClient>,
    store: Arc<FavoriteStore>,
}

impl FavoritesService {
    pub fn new(client: Arc<SpotifyClient>, store: Arc<FavoriteStore>) -> Self {
        Self { client, store }
    }

    /// Best match for `name`, or None when the search comes back empty.
    ///
    /// A missing token is an error, not None: callers render it as 401.
    pub async fn find_artist_to_save(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Artist>, SpotifyError> {
        let artists = self.client.search_artists(user_id, name, 1).await?;
        Ok(artists.into_iter().next())
    }

    pub fn save_artist(&self, user_id: i64, artist: &Artist) -> anyhow::Result<FavoriteEntry> {
        self.store
            .get_or_create(FavoriteKind::Artist, user_id, &artist.id, &artist.name)
    }

    pub async fn find_track_to_save(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Track>, SpotifyError> {
        let tracks = self.client.search_tracks(user_id, name, 1).await?;
        Ok(tracks.into_iter().next())
    }

    pub fn save_track(&self, user_id: i64, track: &Track) -> anyhow::Result<FavoriteEntry> {
        self.store
            .get_or_create(FavoriteKind::Track, user_id, &track.id, &track.name)
    }

    pub fn list(&self, kind: FavoriteKind, user_id: i64) -> anyhow::Result<Vec<FavoriteEntry>> {
        self.store.list(kind, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpotifyConfig;
    use crate::credentials::{Credential, CredentialStore, TokenCipher};
    use crate::db;
    use crate::spotify::{OAuthFlow, TokenGuard};
    use chrono::{Duration, Utc};
    use mockito::{Matcher, Server};

    fn make_service(api_base_url: String, with_token: bool) -> FavoritesService {
        let conn = db::open(":memory:").unwrap();
        db::lock(&conn)
            .unwrap()
            .execute("INSERT INTO users (id, name, age) VALUES (1, 'One', 30)", [])
            .unwrap();

        let credentials = Arc::new(CredentialStore::new(
            conn.clone(),
            TokenCipher::from_key_bytes(&[3u8; 32]).unwrap(),
        ));
        if with_token {
            credentials
                .save(&Credential {
                    user_id: 1,
                    access_token: "A1".to_string(),
                    refresh_token: None,
                    token_type: "Bearer".to_string(),
                    expires_in: 3600,
                    expires_at: Utc::now() + Duration::hours(1),
                    scope: String::new(),
                })
                .unwrap();
        }

        let config = SpotifyConfig {
            api_base_url,
            ..SpotifyConfig::default()
        };
        let oauth = Arc::new(OAuthFlow::new(&config).unwrap());
        let guard = Arc::new(TokenGuard::new(credentials, oauth, 60));
        let client = Arc::new(SpotifyClient::new(&config, guard).unwrap());

        FavoritesService::new(client, Arc::new(FavoriteStore::new(conn)))
    }

    #[tokio::test]
    async fn test_find_artist_empty_search_returns_none() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "artist".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"artists":{"items":[]}}"#)
            .create_async()
            .await;

        let service = make_service(server.url(), true);
        let found = service.find_artist_to_save(1, "nobody").await.unwrap();

        assert!(found.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_without_token_is_error() {
        let service = make_service("http://127.0.0.1:9".to_string(), false);
        let err = service.find_track_to_save(1, "song").await.unwrap_err();
        assert!(matches!(err, SpotifyError::NoValidToken));
    }

    #[tokio::test]
    async fn test_find_and_save_track_twice() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("type".into(), "track".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"tracks":{"items":[{
                    "id": "t1", "name": "Idioteque", "duration_ms": 309000,
                    "explicit": false, "artists": [],
                    "album": {"name": "Kid A"},
                    "href": "https://api.spotify.com/v1/tracks/t1",
                    "uri": "spotify:track:t1"
                }]}}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let service = make_service(server.url(), true);

        let track = service.find_track_to_save(1, "idioteque").await.unwrap().unwrap();
        let first = service.save_track(1, &track).unwrap();
        let track = service.find_track_to_save(1, "idioteque").await.unwrap().unwrap();
        let second = service.save_track(1, &track).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.spotify_id, "t1");
        assert_eq!(service.list(FavoriteKind::Track, 1).unwrap().len(), 1);
    }
}
