//! Spotify Web API payloads.

use serde::{Deserialize, Serialize};

/// Artist as returned by search and following endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub href: String,
    pub uri: String,
}

/// Track as returned by search.
///
/// Artists nested in a track are the simplified form (no genres/popularity).
/// The album is flattened to its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackPayload")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub popularity: Option<u32>,
    pub duration_ms: u64,
    pub explicit: bool,
    pub artists: Vec<Artist>,
    pub album_name: String,
    pub href: String,
    pub uri: String,
}

#[derive(Deserialize)]
struct AlbumRef {
    name: String,
}

#[derive(Deserialize)]
struct TrackPayload {
    id: String,
    name: String,
    #[serde(default)]
    popularity: Option<u32>,
    duration_ms: u64,
    explicit: bool,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    album: Option<AlbumRef>,
    href: String,
    uri: String,
}

impl From<TrackPayload> for Track {
    fn from(p: TrackPayload) -> Self {
        Self {
            id: p.id,
            name: p.name,
            popularity: p.popularity,
            duration_ms: p.duration_ms,
            explicit: p.explicit,
            artists: p.artists,
            album_name: p.album.map(|a| a.name).unwrap_or_default(),
            href: p.href,
            uri: p.uri,
        }
    }
}

/// Paging container (`{"items": [...]}`); other paging fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistSearchResponse {
    pub artists: Page<Artist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackSearchResponse {
    pub tracks: Page<Track>,
}

/// `GET /me/following?type=artist` wraps its cursor page in `artists`.
#[derive(Debug, Deserialize)]
pub(crate) struct FollowedArtistsResponse {
    pub artists: Page<Artist>,
}

/// What `/me/following` operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowTarget {
    Artist,
    User,
}

impl FollowTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowTarget::Artist => "artist",
            FollowTarget::User => "user",
        }
    }
}

impl std::str::FromStr for FollowTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(FollowTarget::Artist),
            "user" => Ok(FollowTarget::User),
            other => Err(format!("Invalid type '{}' (expected 'artist' or 'user')", other)),
        }
    }
}

impl std::fmt::Display for FollowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Following status for one requested id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowingStatus {
    pub id: String,
    pub is_following: bool,
}
