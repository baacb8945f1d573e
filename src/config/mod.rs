use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Expected `x-api-key` header value. None = gatekeeping disabled (dev mode).
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_key: None,
        }
    }
}

/// SQLite configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "tuneshelf.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Spotify OAuth client and Web API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Space-delimited scopes requested on every authorize redirect
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Tokens within this many seconds of expiry are treated as expired
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin_seconds: i64,
}

fn default_redirect_uri() -> String {
    "http://localhost:8000/users/auth/callback".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.spotify.com/authorize".to_string()
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_scopes() -> String {
    "user-read-private user-read-email user-follow-read user-follow-modify".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_expiry_margin() -> i64 {
    60
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            scopes: default_scopes(),
            request_timeout_seconds: default_request_timeout(),
            expiry_margin_seconds: default_expiry_margin(),
        }
    }
}

impl AppConfig {
    /// Load from `TUNESHELF_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("TUNESHELF_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay `TUNESHELF_*` environment variables onto the loaded config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TUNESHELF_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Ok(v) = std::env::var("TUNESHELF_API_KEY") {
            if !v.is_empty() {
                self.server.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("TUNESHELF_DB_PATH") {
            self.database.path = v;
        }
        if let Ok(v) = std::env::var("TUNESHELF_SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = v;
        }
        if let Ok(v) = std::env::var("TUNESHELF_SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = v;
        }
        if let Ok(v) = std::env::var("TUNESHELF_SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("TUNESHELF_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.spotify.request_timeout_seconds = n;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: AppConfig = toml::from_str(&contents).context("Failed to parse config file")?;
    Ok(config)
}
