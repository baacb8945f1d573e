// Service configuration
pub mod config;

// SQLite connection and schema
pub mod db;

// User profiles
pub mod users;

// Encrypted OAuth credentials
pub mod credentials;

// Spotify OAuth flow, token guard and Web API client
pub mod spotify;

// Saved artists and tracks
pub mod favorites;

// HTTP API
pub mod api;

// Router wiring
pub mod app;
