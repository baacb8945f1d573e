//! Shared SQLite connection and schema.
//!
//! All stores share one connection so that foreign keys (and `:memory:`
//! databases in tests) span users, credentials and favorites.

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedConnection = Arc<Mutex<Connection>>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        name              TEXT NOT NULL,
        age               INTEGER NOT NULL CHECK (age > 18 AND age < 120),
        music_preferences TEXT NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS credentials (
        user_id       INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        access_token  TEXT NOT NULL,  -- sealed
        refresh_token TEXT,           -- sealed (optional)
        token_type    TEXT NOT NULL,
        expires_in    INTEGER NOT NULL,
        expires_at    TEXT NOT NULL,  -- RFC 3339
        scope         TEXT NOT NULL,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS saved_artists (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        spotify_id TEXT NOT NULL,
        name       TEXT NOT NULL,
        UNIQUE(user_id, spotify_id)
    );

    CREATE TABLE IF NOT EXISTS saved_tracks (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        spotify_id TEXT NOT NULL,
        name       TEXT NOT NULL,
        UNIQUE(user_id, spotify_id)
    );
"#;

/// Opens (or creates) the database and ensures every table exists.
pub fn open(db_path: &str) -> Result<SharedConnection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("Failed to enable foreign keys")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to create schema")?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection, turning a poisoned lock into an error.
pub fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| anyhow!("Database connection lock poisoned"))
}
