//! User persistence using SQLite.
//!
//! `music_preferences` is stored as a JSON array string.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{User, UserInput};
use crate::db::{self, SharedConnection};

/// Persists user profiles.
pub struct UserStore {
    conn: SharedConnection,
}

impl UserStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Inserts a new user. The input must already be normalised.
    pub fn create(&self, input: &UserInput) -> Result<User> {
        let prefs = serde_json::to_string(&input.music_preferences)
            .context("Failed to encode music preferences")?;

        let conn = db::lock(&self.conn)?;
        conn.execute(
            "INSERT INTO users (name, age, music_preferences) VALUES (?1, ?2, ?3)",
            params![input.name, input.age, prefs],
        )
        .context("Failed to insert user")?;

        Ok(User {
            id: conn.last_insert_rowid(),
            name: input.name.clone(),
            age: input.age,
            music_preferences: input.music_preferences.clone(),
        })
    }

    /// Returns the user with `id`, or None.
    pub fn get(&self, id: i64) -> Result<Option<User>> {
        let conn = db::lock(&self.conn)?;
        let raw = conn
            .query_row(
                "SELECT id, name, age, music_preferences FROM users WHERE id = ?1",
                params![id],
                read_row,
            )
            .optional()
            .context("Failed to query user")?;

        raw.map(RawUser::into_user).transpose()
    }

    /// Returns true if a user with `id` exists.
    pub fn exists(&self, id: i64) -> Result<bool> {
        let conn = db::lock(&self.conn)?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |row| row.get(0))
            .optional()
            .context("Failed to query user")?;
        Ok(found.is_some())
    }

    /// Returns all users ordered by id.
    pub fn list(&self) -> Result<Vec<User>> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn
            .prepare("SELECT id, name, age, music_preferences FROM users ORDER BY id")
            .context("Failed to prepare list query")?;

        let rows = stmt
            .query_map([], read_row)
            .context("Failed to query users")?
            .collect::<Result<Vec<RawUser>, _>>()
            .context("Failed to read users")?;

        rows.into_iter().map(RawUser::into_user).collect()
    }

    /// Replaces every field of an existing user. Returns None if absent.
    pub fn update(&self, id: i64, input: &UserInput) -> Result<Option<User>> {
        let prefs = serde_json::to_string(&input.music_preferences)
            .context("Failed to encode music preferences")?;

        let conn = db::lock(&self.conn)?;
        let updated = conn
            .execute(
                "UPDATE users SET name = ?1, age = ?2, music_preferences = ?3 WHERE id = ?4",
                params![input.name, input.age, prefs, id],
            )
            .context("Failed to update user")?;

        if updated == 0 {
            return Ok(None);
        }

        Ok(Some(User {
            id,
            name: input.name.clone(),
            age: input.age,
            music_preferences: input.music_preferences.clone(),
        }))
    }

    /// Deletes a user (credentials and favorites cascade).
    ///
    /// Returns `Ok(false)` when no such user existed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = db::lock(&self.conn)?;
        let deleted = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .context("Failed to delete user")?;
        Ok(deleted > 0)
    }
}

struct RawUser {
    id: i64,
    name: String,
    age: i64,
    music_preferences: String,
}

impl RawUser {
    fn into_user(self) -> Result<User> {
        let music_preferences = serde_json::from_str(&self.music_preferences)
            .with_context(|| format!("Corrupt music_preferences for user {}", self.id))?;
        Ok(User {
            id: self.id,
            name: self.name,
            age: self.age,
            music_preferences,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        music_preferences: row.get(3)?,
    })
}
