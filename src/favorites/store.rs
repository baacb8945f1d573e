use anyhow::{Context, Result};
use rusqlite::params;

use super::{FavoriteEntry, FavoriteKind};
use crate::db::{self, SharedConnection};

/// Saved artists and tracks, one table per kind.
pub struct FavoriteStore {
    conn: SharedConnection,
}

impl FavoriteStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Inserts the favorite unless `(user_id, spotify_id)` is already saved,
    /// then returns the stored row. A re-save keeps the original name.
    pub fn get_or_create(
        &self,
        kind: FavoriteKind,
        user_id: i64,
        spotify_id: &str,
        name: &str,
    ) -> Result<FavoriteEntry> {
        let table = kind.table();
        let conn = db::lock(&self.conn)?;

        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, spotify_id, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, spotify_id) DO NOTHING",
                table
            ),
            params![user_id, spotify_id, name],
        )
        .with_context(|| format!("Failed to insert into {}", table))?;

        conn.query_row(
            &format!(
                "SELECT user_id, spotify_id, name FROM {} WHERE user_id = ?1 AND spotify_id = ?2",
                table
            ),
            params![user_id, spotify_id],
            |row| {
                Ok(FavoriteEntry {
                    user_id: row.get(0)?,
                    spotify_id: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .with_context(|| format!("Failed to read back from {}", table))
    }

    /// Favorites of one kind for a user, oldest first.
    pub fn list(&self, kind: FavoriteKind, user_id: i64) -> Result<Vec<FavoriteEntry>> {
        let table = kind.table();
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT user_id, spotify_id, name FROM {} WHERE user_id = ?1 ORDER BY id",
                table
            ))
            .context("Failed to prepare favorites query")?;

        let entries = stmt
            .query_map(params![user_id], |row| {
                Ok(FavoriteEntry {
                    user_id: row.get(0)?,
                    spotify_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })
            .context("Failed to query favorites")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read favorites")?;

        Ok(entries)
    }
}
