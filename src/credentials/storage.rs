//! Encrypted credential storage using SQLite.
//!
//! One row per user (`user_id` is the primary key). Access and refresh tokens
//! are sealed before they are written.

use super::{Credential, TokenCipher};
use crate::db::{self, SharedConnection};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// Credential storage backed by the shared SQLite connection.
///
/// # Schema
/// ```sql
/// CREATE TABLE credentials (
///     user_id       INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     access_token  TEXT NOT NULL,  -- sealed
///     refresh_token TEXT,           -- sealed (optional)
///     token_type    TEXT NOT NULL,
///     expires_in    INTEGER NOT NULL,
///     expires_at    TEXT NOT NULL,  -- RFC 3339
///     scope         TEXT NOT NULL,
///     created_at    TEXT NOT NULL,
///     updated_at    TEXT NOT NULL
/// );
/// ```
///
/// Concurrent refreshes for one user are not serialised: the last writer
/// wins and both token sets are valid at the provider.
pub struct CredentialStore {
    conn: SharedConnection,
    cipher: TokenCipher,
}

impl CredentialStore {
    pub fn new(conn: SharedConnection, cipher: TokenCipher) -> Self {
        Self { conn, cipher }
    }

    /// Stores a credential, creating or fully overwriting the user's row.
    ///
    /// # Returns
    /// * `Ok(())` - Credential stored
    /// * `Err` - Encryption failed, the user does not exist, or SQLite failed
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let access_token = self
            .cipher
            .seal(&credential.access_token)
            .context("Failed to encrypt access token")?;

        let refresh_token = credential
            .refresh_token
            .as_deref()
            .map(|token| self.cipher.seal(token))
            .transpose()
            .context("Failed to encrypt refresh token")?;

        let now = Utc::now().to_rfc3339();

        db::lock(&self.conn)?
            .execute(
                r#"
                INSERT INTO credentials (
                    user_id, access_token, refresh_token, token_type,
                    expires_in, expires_at, scope, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(user_id) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    token_type = excluded.token_type,
                    expires_in = excluded.expires_in,
                    expires_at = excluded.expires_at,
                    scope = excluded.scope,
                    updated_at = excluded.updated_at
                "#,
                params![
                    credential.user_id,
                    access_token,
                    refresh_token,
                    credential.token_type,
                    credential.expires_in,
                    credential.expires_at.to_rfc3339(),
                    credential.scope,
                    now,
                    now,
                ],
            )
            .context("Failed to store credentials")?;

        Ok(())
    }

    /// Retrieves and decrypts the credential for a user.
    ///
    /// # Returns
    /// * `Ok(Some(Credential))` - Found and decrypted
    /// * `Ok(None)` - The user never authorized
    /// * `Err` - Decryption or SQLite failure
    pub fn get(&self, user_id: i64) -> Result<Option<Credential>> {
        let row = db::lock(&self.conn)?
            .query_row(
                r#"
                SELECT access_token, refresh_token, token_type,
                       expires_in, expires_at, scope
                FROM credentials
                WHERE user_id = ?1
                "#,
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query credentials")?;

        let Some((access_token, refresh_token, token_type, expires_in, expires_at, scope)) = row
        else {
            return Ok(None);
        };

        let access_token = self
            .cipher
            .open(&access_token)
            .context("Failed to decrypt access token")?;

        let refresh_token = refresh_token
            .map(|sealed| self.cipher.open(&sealed))
            .transpose()
            .context("Failed to decrypt refresh token")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map(|dt| dt.with_timezone(&Utc))
            .context("Failed to parse expires_at timestamp")?;

        Ok(Some(Credential {
            user_id,
            access_token,
            refresh_token,
            token_type,
            expires_in,
            expires_at,
            scope,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::TokenResult;
    use chrono::Duration;

    fn setup() -> (SharedConnection, CredentialStore) {
        let conn = db::open(":memory:").unwrap();
        db::lock(&conn)
            .unwrap()
            .execute_batch(
                "INSERT INTO users (id, name, age) VALUES (1, 'One', 30);
                 INSERT INTO users (id, name, age) VALUES (2, 'Two', 40);",
            )
            .unwrap();
        let cipher = TokenCipher::from_key_bytes(&[0u8; 32]).unwrap();
        let store = CredentialStore::new(conn.clone(), cipher);
        (conn, store)
    }

    fn credential(user_id: i64, access: &str, refresh: Option<&str>) -> Credential {
        let token = TokenResult {
            access_token: access.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: refresh.map(|s| s.to_string()),
            scope: "user-follow-read".to_string(),
            issued_at: Utc::now(),
        };
        Credential::from_token(user_id, &token, Utc::now())
    }

    #[test]
    fn test_save_and_get() {
        let (_, store) = setup();
        let cred = credential(1, "access-1", Some("refresh-1"));

        store.save(&cred).unwrap();

        let fetched = store.get(1).unwrap().unwrap();
        assert_eq!(fetched.access_token, "access-1");
        assert_eq!(fetched.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(fetched.scope, "user-follow-read");
        // RFC 3339 keeps sub-second precision
        assert!((fetched.expires_at - cred.expires_at).num_milliseconds().abs() < 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let (_, store) = setup();
        assert!(store.get(1).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_single_row() {
        let (conn, store) = setup();
        store.save(&credential(1, "old", Some("r-old"))).unwrap();

        let mut replacement = credential(1, "new", None);
        replacement.expires_at = Utc::now() + Duration::hours(2);
        store.save(&replacement).unwrap();

        let fetched = store.get(1).unwrap().unwrap();
        assert_eq!(fetched.access_token, "new");
        assert!(fetched.refresh_token.is_none());

        let count: i64 = db::lock(&conn)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM credentials WHERE user_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_tokens_encrypted_at_rest() {
        let (conn, store) = setup();
        store.save(&credential(1, "plain-access", Some("plain-refresh"))).unwrap();

        let (access, refresh): (String, String) = db::lock(&conn)
            .unwrap()
            .query_row(
                "SELECT access_token, refresh_token FROM credentials WHERE user_id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert!(!access.contains("plain-access"));
        assert!(!refresh.contains("plain-refresh"));
    }

    #[test]
    fn test_users_are_isolated() {
        let (_, store) = setup();
        store.save(&credential(1, "a1", None)).unwrap();
        store.save(&credential(2, "a2", None)).unwrap();

        assert_eq!(store.get(1).unwrap().unwrap().access_token, "a1");
        assert_eq!(store.get(2).unwrap().unwrap().access_token, "a2");
    }

    #[test]
    fn test_save_for_unknown_user_fails() {
        let (_, store) = setup();
        assert!(store.save(&credential(99, "a", None)).is_err());
    }

    #[test]
    fn test_deleting_user_cascades() {
        let (conn, store) = setup();
        store.save(&credential(1, "a", None)).unwrap();

        db::lock(&conn)
            .unwrap()
            .execute("DELETE FROM users WHERE id = 1", [])
            .unwrap();

        assert!(store.get(1).unwrap().is_none());
    }

    #[test]
    fn test_wrong_key_cannot_read() {
        let (conn, store) = setup();
        store.save(&credential(1, "a", None)).unwrap();

        let other = CredentialStore::new(conn, TokenCipher::from_key_bytes(&[7u8; 32]).unwrap());
        assert!(other.get(1).is_err());
    }
}
