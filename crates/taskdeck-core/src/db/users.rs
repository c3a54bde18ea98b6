//! Owner and API token operations

use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::info;

use super::{new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::*;

/// Prefix on every issued token secret
const TOKEN_PREFIX: &str = "tdk_";

/// SHA-256 hex digest of a token secret (the only form that is stored)
pub fn hash_token(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&created_at),
    })
}

fn token_from_row(row: &Row) -> rusqlite::Result<ApiToken> {
    let created_at: String = row.get(3)?;
    let last_used_at: Option<String> = row.get(4)?;
    Ok(ApiToken {
        id: row.get(0)?,
        user_id: row.get(1)?,
        label: row.get(2)?,
        created_at: parse_datetime(&created_at),
        last_used_at: last_used_at.as_deref().map(parse_datetime),
    })
}

impl Database {
    /// Create a new owner
    pub fn create_user(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("User name cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO users (id, name) VALUES (?, ?)",
            params![id, name],
        )
        .map_err(|e| {
            if Error::is_unique_violation(&e) {
                Error::Conflict(format!("User '{}' already exists", name))
            } else {
                Error::Database(e)
            }
        })?;

        info!(user = %name, "Created user");
        self.get_user(&id)?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
    }

    /// Get an owner by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE id = ?",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get an owner by name
    pub fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, created_at FROM users WHERE name = ?",
            params![name],
            user_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List all owners
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Issue a new API token for an owner
    ///
    /// Returns the token metadata and the secret. The secret is not
    /// recoverable afterwards.
    pub fn create_api_token(&self, user_id: &str, label: Option<&str>) -> Result<(ApiToken, String)> {
        if self.get_user(user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }

        let secret = format!("{}{}", TOKEN_PREFIX, uuid::Uuid::new_v4().simple());
        let id = new_id();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO api_tokens (id, user_id, token_hash, label) VALUES (?, ?, ?, ?)",
            params![id, user_id, hash_token(&secret), label],
        )?;

        let token = conn.query_row(
            "SELECT id, user_id, label, created_at, last_used_at FROM api_tokens WHERE id = ?",
            params![id],
            token_from_row,
        )?;

        info!(user_id = %user_id, token_id = %id, "Issued API token");
        Ok((token, secret))
    }

    /// List an owner's tokens (metadata only)
    pub fn list_api_tokens(&self, user_id: &str) -> Result<Vec<ApiToken>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, label, created_at, last_used_at FROM api_tokens WHERE user_id = ? ORDER BY created_at",
        )?;
        let tokens = stmt
            .query_map(params![user_id], token_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    /// Revoke a token by ID
    pub fn revoke_api_token(&self, user_id: &str, token_id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM api_tokens WHERE id = ? AND user_id = ?",
            params![token_id, user_id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Token {} not found", token_id)));
        }
        Ok(())
    }

    /// Resolve a presented secret to its owner, recording the use
    pub fn resolve_token(&self, secret: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let hash = hash_token(secret);

        let user = conn
            .query_row(
                r#"
                SELECT u.id, u.name, u.created_at
                FROM api_tokens t
                JOIN users u ON u.id = t.user_id
                WHERE t.token_hash = ?
                "#,
                params![hash],
                user_from_row,
            )
            .optional()?;

        if user.is_some() {
            conn.execute(
                "UPDATE api_tokens SET last_used_at = CURRENT_TIMESTAMP WHERE token_hash = ?",
                params![hash],
            )?;
        }

        Ok(user)
    }
}
