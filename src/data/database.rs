//! SQLite database operations
//!
//! All durable access goes through this module.
//! Uses SQLx with migrations embedded at build time.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use super::store::{OAuthStateStore, SessionStore, UserDirectory};
use crate::auth::token::{SESSION_TOKEN_BYTES, STATE_TOKEN_BYTES, random_token};
use crate::auth::session::expiry_after;
use crate::auth::{IssuedSession, Session};
use crate::error::AppError;

/// Database connection pool wrapper
///
/// Implements every store interface. SQLite serializes writers, so each
/// single-statement write below is atomic with respect to concurrent
/// requests.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePool::connect_with(options).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Get identity by local user id
    pub async fn get_identity(&self, user_id: i64) -> Result<Option<Identity>, AppError> {
        let identity = sqlx::query_as::<_, Identity>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(identity)
    }

    /// Count sessions held by a user, expired or not
    pub async fn count_sessions(&self, user_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =========================================================================
// OAuth States
// =========================================================================

#[async_trait]
impl OAuthStateStore for Database {
    async fn issue_state(&self, ttl: Duration) -> Result<OAuthState, AppError> {
        let now = Utc::now();
        let oauth_state = OAuthState {
            state: random_token(STATE_TOKEN_BYTES)?,
            expires_at: expiry_after(now, ttl)?,
        };

        sqlx::query("INSERT INTO oauth_states (state, created_at, expires_at) VALUES (?, ?, ?)")
            .bind(&oauth_state.state)
            .bind(now)
            .bind(oauth_state.expires_at)
            .execute(&self.pool)
            .await?;

        Ok(oauth_state)
    }

    async fn consume_state(&self, state: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE state = ? AND expires_at > ?")
            .bind(state)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_states(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =========================================================================
// Sessions
// =========================================================================

#[async_trait]
impl SessionStore for Database {
    async fn create_session(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> Result<IssuedSession, AppError> {
        let now = Utc::now();
        let issued = IssuedSession {
            session_id: random_token(SESSION_TOKEN_BYTES)?,
            csrf_token: random_token(SESSION_TOKEN_BYTES)?,
            expires_at: expiry_after(now, ttl)?,
        };

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, csrf_token, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&issued.session_id)
        .bind(user_id)
        .bind(&issued.csrf_token)
        .bind(now)
        .bind(issued.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(issued)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, csrf_token, expires_at FROM sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserDirectory for Database {
    async fn upsert_by_provider_id(
        &self,
        provider_id: &str,
        display_name: &str,
        avatar_url: &str,
    ) -> Result<Identity, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Executed to completion so the read below sees this write.
        sqlx::query(
            r#"
            INSERT INTO users (provider_id, display_name, avatar_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(provider_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(provider_id)
        .bind(display_name)
        .bind(avatar_url)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let identity =
            sqlx::query_as::<_, Identity>("SELECT * FROM users WHERE provider_id = ?")
                .bind(provider_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(identity)
    }
}
