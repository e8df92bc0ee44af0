//! Store interfaces
//!
//! The session gateway only sees these traits. Each operation is a single
//! atomic call against the backing store; callers never compose a
//! check-then-act sequence across two calls.

use async_trait::async_trait;
use chrono::Duration;

use super::models::{Identity, OAuthState};
use crate::auth::{IssuedSession, Session};
use crate::error::AppError;

/// Single-use OAuth state values
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    /// Generate a state value and persist it with `expires_at = now + ttl`
    async fn issue_state(&self, ttl: Duration) -> Result<OAuthState, AppError>;

    /// Delete the row matching `state` if it has not expired
    ///
    /// Returns whether a row was deleted. Two concurrent calls with the
    /// same value never both return `true`. "Not found" and "expired" are
    /// both `Ok(false)`.
    async fn consume_state(&self, state: &str) -> Result<bool, AppError>;

    /// Remove expired rows, returning how many were deleted
    async fn purge_expired_states(&self) -> Result<u64, AppError>;
}

/// Server-side sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for `user_id` expiring at `now + ttl`
    ///
    /// A single write: either the whole session exists afterwards or nothing does.
    async fn create_session(&self, user_id: i64, ttl: Duration)
    -> Result<IssuedSession, AppError>;

    /// Look up a session by id
    ///
    /// Expired rows are returned as-is; the caller compares against the clock.
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Delete a session. Deleting an unknown id is not an error.
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;

    /// Remove expired rows, returning how many were deleted
    async fn purge_expired_sessions(&self) -> Result<u64, AppError>;
}

/// Resolves a provider identity to a local user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Idempotent upsert keyed by provider id
    async fn upsert_by_provider_id(
        &self,
        provider_id: &str,
        display_name: &str,
        avatar_url: &str,
    ) -> Result<Identity, AppError>;
}
