//! Session types
//!
//! Sessions are stored server-side. The browser only holds the opaque
//! session id in the `session_id` cookie.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `now + ttl`, or an error when the result is not a representable time
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AppError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("expiry out of range for ttl {ttl}")))
}

/// Server-side session record
///
/// A user may hold any number of concurrent sessions. Validity is
/// re-checked against the clock on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Opaque session id (cookie value)
    pub id: String,
    /// Local user id
    pub user_id: i64,
    /// Per-session secret required on state-mutating submissions
    pub csrf_token: String,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is valid iff `now < expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Values handed back when a session is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub session_id: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedSession {
    pub fn into_session(self, user_id: i64) -> Session {
        Session {
            id: self.session_id,
            user_id,
            csrf_token: self.csrf_token,
            expires_at: self.expires_at,
        }
    }
}
