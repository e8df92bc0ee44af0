//! Data models
//!
//! Rust structs representing database rows.
//! Timestamps use chrono and are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// OAuth State
// =============================================================================

/// Single-use anti-forgery value issued at login initiation
///
/// Never mutated. Deleted exactly once by a matching, non-expired callback.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OAuthState {
    pub state: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Identity
// =============================================================================

/// Local user bound to a GitHub account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub id: i64,
    /// GitHub numeric account id, as text
    pub provider_id: String,
    /// GitHub login
    pub display_name: String,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
