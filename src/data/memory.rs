//! In-memory stores
//!
//! Volatile, cleared on restart. The server always runs on `Database`;
//! this store backs the gateway in unit tests and is available to callers
//! embedding `SessionGateway` in a single process. Every operation holds
//! the map lock for its whole check-and-mutate step.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::models::OAuthState;
use super::store::{OAuthStateStore, SessionStore};
use crate::auth::token::{SESSION_TOKEN_BYTES, STATE_TOKEN_BYTES, random_token};
use crate::auth::session::expiry_after;
use crate::auth::{IssuedSession, Session};
use crate::error::AppError;

/// State and session store backed by process memory
///
/// Not selectable through configuration.
#[derive(Default)]
pub struct MemoryStore {
    /// State value -> expiry
    states: Mutex<HashMap<String, DateTime<Utc>>>,
    /// Session id -> session
    sessions: Mutex<HashMap<String, Session>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("{name} lock poisoned")))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions for a user, expired or not
    pub fn session_count(&self, user_id: i64) -> Result<usize, AppError> {
        let sessions = lock(&self.sessions, "session store")?;
        Ok(sessions.values().filter(|s| s.user_id == user_id).count())
    }
}

#[async_trait]
impl OAuthStateStore for MemoryStore {
    async fn issue_state(&self, ttl: Duration) -> Result<OAuthState, AppError> {
        let oauth_state = OAuthState {
            state: random_token(STATE_TOKEN_BYTES)?,
            expires_at: expiry_after(Utc::now(), ttl)?,
        };

        lock(&self.states, "state store")?
            .insert(oauth_state.state.clone(), oauth_state.expires_at);

        Ok(oauth_state)
    }

    async fn consume_state(&self, state: &str) -> Result<bool, AppError> {
        let mut states = lock(&self.states, "state store")?;
        let now = Utc::now();

        match states.get(state) {
            Some(expires_at) if *expires_at > now => {
                states.remove(state);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired_states(&self) -> Result<u64, AppError> {
        let mut states = lock(&self.states, "state store")?;
        let now = Utc::now();
        let before = states.len();
        states.retain(|_, expires_at| *expires_at > now);
        Ok((before - states.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> Result<IssuedSession, AppError> {
        let issued = IssuedSession {
            session_id: random_token(SESSION_TOKEN_BYTES)?,
            csrf_token: random_token(SESSION_TOKEN_BYTES)?,
            expires_at: expiry_after(Utc::now(), ttl)?,
        };

        lock(&self.sessions, "session store")?.insert(
            issued.session_id.clone(),
            issued.clone().into_session(user_id),
        );

        Ok(issued)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        Ok(lock(&self.sessions, "session store")?
            .get(session_id)
            .cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        lock(&self.sessions, "session store")?.remove(session_id);
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let mut sessions = lock(&self.sessions, "session store")?;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}
