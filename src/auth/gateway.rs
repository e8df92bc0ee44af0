//! Session gateway
//!
//! Orchestrates the login redirect, the OAuth callback, logout and the
//! per-request session/CSRF resolution used by the rest of the application.
//! Every request starts `Anonymous` and becomes `Authenticated` only when
//! its cookie names a stored, unexpired session.

use chrono::{Duration, Utc};
use std::sync::Arc;
use url::Url;

use super::github::IdentityProvider;
use super::session::{IssuedSession, Session};
use crate::data::{Identity, OAuthStateStore, SessionStore, UserDirectory};
use crate::error::AppError;
use crate::metrics::{
    CSRF_REJECTIONS_TOTAL, LOGINS_TOTAL, SESSIONS_CREATED_TOTAL, SESSIONS_EXPIRED_TOTAL,
};

/// Per-request authentication state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(session) => Some(session),
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(session) => Some(session),
        }
    }
}

/// Result of a successful callback
#[derive(Debug, Clone)]
pub struct CompletedLogin {
    pub identity: Identity,
    pub session: IssuedSession,
}

/// CSRF check for state-mutating submissions
///
/// Fails without an active session, for an empty token, and for any
/// token that is not exactly the session's.
pub fn verify_csrf(submitted: Option<&str>, session: Option<&Session>) -> bool {
    match (submitted, session) {
        (Some(token), Some(session)) => !token.is_empty() && token == session.csrf_token,
        _ => false,
    }
}

/// Boundary component between HTTP handlers and the auth stores
pub struct SessionGateway {
    states: Arc<dyn OAuthStateStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    provider: Arc<dyn IdentityProvider>,
    session_ttl: Duration,
    state_ttl: Duration,
}

impl SessionGateway {
    pub fn new(
        states: Arc<dyn OAuthStateStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        provider: Arc<dyn IdentityProvider>,
        session_ttl: Duration,
        state_ttl: Duration,
    ) -> Self {
        Self {
            states,
            sessions,
            users,
            provider,
            session_ttl,
            state_ttl,
        }
    }

    /// Resolve the session named by a cookie value
    ///
    /// Missing and expired sessions both resolve to `Anonymous`. An expired
    /// row found here is deleted; a failed delete is logged and otherwise
    /// ignored.
    pub async fn resolve(&self, session_id: Option<&str>) -> Result<AuthState, AppError> {
        let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
            return Ok(AuthState::Anonymous);
        };

        let Some(session) = self.sessions.get_session(session_id).await? else {
            return Ok(AuthState::Anonymous);
        };

        if session.is_expired_at(Utc::now()) {
            match self.sessions.delete_session(session_id).await {
                Ok(()) => {
                    SESSIONS_EXPIRED_TOTAL.inc();
                    tracing::debug!(user_id = session.user_id, "Expired session evicted");
                }
                Err(error) => {
                    tracing::warn!(user_id = session.user_id, %error, "Failed to evict expired session");
                }
            }
            return Ok(AuthState::Anonymous);
        }

        Ok(AuthState::Authenticated(session))
    }

    /// Issue a state value and build the provider redirect
    pub async fn begin_login(&self) -> Result<Url, AppError> {
        let oauth_state = self.states.issue_state(self.state_ttl).await?;
        tracing::info!("GitHub login initiated");
        Ok(self.provider.authorization_url(&oauth_state.state))
    }

    /// Handle the provider callback
    ///
    /// # Steps
    /// 1. Require both `state` and `code`
    /// 2. Consume the state (single use)
    /// 3. Exchange code for access token
    /// 4. Fetch the provider profile
    /// 5. Resolve or create the local identity
    /// 6. Create the session
    ///
    /// # Errors
    /// `Validation` for missing parameters, `InvalidState` for an unknown,
    /// expired or replayed state, `Exchange`/`Profile` for provider failures.
    /// Nothing is retried.
    pub async fn complete_login(
        &self,
        state: Option<&str>,
        code: Option<&str>,
    ) -> Result<CompletedLogin, AppError> {
        let (Some(state), Some(code)) = (
            state.filter(|s| !s.is_empty()),
            code.filter(|c| !c.is_empty()),
        ) else {
            return Err(AppError::Validation(
                "callback requires state and code".to_string(),
            ));
        };

        if !self.states.consume_state(state).await? {
            LOGINS_TOTAL.with_label_values(&["invalid_state"]).inc();
            tracing::warn!("OAuth callback rejected: unknown, expired or replayed state");
            return Err(AppError::InvalidState);
        }

        let token = self.provider.exchange_code(code).await.inspect_err(|_| {
            LOGINS_TOTAL.with_label_values(&["exchange_failed"]).inc();
        })?;

        let profile = self
            .provider
            .fetch_profile(&token.access_token)
            .await
            .inspect_err(|_| {
                LOGINS_TOTAL.with_label_values(&["profile_failed"]).inc();
            })?;

        let identity = self
            .users
            .upsert_by_provider_id(&profile.provider_id, &profile.username, &profile.avatar_url)
            .await
            .inspect_err(|_| {
                LOGINS_TOTAL.with_label_values(&["directory_failed"]).inc();
            })?;

        let session = self
            .sessions
            .create_session(identity.id, self.session_ttl)
            .await?;

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        SESSIONS_CREATED_TOTAL.inc();
        tracing::info!(
            user_id = identity.id,
            username = %identity.display_name,
            "Session created"
        );

        Ok(CompletedLogin { identity, session })
    }

    /// Reject the request unless `submitted` matches the session's CSRF token
    pub fn require_csrf(
        &self,
        submitted: Option<&str>,
        session: Option<&Session>,
    ) -> Result<(), AppError> {
        if verify_csrf(submitted, session) {
            return Ok(());
        }

        CSRF_REJECTIONS_TOTAL.inc();
        tracing::warn!(
            user_id = session.map(|s| s.user_id),
            "Request rejected by CSRF check"
        );
        Err(AppError::InvalidCsrf)
    }

    /// Delete a session after a passing CSRF check
    ///
    /// Nothing is deleted when the check fails.
    pub async fn logout(&self, session: &Session, submitted_csrf: Option<&str>) -> Result<(), AppError> {
        self.require_csrf(submitted_csrf, Some(session))?;
        self.sessions.delete_session(&session.id).await?;
        tracing::info!(user_id = session.user_id, "Session ended");
        Ok(())
    }

    /// Drop expired sessions and states
    ///
    /// Hygiene only; `resolve` and `consume_state` check expiry themselves.
    pub async fn purge_expired(&self) -> Result<(u64, u64), AppError> {
        let sessions = self.sessions.purge_expired_sessions().await?;
        let states = self.states.purge_expired_states().await?;
        Ok((sessions, states))
    }
}
