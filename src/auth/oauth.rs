//! GitHub OAuth routes
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub and the
//! logout endpoint.

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::cookie::{build_session_cookie, clear_session_cookie};
use super::github::CALLBACK_PATH;
use super::middleware::{CurrentSession, MaybeSession, require_session};
use crate::AppState;
use crate::error::AppError;

/// Route that starts the GitHub login
pub const LOGIN_PATH: &str = "/auth/github/login";

/// Create authentication router
///
/// Routes:
/// - GET /auth/github/login - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
/// - POST /auth/logout - Logout
/// - GET /auth/session - Current session (authenticated)
pub fn auth_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/session", get(current_session))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .route(LOGIN_PATH, get(github_login))
        .route(CALLBACK_PATH, get(github_callback))
        .route("/auth/logout", post(logout))
        .merge(protected)
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github/login
///
/// Issues a single-use state value and redirects to GitHub.
async fn github_login(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let authorize_url = state.gateway.begin_login().await?;
    Ok(Redirect::to(authorize_url.as_str()))
}

/// Query parameters from GitHub callback
///
/// Both are optional here so a missing one becomes a validation error
/// rather than an extractor rejection.
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Anti-forgery state
    state: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Consume the state
/// 2. Exchange code and fetch the GitHub user
/// 3. Create session and set cookie
/// 4. Redirect to the application root
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<GitHubCallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let login = state
        .gateway
        .complete_login(query.state.as_deref(), query.code.as_deref())
        .await?;

    let cookie = build_session_cookie(
        &login.session.session_id,
        login.session.expires_at,
        state.config.auth.cookie_secure,
    );

    Ok((jar.add(cookie), Redirect::to("/")))
}

// =============================================================================
// Logout
// =============================================================================

/// Logout form body
#[derive(Debug, Deserialize)]
struct LogoutForm {
    csrf_token: Option<String>,
}

/// POST /auth/logout
///
/// Requires a matching `csrf_token` when a session is active. The cookie
/// is cleared whether or not a stored session was found.
async fn logout(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    jar: CookieJar,
    form: Option<Form<LogoutForm>>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session) = session {
        let submitted = form.as_ref().and_then(|Form(f)| f.csrf_token.as_deref());
        state.gateway.logout(&session, submitted).await?;
    }

    let cleared = clear_session_cookie(state.config.auth.cookie_secure);
    Ok((jar.add(cleared), Redirect::to("/")))
}

// =============================================================================
// Session introspection
// =============================================================================

/// Session details the application needs to render state-changing forms
#[derive(Debug, Serialize)]
struct SessionResponse {
    user_id: i64,
    csrf_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// GET /auth/session
async fn current_session(CurrentSession(session): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        user_id: session.user_id,
        csrf_token: session.csrf_token,
        expires_at: session.expires_at,
    })
}
