//! Authentication middleware
//!
//! Resolves the session cookie once per request and protects routes
//! that require authentication. The resolved state lives in request
//! extensions only, so it never outlives the request.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::cookie::session_id_from;
use super::gateway::AuthState;
use super::session::Session;
use crate::AppState;
use crate::error::AppError;

async fn resolve_request(parts: &mut Parts, state: &AppState) -> Result<AuthState, AppError> {
    if let Some(auth) = parts.extensions.get::<AuthState>().cloned() {
        return Ok(auth);
    }

    let jar = CookieJar::from_headers(&parts.headers);
    let auth = state
        .gateway
        .resolve(session_id_from(&jar).as_deref())
        .await?;
    parts.extensions.insert(auth.clone());

    Ok(auth)
}

/// Middleware to require authentication
///
/// Anonymous requests are redirected to the login route.
/// Adds the resolved `AuthState` to request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/auth/session", ...)
///     .layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    match resolve_request(&mut parts, &state).await? {
        AuthState::Authenticated(_) => Ok(next.run(Request::from_parts(parts, body)).await),
        AuthState::Anonymous => Err(AppError::Unauthenticated),
    }
}

/// Extractor for the current authenticated session
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentSession(session): CurrentSession,
/// ) -> impl IntoResponse {
///     format!("Hello, user {}", session.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        resolve_request(parts, &state)
            .await?
            .into_session()
            .map(CurrentSession)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Optional session extractor
///
/// Returns None for anonymous requests instead of redirecting.
/// Storage failures are still rejected.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeSession(resolve_request(parts, &state).await?.into_session()))
    }
}
