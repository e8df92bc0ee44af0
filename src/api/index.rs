//! Application root
//!
//! The landing route the callback and logout redirect to. Reports the
//! caller's authentication state so pages and clients can decide whether
//! to offer sign-in or sign-out.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::{LOGIN_PATH, MaybeSession};

#[derive(Debug, Serialize)]
struct IndexResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_url: Option<&'static str>,
}

/// GET /
async fn index(MaybeSession(session): MaybeSession) -> Json<IndexResponse> {
    Json(match session {
        Some(session) => IndexResponse {
            authenticated: true,
            user_id: Some(session.user_id),
            login_url: None,
        },
        None => IndexResponse {
            authenticated: false,
            user_id: None,
            login_url: Some(LOGIN_PATH),
        },
    })
}

pub fn index_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}
