//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Server-side session management
//! - CSRF verification for state-mutating requests
//! - Authentication middleware

pub mod cookie;
pub mod gateway;
pub mod github;
mod middleware;
mod oauth;
pub mod session;
pub mod token;

pub use gateway::{AuthState, CompletedLogin, SessionGateway, verify_csrf};
pub use github::{AccessToken, GitHubClient, IdentityProvider, ProviderProfile};
pub use middleware::{CurrentSession, MaybeSession, require_session};
pub use oauth::{LOGIN_PATH, auth_router};
pub use session::{IssuedSession, Session};
pub use token::random_token;
