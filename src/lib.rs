//! Gourmetkan - GitHub sign-in and server-side sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - /auth/github/login, /auth/github/callback, /auth/logout   │
//! │  - Session extractors and middleware                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session Gateway                          │
//! │  - OAuth state issue/consume                                │
//! │  - GitHub code exchange and profile fetch                   │
//! │  - Session resolution, CSRF verification                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Store traits (states, sessions, users)                   │
//! │  - SQLite (sqlx) and in-memory implementations              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Application root and metrics endpoints
//! - `auth`: GitHub OAuth, sessions and CSRF
//! - `data`: Store interfaces and implementations
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request. The stores behind the gateway are the only
/// shared mutable resource.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Login, logout and per-request session resolution
    pub gateway: Arc<auth::SessionGateway>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the GitHub client
    /// 3. Wire the session gateway to the database stores
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);

        // 2. Initialize HTTP client and GitHub client
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Gourmetkan/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let github = auth::GitHubClient::new(
            &config.auth.github,
            config.server.base_url(),
            config.auth.provider_timeout(),
            http_client,
        )?;
        tracing::info!(redirect_uri = %github.redirect_uri(), "GitHub client initialized");

        // 3. Session gateway over the database stores
        let gateway = auth::SessionGateway::new(
            db.clone(),
            db.clone(),
            db.clone(),
            Arc::new(github),
            config.auth.session_ttl(),
            config.auth.state_ttl(),
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            gateway: Arc::new(gateway),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::index_router())
        .merge(auth::auth_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
