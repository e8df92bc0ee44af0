//! Error types for Gourmetkan
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::auth::LOGIN_PATH;

/// Application-wide error type
///
/// Security rejections (`InvalidState`, `InvalidCsrf`) are terminal for
/// the request. Provider failures surface as a plain login failure; the
/// provider's own error text is only logged.
#[derive(Debug, Error)]
pub enum AppError {
    /// Secure random source unavailable (500)
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    /// Storage fault (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authorization code exchange failed (400)
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// Profile fetch failed (400)
    #[error("Profile fetch failed: {0}")]
    Profile(String),

    /// Missing, expired or replayed OAuth state (400)
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    /// No active session; answered with a redirect to the login route
    #[error("Authentication required")]
    Unauthenticated,

    /// CSRF token missing or mismatched (403)
    #[error("Invalid CSRF token")]
    InvalidCsrf,

    /// Malformed request (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Short label used for the error metric
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::TokenGeneration(_) => "token_generation",
            AppError::Database(_) => "database",
            AppError::Exchange(_) => "exchange",
            AppError::Profile(_) => "profile",
            AppError::InvalidState => "invalid_state",
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidCsrf => "invalid_csrf",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. `Unauthenticated` becomes a redirect.
    fn into_response(self) -> Response {
        use axum::Json;

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let (status, error_message) = match &self {
            AppError::Unauthenticated => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::InvalidState => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidCsrf => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Exchange(_) | AppError::Profile(_) => {
                tracing::warn!(error = %self, "GitHub login failed");
                (StatusCode::BAD_REQUEST, "Login failed".to_string())
            }
            AppError::Database(_) => {
                tracing::error!(error = %self, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::TokenGeneration(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn unauthenticated_redirects_to_login() {
        let response = AppError::Unauthenticated.into_response();
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some(LOGIN_PATH)
        );
    }

    #[test]
    fn security_rejections_map_to_client_errors() {
        assert_eq!(
            AppError::InvalidState.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidCsrf.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Exchange("bad_verification_code".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_faults_are_server_errors() {
        let response = AppError::Database(sqlx::Error::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
