//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Upper bound for session and state lifetimes
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public base URL, used to build the OAuth redirect URI
    /// (e.g., "https://gourmet.example.com")
    pub base_url: String,
}

impl ServerConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (GitHub OAuth + sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Set the `Secure` attribute on the session cookie
    #[serde(default)]
    pub cookie_secure: bool,
    /// Session lifetime in seconds (default: 1209600 = 14 days)
    pub session_ttl_seconds: i64,
    /// OAuth state lifetime in seconds (default: 600 = 10 minutes)
    pub state_ttl_seconds: i64,
    /// Deadline for each call to the identity provider
    pub provider_timeout_seconds: u64,
    /// Interval for purging expired sessions and states. 0 disables the sweep.
    #[serde(default)]
    pub sweep_interval_seconds: u64,
    pub github: GitHubOAuthConfig,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_seconds)
    }

    pub fn state_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.state_ttl_seconds)
    }

    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.provider_timeout_seconds)
    }
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_github_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_github_token_url")]
    pub token_url: String,
    #[serde(default = "default_github_api_base_url")]
    pub api_base_url: String,
    /// Requested scope (read-only profile)
    #[serde(default = "default_github_scope")]
    pub scope: String,
}

impl GitHubOAuthConfig {
    /// Provider settings with the public GitHub endpoints
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: default_github_authorize_url(),
            token_url: default_github_token_url(),
            api_base_url: default_github_api_base_url(),
            scope: default_github_scope(),
        }
    }
}

fn default_github_authorize_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_github_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_github_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_scope() -> String {
    "read:user".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GOURMETKAN__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid or GitHub credentials are missing
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.path", "./data/app.db")?
            .set_default("auth.cookie_secure", false)?
            .set_default("auth.session_ttl_seconds", 1_209_600)?
            .set_default("auth.state_ttl_seconds", 600)?
            .set_default("auth.provider_timeout_seconds", 5)?
            .set_default("auth.sweep_interval_seconds", 0)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (GOURMETKAN__*)
            .add_source(
                Environment::with_prefix("GOURMETKAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.auth.github.client_id.trim().is_empty()
            || self.auth.github.client_secret.trim().is_empty()
        {
            return Err(AppError::Config(
                "auth.github.client_id and auth.github.client_secret are required".to_string(),
            ));
        }

        let base_url = url::Url::parse(self.server.base_url())
            .map_err(|e| AppError::Config(format!("server.base_url is not a valid URL: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "server.base_url must use http or https".to_string(),
            ));
        }

        for (name, ttl) in [
            ("auth.session_ttl_seconds", self.auth.session_ttl_seconds),
            ("auth.state_ttl_seconds", self.auth.state_ttl_seconds),
        ] {
            if ttl <= 0 {
                return Err(AppError::Config(format!("{name} must be greater than 0")));
            }
            if ttl > MAX_TTL_SECONDS {
                return Err(AppError::Config(format!(
                    "{name} must be at most {MAX_TTL_SECONDS} (10 years)"
                )));
            }
        }

        if self.auth.provider_timeout_seconds == 0 {
            return Err(AppError::Config(
                "auth.provider_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if base_url.scheme() == "https" && !self.auth.cookie_secure {
            tracing::warn!(
                base_url = %self.server.base_url(),
                "Serving over https with insecure session cookies; set auth.cookie_secure"
            );
        }

        Ok(())
    }
}
