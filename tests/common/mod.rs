//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Once;

use gourmetkan::{AppState, config};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GITHUB_USER_ID: u64 = 4242;
pub const GITHUB_LOGIN: &str = "octocat";

static METRICS: Once = Once::new();

/// Test server instance
///
/// Runs the full router against a temporary SQLite database, with every
/// GitHub endpoint pointed at a local mock server.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        METRICS.call_once(gourmetkan::metrics::init_metrics);

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let github = MockServer::start().await;

        // Bind first so the redirect URI carries the real port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let mut github_config =
            config::GitHubOAuthConfig::new("test-client-id", "test-client-secret");
        github_config.authorize_url = format!("{}/login/oauth/authorize", github.uri());
        github_config.token_url = format!("{}/login/oauth/access_token", github.uri());
        github_config.api_base_url = github.uri();

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                base_url: addr_str.clone(),
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                cookie_secure: false,
                session_ttl_seconds: 1_209_600,
                state_ttl_seconds: 600,
                provider_timeout_seconds: 5,
                sweep_interval_seconds: 0,
                github: github_config,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Redirects are asserted, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let app = gourmetkan::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Mount GitHub token and user endpoints that accept any code
    pub async fn mock_github_success(&self) {
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_test_token",
                "token_type": "bearer",
                "scope": "read:user"
            })))
            .mount(&self.github)
            .await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": GITHUB_USER_ID,
                "login": GITHUB_LOGIN,
                "avatar_url": "https://avatars.example.com/u/4242"
            })))
            .mount(&self.github)
            .await;
    }

    /// Start a login and return the state value from the GitHub redirect
    pub async fn begin_login(&self) -> String {
        let response = self
            .client
            .get(self.url("/auth/github/login"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        let location = url::Url::parse(location(&response)).unwrap();
        location
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter")
    }

    /// Run the callback for `state` and return the response
    pub async fn callback(&self, state: &str, code: &str) -> reqwest::Response {
        self.client
            .get(self.url("/auth/github/callback"))
            .query(&[("code", code), ("state", state)])
            .send()
            .await
            .unwrap()
    }

    /// Complete a full login and return the session cookie value
    pub async fn login(&self) -> String {
        self.mock_github_success().await;
        let state = self.begin_login().await;
        let response = self.callback(&state, "test-code").await;
        assert!(response.status().is_redirection());

        session_cookie(&response).expect("session cookie")
    }

    /// GET `path` carrying the session cookie
    pub async fn get_with_session(&self, path: &str, session_id: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("cookie", format!("session_id={session_id}"))
            .send()
            .await
            .unwrap()
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

/// Raw `Set-Cookie` header for the session cookie
pub fn session_set_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session_id="))
        .map(str::to_string)
}

/// Session id set by the response, if any
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    let raw = session_set_cookie(response)?;
    let value = raw.strip_prefix("session_id=")?.split(';').next()?;
    (!value.is_empty()).then(|| value.to_string())
}
