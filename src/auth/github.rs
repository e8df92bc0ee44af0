//! GitHub OAuth client
//!
//! Builds the authorize URL, exchanges authorization codes for access
//! tokens and fetches the authenticated profile. Each provider call runs
//! under its own deadline and is never retried: the authorization code
//! is single-use, so a failed exchange is final.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::GitHubOAuthConfig;
use crate::error::AppError;
use crate::metrics::PROVIDER_REQUEST_DURATION_SECONDS;

/// Path of the callback route, relative to the public base URL
pub const CALLBACK_PATH: &str = "/auth/github/callback";

/// Access token granted by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

/// Authenticated provider profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// GitHub numeric account id, as text
    pub provider_id: String,
    pub username: String,
    pub avatar_url: String,
}

/// Third-party OAuth2 identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorize endpoint with client id, redirect URI, state and scope
    fn authorization_url(&self, state: &str) -> Url;

    /// Trade an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, AppError>;

    /// Fetch the profile the access token belongs to
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AppError>;
}

/// GitHub token endpoint response
///
/// GitHub reports a bad code with HTTP 200 and an `error` field.
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    scope: String,
    error: Option<String>,
    error_description: Option<String>,
}

/// GitHub user info
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    avatar_url: Option<String>,
}

/// GitHub implementation of [`IdentityProvider`]
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    scope: String,
    authorize_url: Url,
    token_url: Url,
    user_url: Url,
    redirect_uri: String,
    timeout: Duration,
}

impl GitHubClient {
    /// Create a client from provider settings
    ///
    /// # Arguments
    /// * `github` - Client credentials and endpoints
    /// * `base_url` - Public base URL of this service
    /// * `timeout` - Deadline for each provider call
    /// * `http` - Shared HTTP client
    ///
    /// # Errors
    /// Returns `AppError::Config` if an endpoint is not a valid URL
    pub fn new(
        github: &GitHubOAuthConfig,
        base_url: &str,
        timeout: Duration,
        http: reqwest::Client,
    ) -> Result<Self, AppError> {
        let parse = |name: &str, value: &str| {
            Url::parse(value)
                .map_err(|e| AppError::Config(format!("auth.github.{name} is not a valid URL: {e}")))
        };

        let user_url = format!("{}/user", github.api_base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            client_id: github.client_id.clone(),
            client_secret: github.client_secret.clone(),
            scope: github.scope.clone(),
            authorize_url: parse("authorize_url", &github.authorize_url)?,
            token_url: parse("token_url", &github.token_url)?,
            user_url: parse("api_base_url", &user_url)?,
            redirect_uri: format!("{}{}", base_url.trim_end_matches('/'), CALLBACK_PATH),
            timeout,
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

#[async_trait]
impl IdentityProvider for GitHubClient {
    fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", &self.scope);
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<AccessToken, AppError> {
        let started = Instant::now();
        let response = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Exchange(format!("request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Exchange(format!("read response: {e}")))?;
        PROVIDER_REQUEST_DURATION_SECONDS
            .with_label_values(&["token"])
            .observe(started.elapsed().as_secs_f64());

        if !status.is_success() {
            return Err(AppError::Exchange(format!(
                "provider returned {status}: {body}"
            )));
        }

        let token: GitHubTokenResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Exchange(format!("decode token: {e}")))?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(AccessToken {
                access_token,
                token_type: token.token_type,
                scope: token.scope,
            }),
            _ => Err(AppError::Exchange(match token.error {
                Some(error) => format!(
                    "missing access token: {error} {}",
                    token.error_description.unwrap_or_default()
                )
                .trim_end()
                .to_string(),
                None => "missing access token".to_string(),
            })),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AppError> {
        let started = Instant::now();
        let response = self
            .http
            .get(self.user_url.clone())
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::Profile(format!("request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Profile(format!("read response: {e}")))?;
        PROVIDER_REQUEST_DURATION_SECONDS
            .with_label_values(&["user"])
            .observe(started.elapsed().as_secs_f64());

        if !status.is_success() {
            return Err(AppError::Profile(format!(
                "provider returned {status}: {body}"
            )));
        }

        let user: GitHubUser = serde_json::from_str(&body)
            .map_err(|e| AppError::Profile(format!("decode user: {e}")))?;

        Ok(ProviderProfile {
            provider_id: user.id.to_string(),
            username: user.login,
            avatar_url: user.avatar_url.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: &str, timeout: Duration) -> GitHubClient {
        let mut github = GitHubOAuthConfig::new("test-client-id", "test-client-secret");
        github.authorize_url = format!("{server_uri}/login/oauth/authorize");
        github.token_url = format!("{server_uri}/login/oauth/access_token");
        github.api_base_url = server_uri.to_string();
        GitHubClient::new(
            &github,
            "http://localhost:8080/",
            timeout,
            reqwest::Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn authorization_url_carries_client_redirect_state_and_scope() {
        let github = GitHubOAuthConfig::new("test-client-id", "test-client-secret");
        let client = GitHubClient::new(
            &github,
            "https://gourmet.example.com",
            Duration::from_secs(5),
            reqwest::Client::new(),
        )
        .unwrap();

        let url = client.authorization_url("state-123");
        assert!(
            url.as_str()
                .starts_with("https://github.com/login/oauth/authorize?")
        );

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "test-client-id");
        assert_eq!(
            pairs["redirect_uri"],
            "https://gourmet.example.com/auth/github/callback"
        );
        assert_eq!(pairs["state"], "state-123");
        assert_eq!(pairs["scope"], "read:user");
        assert!(!pairs.contains_key("client_secret"));
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let mut github = GitHubOAuthConfig::new("id", "secret");
        github.token_url = "not a url".to_string();
        let result = GitHubClient::new(
            &github,
            "http://localhost:8080",
            Duration::from_secs(5),
            reqwest::Client::new(),
        );
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("token_url")));
    }

    #[tokio::test]
    async fn exchange_code_posts_form_and_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(header("accept", "application/json"))
            .and(body_string_contains("client_id=test-client-id"))
            .and(body_string_contains("client_secret=test-client-secret"))
            .and(body_string_contains("code=code-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_token",
                "token_type": "bearer",
                "scope": "read:user"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let token = client.exchange_code("code-1").await.unwrap();
        assert_eq!(token.access_token, "gho_token");
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.scope, "read:user");
    }

    #[tokio::test]
    async fn exchange_code_reports_provider_body_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad client credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let error = client.exchange_code("code-1").await.unwrap_err();
        assert!(matches!(
            error,
            AppError::Exchange(message) if message.contains("bad client credentials")
        ));
    }

    #[tokio::test]
    async fn exchange_code_rejects_response_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let error = client.exchange_code("stale").await.unwrap_err();
        assert!(matches!(
            error,
            AppError::Exchange(message)
                if message.contains("missing access token")
                    && message.contains("bad_verification_code")
        ));
    }

    #[tokio::test]
    async fn exchange_code_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let error = client.exchange_code("code-1").await.unwrap_err();
        assert!(matches!(error, AppError::Exchange(message) if message.contains("decode token")));
    }

    #[tokio::test]
    async fn exchange_code_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_millis(200));
        let error = client.exchange_code("code-1").await.unwrap_err();
        assert!(matches!(error, AppError::Exchange(_)));
    }

    #[tokio::test]
    async fn fetch_profile_sends_bearer_and_maps_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "login": "octocat",
                "avatar_url": "https://avatars.example.com/42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let profile = client.fetch_profile("gho_token").await.unwrap();
        assert_eq!(
            profile,
            ProviderProfile {
                provider_id: "42".to_string(),
                username: "octocat".to_string(),
                avatar_url: "https://avatars.example.com/42".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn fetch_profile_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let error = client.fetch_profile("revoked").await.unwrap_err();
        assert!(matches!(error, AppError::Profile(message) if message.contains("Bad credentials")));
    }

    #[tokio::test]
    async fn fetch_profile_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "login": "octocat" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let error = client.fetch_profile("gho_token").await.unwrap_err();
        assert!(matches!(error, AppError::Profile(message) if message.contains("decode user")));
    }

    #[tokio::test]
    async fn fetch_profile_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": 42, "login": "octocat" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_millis(200));
        let error = client.fetch_profile("gho_token").await.unwrap_err();
        assert!(matches!(error, AppError::Profile(message) if message.starts_with("request")));
    }
}
