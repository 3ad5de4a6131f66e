//! HTTP transport for the Inflection.io REST API.
//!
//! `ApiClient` owns the pooled `reqwest::Client`, performs the login call and
//! sends request descriptors with a bearer token. Transport failures are
//! retried here with exponential backoff; 401 handling lives in `Gateway`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::config::{endpoints, ApiConfig};
use crate::models::LoginResponse;

use super::request::{Method, RequestDescriptor};
use super::{ApiError, RequestFailure};

/// API client for Inflection.io.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: Arc<ApiConfig>) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Authenticate with Inflection.io. Every failure is an `ApiError::Auth`.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.config.auth_url(endpoints::LOGIN);
        let body = json!({
            "email": credentials.email(),
            "password": credentials.secret(),
        });

        let response = self
            .send_with_retry(&url, || self.client.post(&url).json(&body))
            .await
            .map_err(|e| ApiError::Auth(format!("login request failed: {}", e)))?;

        let response = Self::check_response(response)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Auth(format!("failed to read login response: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| ApiError::Auth(format!("malformed login response: {}", e)))
    }

    /// Send one descriptor with the given bearer token.
    /// Non-success statuses come back as `RequestFailure`, 401 included.
    pub async fn send(
        &self,
        request: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<Response, RequestFailure> {
        let response = self
            .send_with_retry(&request.url, || self.build(request, token))
            .await?;
        Self::check_response(response).await
    }

    fn build(&self, request: &RequestDescriptor, token: Option<&str>) -> RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Retry transport failures (timeouts, refused connections) with
    /// exponential backoff. HTTP statuses are never retried here.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, reqwest::Error>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = self.config.initial_backoff_ms;

        loop {
            debug!(url = url, retry = retries, "Sending request");
            match build().send().await {
                Ok(response) => {
                    debug!(url = url, status = response.status().as_u16(), "Response received");
                    return Ok(response);
                }
                Err(e) if e.is_builder() => return Err(e),
                Err(e) => {
                    retries += 1;
                    if retries > self.config.max_network_retries {
                        warn!(url = url, error = %e, "Request failed, retries exhausted");
                        return Err(e);
                    }
                    warn!(url = url, error = %e, retry = retries, backoff_ms = backoff_ms, "Request failed, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2); // Exponential backoff
                }
            }
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, RequestFailure> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RequestFailure::from_status(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(server: &mockito::ServerGuard) -> Arc<ApiConfig> {
        let mut config = ApiConfig::with_base_url(&server.url());
        config.max_network_retries = 0;
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/accounts/login")
            .match_body(mockito::Matcher::Json(json!({
                "email": "ops@example.com",
                "password": "hunter2"
            })))
            .with_status(200)
            .with_body(r#"{"account": {"id": 7}, "session": {"access_token": "tok"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ApiClient::new(stub_config(&server)).unwrap();
        let creds = Credentials::new("ops@example.com", "hunter2").unwrap();
        let resp = client.login(&creds).await.unwrap();

        assert_eq!(resp.session.access_token, "tok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejection_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(403)
            .with_body("bad credentials")
            .create_async()
            .await;

        let client = ApiClient::new(stub_config(&server)).unwrap();
        let creds = Credentials::new("ops@example.com", "wrong").unwrap();
        match client.login(&creds).await {
            Err(ApiError::Auth(msg)) => assert!(msg.contains("bad credentials")),
            other => panic!("expected auth error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_login_malformed_body_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(stub_config(&server)).unwrap();
        let creds = Credentials::new("ops@example.com", "hunter2").unwrap();
        assert!(matches!(client.login(&creds).await, Err(ApiError::Auth(_))));
    }

    #[tokio::test]
    async fn test_send_attaches_bearer_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v3/campaigns/J1/stats")
            .match_header("authorization", "Bearer tok")
            .match_query(mockito::Matcher::UrlEncoded("view".into(), "aggregate".into()))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let config = stub_config(&server);
        let client = ApiClient::new(config.clone()).unwrap();
        let request = RequestDescriptor::get(config.campaign_v3_url("/campaigns/J1/stats"))
            .with_query("view", "aggregate");

        client.send(&request, Some("tok")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_maps_401() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/campaigns/campaign.list")
            .with_status(401)
            .create_async()
            .await;

        let config = stub_config(&server);
        let client = ApiClient::new(config.clone()).unwrap();
        let request = RequestDescriptor::post(config.campaign_url(endpoints::JOURNEYS), json!({}));

        let err = client.send(&request, Some("tok")).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_network_failure_is_retried_then_surfaced() {
        // Nothing listens on port 9 of localhost
        let mut config = ApiConfig::with_base_url("http://127.0.0.1:9");
        config.max_network_retries = 2;
        config.initial_backoff_ms = 1;
        let config = Arc::new(config);
        let client = ApiClient::new(config.clone()).unwrap();
        let request = RequestDescriptor::get(config.campaign_url("/anything"));

        let err = client.send(&request, None).await.unwrap_err();
        assert!(matches!(err, RequestFailure::Network(_)));
    }
}
