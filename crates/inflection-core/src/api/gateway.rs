//! Authenticated request executor.
//!
//! `Gateway` decorates every call with the cached bearer token and applies
//! the re-authentication contract:
//!
//! 1. No usable session: log in first. A failed login fails the call with
//!    `ApiError::Auth` and no business request is sent.
//! 2. A 401 invalidates the session, logs in once more (`ApiError::Reauth`
//!    on failure) and retries the request exactly once.
//! 3. A second 401, or any other failure on the retry, is returned as
//!    `ApiError::Request`. Non-401 statuses are never retried.
//!
//! Transport retries (timeouts, refused connections) are a separate policy
//! handled inside `ApiClient`.

use std::sync::Arc;

use anyhow::Result;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{Credentials, SessionData, SessionManager};
use crate::config::ApiConfig;

use super::request::RequestDescriptor;
use super::{ApiClient, ApiError, RequestFailure};

/// Shared handle to the authenticated gateway. Clone is cheap.
#[derive(Clone)]
pub struct Gateway {
    client: ApiClient,
    session: Arc<SessionManager>,
    credentials: Arc<Credentials>,
}

impl Gateway {
    pub fn new(config: ApiConfig, credentials: Credentials) -> Result<Self> {
        let client = ApiClient::new(Arc::new(config))?;
        let session = Arc::new(SessionManager::new(client.clone()));
        Ok(Self {
            client,
            session,
            credentials: Arc::new(credentials),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        self.client.config()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Make sure a usable session exists, logging in if needed.
    pub async fn ensure_authenticated(&self) -> Result<SessionData, ApiError> {
        self.session.session_or_login(&self.credentials).await
    }

    /// Perform one logical call with at most one retry after re-login.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Response, ApiError> {
        let token = self.session.token_or_login(&self.credentials).await?;

        match self.client.send(request, Some(&token)).await {
            Ok(response) => Ok(response),
            Err(RequestFailure::Unauthorized) => {
                warn!(url = %request.url, "Token rejected, re-authenticating");
                let fresh = self
                    .session
                    .relogin_after_rejection(&token, &self.credentials)
                    .await?;

                match self.client.send(request, Some(&fresh)).await {
                    Ok(response) => {
                        debug!(url = %request.url, "Retry after re-authentication succeeded");
                        Ok(response)
                    }
                    Err(RequestFailure::Unauthorized) => {
                        warn!(url = %request.url, "Token rejected again after re-authentication");
                        self.session.invalidate().await;
                        Err(ApiError::Request(RequestFailure::Unauthorized))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `execute` and decode the JSON body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let text = response.text().await.map_err(RequestFailure::from)?;
        serde_json::from_str(&text).map_err(|e| {
            RequestFailure::InvalidResponse(format!("failed to parse response from {}: {}", request.url, e))
                .into()
        })
    }
}
