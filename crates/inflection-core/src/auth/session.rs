use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::Credentials;
use crate::models::LoginResponse;

/// Assumed token lifetime when the login body carries no usable expiry.
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize)]
pub struct SessionData {
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    /// Advisory only: a 401 from upstream overrides it.
    pub expires_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    /// Build session data from a login body, rejecting an empty token.
    pub fn from_login(response: LoginResponse) -> Result<Self, String> {
        let session = response.session;
        if session.access_token.trim().is_empty() {
            return Err("login response contained an empty access token".to_string());
        }

        let now = Utc::now();
        let expires_at = session
            .access_expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES));

        Ok(Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at,
            user_id: response.account.and_then(|a| a.id).map(|id| id.to_string()),
            created_at: now,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer >= self.expires_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// The process-wide session. `None` means unauthenticated; every field is
/// replaced or cleared together.
#[derive(Debug, Default)]
pub struct Session {
    data: Option<SessionData>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_usable(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.data
            .as_ref()
            .map(|d| !d.access_token.is_empty() && !d.is_expired(now, buffer))
            .unwrap_or(false)
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.access_token.as_str())
    }

    pub fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    fn replace(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    fn clear(&mut self) {
        self.data = None;
    }
}

/// Owns the single session and serializes every read-check-login-write
/// sequence behind one async mutex, so at most one login is in flight.
pub struct SessionManager {
    client: ApiClient,
    refresh_buffer: Duration,
    session: Mutex<Session>,
}

impl SessionManager {
    pub fn new(client: ApiClient) -> Self {
        let refresh_buffer = client.config().refresh_buffer();
        Self {
            client,
            refresh_buffer,
            session: Mutex::new(Session::default()),
        }
    }

    /// True iff authenticated and the advisory expiry (minus the refresh
    /// buffer) has not passed.
    pub async fn is_usable(&self) -> bool {
        self.session.lock().await.is_usable(Utc::now(), self.refresh_buffer)
    }

    /// Copy of the current session, if any
    pub async fn snapshot(&self) -> Option<SessionData> {
        self.session.lock().await.data().cloned()
    }

    /// Log in and replace the session. Any failure clears it.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionData, ApiError> {
        let mut session = self.session.lock().await;
        self.login_locked(&mut session, credentials).await
    }

    /// Clear the session after an observed 401.
    pub async fn invalidate(&self) {
        let mut session = self.session.lock().await;
        if session.is_authenticated() {
            debug!("Invalidating session");
        }
        session.clear();
    }

    /// Return a usable token, logging in first if needed. Callers that
    /// arrive while a login is running wait on the lock and reuse its result.
    pub async fn token_or_login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        self.session_or_login(credentials)
            .await
            .map(|data| data.access_token)
    }

    /// Like `token_or_login`, but returns the whole session as seen inside
    /// the same critical section.
    pub async fn session_or_login(&self, credentials: &Credentials) -> Result<SessionData, ApiError> {
        let mut session = self.session.lock().await;
        if session.is_usable(Utc::now(), self.refresh_buffer) {
            if let Some(data) = session.data() {
                return Ok(data.clone());
            }
        }

        self.login_locked(&mut session, credentials).await
    }

    /// Handle a 401 for `rejected_token`: invalidate and log in again. If a
    /// concurrent caller already replaced the rejected token, reuse theirs.
    pub async fn relogin_after_rejection(
        &self,
        rejected_token: &str,
        credentials: &Credentials,
    ) -> Result<String, ApiError> {
        let mut session = self.session.lock().await;

        if session.is_usable(Utc::now(), self.refresh_buffer) {
            if let Some(current) = session.token() {
                if current != rejected_token {
                    debug!("Token already refreshed by a concurrent request");
                    return Ok(current.to_string());
                }
            }
        }

        session.clear();
        match self.login_locked(&mut session, credentials).await {
            Ok(data) => Ok(data.access_token),
            Err(ApiError::Auth(msg)) => Err(ApiError::Reauth(msg)),
            Err(e) => Err(e),
        }
    }

    async fn login_locked(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<SessionData, ApiError> {
        info!(email = %credentials.email(), "Logging in to Inflection.io");

        let result = match self.client.login(credentials).await {
            Ok(response) => SessionData::from_login(response).map_err(ApiError::Auth),
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => {
                info!(
                    user_id = data.user_id.as_deref().unwrap_or("unknown"),
                    expires_in_minutes = data.minutes_until_expiry(),
                    "Login successful"
                );
                session.replace(data.clone());
                Ok(data)
            }
            Err(e) => {
                warn!(error = %e, "Login failed, clearing session");
                session.clear();
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, data: SessionData) {
        self.session.lock().await.replace(data);
    }
}

#[cfg(test)]
pub(crate) fn test_session(token: &str, expires_in: Duration) -> SessionData {
    let now = Utc::now();
    SessionData {
        access_token: token.to_string(),
        refresh_token: None,
        expires_at: now + expires_in,
        user_id: Some("344".to_string()),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ApiConfig;
    use crate::models::{LoginAccount, LoginSession};

    fn login_response(token: &str, expires: Option<&str>) -> LoginResponse {
        LoginResponse {
            account: Some(LoginAccount {
                id: Some(344),
                email: None,
                name: None,
            }),
            session: LoginSession {
                access_token: token.to_string(),
                refresh_token: Some("refresh".to_string()),
                access_expires_at: expires.map(str::to_string),
                session_id: None,
            },
        }
    }

    #[test]
    fn test_from_login_parses_expiry() {
        let data = SessionData::from_login(login_response("tok", Some("2030-01-01T00:00:00+00:00")))
            .unwrap();
        assert_eq!(data.expires_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert_eq!(data.user_id.as_deref(), Some("344"));
    }

    #[test]
    fn test_from_login_defaults_bad_expiry_to_an_hour() {
        let data = SessionData::from_login(login_response("tok", Some("not a date"))).unwrap();
        let minutes = data.minutes_until_expiry();
        assert!((58..=60).contains(&minutes), "got {minutes}");
    }

    #[test]
    fn test_from_login_rejects_empty_token() {
        assert!(SessionData::from_login(login_response("  ", None)).is_err());
    }

    #[test]
    fn test_usability_respects_buffer() {
        let now = Utc::now();
        let mut session = Session::default();
        assert!(!session.is_usable(now, Duration::zero()));

        session.replace(test_session("tok", Duration::minutes(3)));
        assert!(session.is_usable(now, Duration::zero()));
        assert!(!session.is_usable(now, Duration::minutes(5)));

        session.clear();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_clears_everything() {
        let client = ApiClient::new(Arc::new(ApiConfig::default())).unwrap();
        let manager = SessionManager::new(client);
        manager.seed(test_session("tok", Duration::hours(1))).await;
        assert!(manager.is_usable().await);

        manager.invalidate().await;
        assert!(!manager.is_usable().await);
        assert!(manager.snapshot().await.is_none());
    }
}
