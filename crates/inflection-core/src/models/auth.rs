use serde::Deserialize;

/// Body returned by `POST /accounts/login`.
///
/// Only the fields the gateway uses are modelled; the upstream also sends
/// roles and organisation details.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub account: Option<LoginAccount>,
    pub session: LoginSession,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginAccount {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_expires_at: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}
