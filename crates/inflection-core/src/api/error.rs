use thiserror::Error;

/// Failure of a single outbound call that is not an authentication problem.
#[derive(Error, Debug)]
pub enum RequestFailure {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token was rejected")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl RequestFailure {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => RequestFailure::Unauthorized,
            403 => RequestFailure::AccessDenied(truncated),
            404 => RequestFailure::NotFound(truncated),
            429 => RequestFailure::RateLimited,
            500..=599 => RequestFailure::ServerError(truncated),
            _ => RequestFailure::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestFailure::Unauthorized)
    }
}

/// Errors surfaced by the authenticated gateway.
///
/// `Auth` and `Reauth` mean the credentials must be fixed externally;
/// `Request` may be transient.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Re-authentication failed after the token was rejected: {0}")]
    Reauth(String),

    #[error("Request failed: {0}")]
    Request(#[from] RequestFailure),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_) | ApiError::Reauth(_))
    }
}
