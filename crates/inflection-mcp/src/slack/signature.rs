//! Slack request signing (`X-Slack-Signature`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v0";

/// Requests older than this are rejected as replays.
pub const MAX_TIMESTAMP_AGE_SECS: i64 = 60 * 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid request timestamp")]
    InvalidTimestamp,

    #[error("request timestamp is too old")]
    StaleTimestamp,

    #[error("malformed signature")]
    Malformed,

    #[error("signature mismatch")]
    Mismatch,

    #[error("invalid signing secret")]
    InvalidKey,
}

pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Check `signature` (`v0=<hex>`) against `v0:{timestamp}:{body}`.
    /// `now` is unix seconds.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader("X-Slack-Request-Timestamp"))?;
        let signature = signature.ok_or(SignatureError::MissingHeader("X-Slack-Signature"))?;

        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if now.abs_diff(ts) > MAX_TIMESTAMP_AGE_SECS.unsigned_abs() {
            return Err(SignatureError::StaleTimestamp);
        }

        let expected = signature
            .strip_prefix("v0=")
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(SignatureError::Malformed)?;

        self.mac_for(timestamp.trim(), body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Hex signature header value for a request; used by tests and local tooling.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac_for(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{}={}", VERSION, hex::encode(digest)))
    }

    fn mac_for(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }
}
