//! Upstream API configuration.
//!
//! `ApiConfig` holds the Inflection.io base URLs, timeouts and retry policy.
//! Defaults point at the production API; the binary overrides them from
//! CLI flags and environment variables.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Default Inflection.io auth API base URL
pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.inflection.io/api/v1";

/// Default Inflection.io campaign API base URL (v2)
pub const DEFAULT_CAMPAIGN_BASE_URL: &str = "https://campaign.inflection.io/api/v2";

/// Default Inflection.io campaign API base URL (v3, bounce stats)
pub const DEFAULT_CAMPAIGN_V3_BASE_URL: &str = "https://campaign.inflection.io/api/v3";

/// HTTP request timeout in seconds.
/// Report endpoints can take a while on large journeys.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Re-login this long before the advisory expiry to avoid racing a token
/// that dies mid-request.
const DEFAULT_REFRESH_BUFFER_SECS: i64 = 5 * 60;

/// Retries for transport-level failures (timeouts, refused connections).
const DEFAULT_MAX_NETWORK_RETRIES: u32 = 3;

/// Initial backoff before a network retry; doubles on each attempt.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

/// The report endpoints expect timestamps in IST.
const DEFAULT_REPORT_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const DEFAULT_USER_AGENT: &str = concat!("inflection-mcp/", env!("CARGO_PKG_VERSION"));

/// Fixed upstream endpoint paths.
pub mod endpoints {
    pub const LOGIN: &str = "/accounts/login";
    pub const JOURNEYS: &str = "/campaigns/campaign.list";
    pub const REPORT_RUNS: &str = "/campaigns/reports/runs.list";
    pub const AGGREGATE_STATS: &str = "/campaigns/reports/stats.aggregate";
    pub const RECIPIENT_ENGAGEMENT: &str = "/campaigns/reports/stats.recipient_engagement";
    pub const TOP_EMAIL_CLIENT_CLICK: &str = "/campaigns/reports/stats.top_email_client.click";
    pub const TOP_EMAIL_CLIENT_OPEN: &str = "/campaigns/reports/stats.top_email_client.open";
    pub const TOP_LINK: &str = "/campaigns/reports/stats.top_link";

    /// v3 bounce stats path for a campaign
    pub fn bounce_stats(campaign_id: &str) -> String {
        format!("/campaigns/{}/stats", campaign_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub auth_base_url: String,
    pub campaign_base_url: String,
    pub campaign_v3_base_url: String,
    pub timeout_secs: u64,
    pub refresh_buffer_secs: i64,
    pub max_network_retries: u32,
    pub initial_backoff_ms: u64,
    pub report_utc_offset_secs: i32,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            campaign_base_url: DEFAULT_CAMPAIGN_BASE_URL.to_string(),
            campaign_v3_base_url: DEFAULT_CAMPAIGN_V3_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            max_network_retries: DEFAULT_MAX_NETWORK_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            report_utc_offset_secs: DEFAULT_REPORT_UTC_OFFSET_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    /// Point every base URL at one host. Used against stub servers.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_base_url: format!("{}/auth", base),
            campaign_base_url: format!("{}/v2", base),
            campaign_v3_base_url: format!("{}/v3", base),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_buffer_secs.max(0))
    }

    /// Offset applied to report date ranges; falls back to UTC if the
    /// configured value is out of range.
    pub fn report_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.report_utc_offset_secs)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}{}", self.auth_base_url.trim_end_matches('/'), path)
    }

    pub fn campaign_url(&self, path: &str) -> String {
        format!("{}{}", self.campaign_base_url.trim_end_matches('/'), path)
    }

    pub fn campaign_v3_url(&self, path: &str) -> String {
        format!("{}{}", self.campaign_v3_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let config = ApiConfig {
            campaign_base_url: "https://example.com/api/v2/".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(
            config.campaign_url(endpoints::JOURNEYS),
            "https://example.com/api/v2/campaigns/campaign.list"
        );
    }

    #[test]
    fn test_default_offset_is_ist() {
        let offset = ApiConfig::default().report_offset();
        assert_eq!(offset.to_string(), "+05:30");
    }

    #[test]
    fn test_with_base_url() {
        let config = ApiConfig::with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.auth_url(endpoints::LOGIN), "http://127.0.0.1:1234/auth/accounts/login");
        assert_eq!(
            config.campaign_v3_url(&endpoints::bounce_stats("J1")),
            "http://127.0.0.1:1234/v3/campaigns/J1/stats"
        );
    }
}
