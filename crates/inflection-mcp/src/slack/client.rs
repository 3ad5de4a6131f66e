use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Minimal Slack Web API client. Clone is cheap.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    pub fn new(base_url: &str, bot_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build Slack HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        })
    }

    /// Post `text` to `channel`, threaded under `thread_ts` when given.
    pub async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<()> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }

        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Slack")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Slack returned HTTP {}", status.as_u16());
        }

        let body: SlackResponse = response.json().await.context("Malformed Slack response")?;
        if !body.ok {
            bail!(
                "Slack rejected message: {}",
                body.error.as_deref().unwrap_or("unknown error")
            );
        }

        debug!(channel = channel, "Slack message posted");
        Ok(())
    }
}
