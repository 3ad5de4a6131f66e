//! Slack Events API adapter.
//!
//! Inbound events are acknowledged immediately; the command itself runs in a
//! spawned task and the answer is posted back in the originating thread.

pub mod client;
pub mod command;
pub mod signature;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::mcp::tools::{failure_text, EmailReportArgs, ListJourneysArgs};
use crate::mcp::ToolHandler;

pub use client::SlackClient;
pub use command::SlackCommand;
pub use signature::{SignatureError, SignatureVerifier};

use command::{strip_mention, to_mrkdwn, HELP_TEXT};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// Immediate answer to Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackAck {
    Challenge(String),
    Ignored,
    NoMessage,
    Processing,
    UnknownEventType,
}

impl SlackAck {
    pub fn to_json(&self) -> Value {
        match self {
            SlackAck::Challenge(challenge) => json!({ "challenge": challenge }),
            SlackAck::Ignored => json!({ "status": "ignored" }),
            SlackAck::NoMessage => json!({ "status": "no_message" }),
            SlackAck::Processing => json!({ "status": "processing" }),
            SlackAck::UnknownEventType => json!({ "status": "unknown_event_type" }),
        }
    }
}

/// A command waiting to be run and answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackJob {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub command: SlackCommand,
}

pub struct SlackAdapter {
    tools: ToolHandler,
    client: Option<SlackClient>,
    verifier: Option<SignatureVerifier>,
}

impl SlackAdapter {
    pub fn new(tools: ToolHandler, client: Option<SlackClient>, verifier: Option<SignatureVerifier>) -> Self {
        if client.is_none() {
            warn!("SLACK_BOT_TOKEN not set, Slack replies will be dropped");
        }
        if verifier.is_none() {
            warn!("SLACK_SIGNING_SECRET not set, Slack requests are not verified");
        }
        Self { tools, client, verifier }
    }

    /// Verify request signing when a secret is configured.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        match self.verifier {
            Some(ref verifier) => {
                verifier.verify(timestamp, signature, body, chrono::Utc::now().timestamp())
            }
            None => Ok(()),
        }
    }

    /// Decide how to answer an envelope and whether a command must run.
    pub fn route(&self, envelope: SlackEnvelope) -> (SlackAck, Option<SlackJob>) {
        match envelope {
            SlackEnvelope::UrlVerification { challenge } => (SlackAck::Challenge(challenge), None),
            SlackEnvelope::EventCallback { event } => route_event(event),
            SlackEnvelope::Other => (SlackAck::UnknownEventType, None),
        }
    }

    /// Run the job in the background and post the answer.
    pub fn dispatch(self: &std::sync::Arc<Self>, job: SlackJob) {
        let adapter = self.clone();
        tokio::spawn(async move {
            if let Err(e) = adapter.execute(&job).await {
                error!(channel = %job.channel, error = %e, "Failed to answer Slack message");
            }
        });
    }

    pub async fn execute(&self, job: &SlackJob) -> anyhow::Result<()> {
        info!(channel = %job.channel, command = ?job.command, "Running Slack command");
        let reply = self.run_command(&job.command).await;

        match self.client {
            Some(ref client) => {
                client
                    .post_message(&job.channel, &to_mrkdwn(&reply), job.thread_ts.as_deref())
                    .await
            }
            None => {
                debug!(channel = %job.channel, "No Slack bot token, reply dropped");
                Ok(())
            }
        }
    }

    pub async fn run_command(&self, command: &SlackCommand) -> String {
        match command {
            SlackCommand::Journeys { keyword } => {
                let args = ListJourneysArgs {
                    search_keyword: keyword.clone(),
                    ..ListJourneysArgs::default()
                };
                self.tools
                    .list_journeys(&args)
                    .await
                    .unwrap_or_else(|e| failure_text("list journeys", &e))
            }
            SlackCommand::Report {
                journey_id,
                start_date,
                end_date,
            } => {
                let args = EmailReportArgs {
                    journey_id: journey_id.clone(),
                    start_date: start_date.clone(),
                    end_date: end_date.clone(),
                    include_details: None,
                };
                self.tools
                    .email_reports(&args)
                    .await
                    .unwrap_or_else(|e| failure_text("retrieve email reports", &e))
            }
            SlackCommand::Help => HELP_TEXT.to_string(),
            SlackCommand::Unknown(text) => {
                format!("🤔 I didn't understand `{}`.\n\n{}", text, HELP_TEXT)
            }
        }
    }
}

fn route_event(event: SlackEvent) -> (SlackAck, Option<SlackJob>) {
    if event.kind != "message" && event.kind != "app_mention" {
        return (SlackAck::Ignored, None);
    }
    // Our own replies come back as bot messages
    if event.bot_id.is_some() || event.subtype.as_deref() == Some("bot_message") {
        return (SlackAck::Ignored, None);
    }
    if matches!(
        event.subtype.as_deref(),
        Some("message_changed") | Some("message_deleted")
    ) {
        return (SlackAck::Ignored, None);
    }

    let raw = event.text.as_deref().unwrap_or_default().trim();
    let is_dm = event.channel_type.as_deref() == Some("im");
    let text = match strip_mention(raw) {
        Some(rest) => rest,
        None if is_dm || event.kind == "app_mention" => raw,
        None => return (SlackAck::Ignored, None),
    };

    if text.is_empty() {
        return (SlackAck::NoMessage, None);
    }
    let Some(channel) = event.channel else {
        return (SlackAck::Ignored, None);
    };

    debug!(
        user = event.user.as_deref().unwrap_or("unknown"),
        channel = %channel,
        "Accepted Slack message"
    );
    let job = SlackJob {
        channel,
        thread_ts: event.thread_ts.or(event.ts),
        command: SlackCommand::parse(text),
    };
    (SlackAck::Processing, Some(job))
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::mcp::tools::tests::{handler_for, mock_journeys, mock_login};

    fn envelope(event: Value) -> SlackEnvelope {
        serde_json::from_value(json!({"type": "event_callback", "event": event})).unwrap()
    }

    fn adapter() -> SlackAdapter {
        let gateway = inflection_core::Gateway::new(
            inflection_core::ApiConfig::with_base_url("http://127.0.0.1:9"),
            inflection_core::Credentials::new("ops@example.com", "pw").unwrap(),
        )
        .unwrap();
        SlackAdapter::new(ToolHandler::new(gateway), None, None)
    }

    #[test]
    fn test_url_verification_echoes_challenge() {
        let envelope: SlackEnvelope =
            serde_json::from_value(json!({"type": "url_verification", "token": "t", "challenge": "abc"})).unwrap();
        let (ack, job) = adapter().route(envelope);
        assert_eq!(ack.to_json(), json!({"challenge": "abc"}));
        assert!(job.is_none());
    }

    #[test]
    fn test_unknown_envelope_type() {
        let envelope: SlackEnvelope = serde_json::from_value(json!({"type": "app_rate_limited"})).unwrap();
        let (ack, _) = adapter().route(envelope);
        assert_eq!(ack.to_json(), json!({"status": "unknown_event_type"}));
    }

    #[test]
    fn test_ignored_events() {
        let adapter = adapter();
        let cases = [
            json!({"type": "reaction_added"}),
            json!({"type": "message", "bot_id": "B1", "text": "<@U1> journeys", "channel": "C1"}),
            json!({"type": "message", "subtype": "message_changed", "channel": "C1"}),
            json!({"type": "message", "subtype": "message_deleted", "channel": "C1"}),
            json!({"type": "message", "text": "just chatting", "channel": "C1", "channel_type": "channel"}),
        ];
        for event in cases {
            let (ack, job) = adapter.route(envelope(event.clone()));
            assert_eq!(ack, SlackAck::Ignored, "event {event}");
            assert!(job.is_none());
        }
    }

    #[test]
    fn test_mention_in_channel_is_processed_in_thread() {
        let (ack, job) = adapter().route(envelope(json!({
            "type": "message",
            "text": "<@U0BOT> report j-1 2025-01-01 2025-01-31",
            "channel": "C1",
            "channel_type": "channel",
            "ts": "1700000000.0001"
        })));
        assert_eq!(ack.to_json(), json!({"status": "processing"}));
        let job = job.unwrap();
        assert_eq!(job.channel, "C1");
        assert_eq!(job.thread_ts.as_deref(), Some("1700000000.0001"));
        assert!(matches!(job.command, SlackCommand::Report { ref journey_id, .. } if journey_id == "j-1"));
    }

    #[test]
    fn test_direct_message_and_empty_mention() {
        let adapter = adapter();
        let (ack, job) = adapter.route(envelope(json!({
            "type": "message", "text": "help", "channel": "D1", "channel_type": "im",
            "ts": "1.0", "thread_ts": "0.5"
        })));
        assert_eq!(ack, SlackAck::Processing);
        assert_eq!(job.unwrap().thread_ts.as_deref(), Some("0.5"));

        let (ack, job) = adapter.route(envelope(json!({
            "type": "app_mention", "text": "<@U0BOT>  ", "channel": "C1"
        })));
        assert_eq!(ack.to_json(), json!({"status": "no_message"}));
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn test_execute_posts_journeys_to_thread() {
        let mut inflection = Server::new_async().await;
        mock_login(&mut inflection).await;
        mock_journeys(&mut inflection).await;

        let mut slack = Server::new_async().await;
        let post = slack
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"channel": "C1", "thread_ts": "1.0"})),
                Matcher::Regex(r"\*Welcome\*".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .expect(1)
            .create_async()
            .await;

        let adapter = SlackAdapter::new(
            handler_for(&inflection),
            Some(SlackClient::new(&slack.url(), "xoxb-test").unwrap()),
            None,
        );
        let job = SlackJob {
            channel: "C1".to_string(),
            thread_ts: Some("1.0".to_string()),
            command: SlackCommand::Journeys { keyword: None },
        };
        adapter.execute(&job).await.unwrap();
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_command_renders_failures() {
        let adapter = adapter();
        let reply = adapter
            .run_command(&SlackCommand::Report {
                journey_id: "bad id!".to_string(),
                start_date: None,
                end_date: None,
            })
            .await;
        assert_eq!(reply, "❌ Invalid journey ID format");

        let reply = adapter.run_command(&SlackCommand::Unknown("dance".to_string())).await;
        assert!(reply.starts_with("🤔 I didn't understand `dance`"));
    }
}
