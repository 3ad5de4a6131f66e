use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use inflection_core::config::{
    ApiConfig, DEFAULT_AUTH_BASE_URL, DEFAULT_CAMPAIGN_BASE_URL, DEFAULT_CAMPAIGN_V3_BASE_URL,
};

#[derive(Clone, Debug, Parser)]
#[command(version, about = "MCP, HTTP and Slack front-ends for Inflection.io journeys and email reports", long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub inflection: InflectionConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub slack: SlackConfig,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default)
    Stdio,
    /// Serve the HTTP API, MCP over HTTP, SSE events and the Slack webhook
    Serve,
}

#[derive(Clone, Debug, Args)]
pub struct InflectionConfig {
    /// Inflection.io account email
    #[arg(long, env = "INFLECTION_EMAIL")]
    pub email: String,

    /// Inflection.io account password
    #[arg(long, env = "INFLECTION_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Auth API base URL
    #[arg(long, env = "INFLECTION_API_BASE_URL_AUTH", default_value = DEFAULT_AUTH_BASE_URL)]
    pub auth_base_url: String,

    /// Campaign API (v2) base URL
    #[arg(long, env = "INFLECTION_API_BASE_URL_CAMPAIGN", default_value = DEFAULT_CAMPAIGN_BASE_URL)]
    pub campaign_base_url: String,

    /// Campaign API (v3) base URL, used for bounce statistics
    #[arg(long, env = "INFLECTION_API_BASE_URL_CAMPAIGN_V3", default_value = DEFAULT_CAMPAIGN_V3_BASE_URL)]
    pub campaign_v3_base_url: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "INFLECTION_API_TIMEOUT_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Retries for transport failures before a call gives up
    #[arg(long, env = "INFLECTION_API_MAX_RETRIES", default_value_t = 3)]
    pub max_network_retries: u32,
}

impl InflectionConfig {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            auth_base_url: self.auth_base_url.clone(),
            campaign_base_url: self.campaign_base_url.clone(),
            campaign_v3_base_url: self.campaign_v3_base_url.clone(),
            timeout_secs: self.timeout_secs,
            max_network_retries: self.max_network_retries,
            ..ApiConfig::default()
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds between SSE health check events
    #[arg(long, env = "SSE_HEALTH_INTERVAL_SECS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub health_interval_secs: u64,

    /// Seconds between SSE journey update events
    #[arg(long, env = "SSE_JOURNEY_INTERVAL_SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub journey_interval_secs: u64,

    /// Seconds to wait for background tasks on shutdown
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct SlackConfig {
    /// Bot token used to post replies (xoxb-...)
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Signing secret used to verify inbound Slack requests
    #[arg(long, env = "SLACK_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_BASE_URL", default_value = "https://slack.com/api", hide = true)]
    pub api_base_url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct LoggingConfig {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Also write daily-rotated log files into this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}
