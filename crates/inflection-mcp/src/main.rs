mod config;
mod events;
mod http;
mod mcp;
mod slack;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use inflection_core::{Credentials, Gateway};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Command, Config, LogFormat, LoggingConfig};
use events::EventBroadcaster;
use mcp::{McpServer, ToolHandler};
use slack::{SignatureVerifier, SlackAdapter, SlackClient};

/// Logs go to stderr; stdout is reserved for MCP stdio traffic.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // RUST_LOG overrides, e.g. RUST_LOG=inflection_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "inflection-mcp.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    match config.log_format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(io::stderr)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(io::stderr)).init(),
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::parse();
    let _log_guard = init_tracing(&config.logging)?;

    let credentials = Credentials::new(
        config.inflection.email.as_str(),
        config.inflection.password.as_str(),
    )
    .context("Invalid Inflection.io credentials")?;
    let gateway = Gateway::new(config.inflection.api_config(), credentials)?;
    let server = McpServer::new(ToolHandler::new(gateway));

    match config.command {
        None | Some(Command::Stdio) => mcp::run_stdio(server).await,
        Some(Command::Serve) => serve(&config, server).await,
    }
}

async fn serve(config: &Config, server: McpServer) -> Result<()> {
    let gateway = server.tools().gateway().clone();
    let events = EventBroadcaster::default();

    let slack_client = config
        .slack
        .bot_token
        .as_deref()
        .map(|token| SlackClient::new(&config.slack.api_base_url, token))
        .transpose()?;
    let verifier = config.slack.signing_secret.as_deref().map(SignatureVerifier::new);
    let slack = SlackAdapter::new(server.tools().clone(), slack_client, verifier);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx.clone());

    let tasks = events::spawn_publishers(
        gateway,
        events.clone(),
        Duration::from_secs(config.server.health_interval_secs),
        Duration::from_secs(config.server.journey_interval_secs),
        shutdown_rx.clone(),
    );

    let app = http::router(http::AppState::new(server, events, slack, shutdown_rx.clone()));

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    info!(address = %listener.local_addr()?, "listening");

    let mut server_rx = shutdown_rx.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_rx.wait_for(|&stop| stop).await;
        })
        .await;
    if let Err(ref e) = result {
        error!(error = %e, "Server error");
    }

    // Stop background tasks even when the server exited on its own
    let _ = shutdown_tx.send(true);
    tokio::select! {
        _ = futures::future::join_all(tasks) => {
            info!("Background tasks finished");
        }
        _ = tokio::time::sleep(Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            warn!("Timeout waiting for background tasks to finish");
        }
    }

    result.context("HTTP server failed")
}

fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }

        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
