//! HTTP surface: REST endpoints, MCP over HTTP, SSE and the Slack webhook.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::events::EventBroadcaster;
use crate::mcp::McpServer;
use crate::slack::SlackAdapter;


#[derive(Clone)]
pub struct AppState {
    pub mcp: McpServer,
    pub events: EventBroadcaster,
    pub slack: Arc<SlackAdapter>,
    /// Ends long-lived SSE streams so graceful shutdown can complete
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        mcp: McpServer,
        events: EventBroadcaster,
        slack: SlackAdapter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            mcp,
            events,
            slack: Arc::new(slack),
            shutdown,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/tools", get(handlers::list_tools))
        .route("/journeys", post(handlers::journeys))
        .route("/reports", post(handlers::reports))
        .route("/mcp", get(handlers::mcp_info).post(handlers::mcp_message))
        .route("/sse", get(handlers::sse_info))
        .route("/sse/events", get(handlers::sse))
        .route("/slack/events", post(handlers::slack_events))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
