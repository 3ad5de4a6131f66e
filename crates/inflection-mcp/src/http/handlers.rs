use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use chrono::Utc;
use futures::StreamExt as _;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio_stream::{wrappers::BroadcastStream, Stream};
use tracing::{debug, info, warn};

use super::error::{HttpError, Result};
use super::AppState;
use crate::events::ServerEvent;
use crate::mcp::protocol::{PROTOCOL_VERSION, SERVER_NAME};
use crate::mcp::tools::{EmailReportArgs, ListJourneysArgs};
use crate::slack::{SlackAck, SlackEnvelope};

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(30);

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "tools": "/tools",
            "journeys": "/journeys",
            "reports": "/reports",
            "mcp": "/mcp",
            "sse": "/sse/events",
            "slack": "/slack/events"
        }
    }))
}

/// Liveness: 200 as long as the process serves requests.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let authenticated = state.mcp.tools().gateway().session().is_usable().await;
    Json(json!({
        "status": "healthy",
        "authenticated": authenticated,
        "sse_clients": state.events.subscriber_count(),
        "timestamp": Utc::now(),
    }))
}

/// Readiness: logs in if needed, 503 when Inflection.io rejects us.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.mcp.tools().gateway().ensure_authenticated().await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({"status": "ready", "session": session})),
        ),
        Err(e) => {
            warn!(error = %e, component = "inflection", "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "error": e.to_string()})),
            )
        }
    }
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.mcp.tools().list_tools() }))
}

pub async fn journeys(
    State(state): State<AppState>,
    body: std::result::Result<Json<ListJourneysArgs>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(args) = body.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    let content = state.mcp.tools().list_journeys(&args).await?;
    Ok(Json(json!({ "content": content })))
}

pub async fn reports(
    State(state): State<AppState>,
    body: std::result::Result<Json<EmailReportArgs>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(args) = body.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    let content = state.mcp.tools().email_reports(&args).await?;
    Ok(Json(json!({ "content": content })))
}

pub async fn mcp_info() -> Json<Value> {
    Json(json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": PROTOCOL_VERSION,
        "transport": "http",
        "usage": "POST JSON-RPC 2.0 messages to this endpoint"
    }))
}

/// One JSON-RPC message per request. Notifications get `202 Accepted`.
pub async fn mcp_message(State(state): State<AppState>, body: String) -> Response {
    match state.mcp.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

pub async fn sse_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "sse_endpoint": "/sse/events",
        "supported_events": ["connection", "health_check", "journey_update", "error"],
        "connection_count": state.events.subscriber_count(),
        "usage": "Connect to /sse/events to receive real-time updates"
    }))
}

pub async fn sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    info!(clients = state.events.subscriber_count() + 1, "SSE client connected");

    let live = BroadcastStream::new(state.events.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => Some(event),
            Err(e) => {
                // Lagged receivers skip what they missed
                debug!(error = %e, "SSE client lagged");
                None
            }
        }
    });

    let stream = futures::stream::once(async { ServerEvent::connection() })
        .chain(live)
        .filter_map(|event| async move { to_sse(&event).map(Ok::<_, Infallible>) })
        .take_until(shutdown_requested(state.shutdown.clone()));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
}

/// Resolves once shutdown is signalled. A dropped sender never resolves.
async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let signalled = rx.wait_for(|&stop| stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

fn to_sse(event: &ServerEvent) -> Option<SseEvent> {
    let data = serde_json::to_string(event).ok()?;
    Some(SseEvent::default().event(&event.event).id(&event.id).data(data))
}

pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    state
        .slack
        .verify(
            header(&headers, "x-slack-request-timestamp"),
            header(&headers, "x-slack-signature"),
            &body,
        )
        .map_err(|e| HttpError::Unauthorized(format!("Invalid Slack signature: {}", e)))?;

    let envelope: SlackEnvelope = serde_json::from_slice(&body)
        .map_err(|e| HttpError::BadRequest(format!("Invalid Slack payload: {}", e)))?;

    // Slack redelivers when we answer slowly; the first delivery is already running
    if let Some(retry) = header(&headers, "x-slack-retry-num") {
        if !matches!(envelope, SlackEnvelope::UrlVerification { .. }) {
            debug!(retry = retry, "Ignoring Slack retry");
            return Ok(Json(SlackAck::Ignored.to_json()));
        }
    }

    let (ack, job) = state.slack.route(envelope);
    if let Some(job) = job {
        state.slack.dispatch(job);
    }
    Ok(Json(ack.to_json()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, Router};
    use http_body_util::BodyExt;
    use mockito::{Server, ServerGuard};
    use tower::ServiceExt;

    use super::*;
    use crate::events::EventBroadcaster;
    use crate::http::{router, AppState};
    use crate::mcp::tools::tests::{handler_for, mock_journeys, mock_login};
    use crate::mcp::McpServer;
    use crate::slack::{SignatureVerifier, SlackAdapter};

    fn app(server: &ServerGuard, secret: Option<&str>) -> Router {
        let tools = handler_for(server);
        let slack = SlackAdapter::new(tools.clone(), None, secret.map(SignatureVerifier::new));
        let (_, shutdown) = tokio::sync::watch::channel(false);
        router(AppState::new(McpServer::new(tools), EventBroadcaster::default(), slack, shutdown))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let server = Server::new_async().await;

        let (status, body) = send(app(&server, None), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "inflection-mcp");

        let (status, body) = send(app(&server, None), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["authenticated"], false);
    }

    #[tokio::test]
    async fn test_ready_reflects_login() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(403)
            .create_async()
            .await;
        let (status, body) = send(app(&server, None), get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");

        let mut ok = Server::new_async().await;
        mock_login(&mut ok).await;
        let (status, body) = send(app(&ok, None), get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert!(body["session"].get("access_token").is_none());
    }

    #[tokio::test]
    async fn test_tools_endpoint() {
        let server = Server::new_async().await;
        let (_, body) = send(app(&server, None), get("/tools")).await;
        assert_eq!(body["tools"][0]["name"], "list_journeys");
        assert!(body["tools"][1]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_post_journeys() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        mock_journeys(&mut server).await;

        let (status, body) = send(app(&server, None), post_json("/journeys", json!({"page_size": 10}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["content"].as_str().unwrap().contains("**Welcome**"));
    }

    #[tokio::test]
    async fn test_reports_validation_is_400() {
        let server = Server::new_async().await;

        let (status, body) = send(
            app(&server, None),
            post_json("/reports", json!({"journey_id": "a b"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid journey ID format");

        let (status, _) = send(app(&server, None), post_json("/reports", json!({"nope": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_failure_is_502() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(401)
            .with_body("nope")
            .create_async()
            .await;

        let (status, body) = send(app(&server, None), post_json("/journeys", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("Authentication error"));
    }

    #[tokio::test]
    async fn test_mcp_over_http() {
        let server = Server::new_async().await;

        let (status, body) = send(
            app(&server, None),
            post_json("/mcp", json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["protocolVersion"], PROTOCOL_VERSION);

        let (status, body) = send(
            app(&server, None),
            post_json("/mcp", json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_null());

        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(Body::from("{not json"))
            .unwrap();
        let (_, body) = send(app(&server, None), request).await;
        assert_eq!(body["error"]["code"], -32700);

        let (_, body) = send(app(&server, None), get("/mcp")).await;
        assert_eq!(body["transport"], "http");
    }

    #[tokio::test]
    async fn test_sse_info_points_at_stream() {
        let server = Server::new_async().await;
        let (status, body) = send(app(&server, None), get("/sse")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sse_endpoint"], "/sse/events");
        assert_eq!(body["connection_count"], 0);
        assert!(body["supported_events"]
            .as_array()
            .unwrap()
            .contains(&json!("journey_update")));
    }

    #[tokio::test]
    async fn test_sse_starts_with_connection_event() {
        let server = Server::new_async().await;
        let response = app(&server, None).oneshot(get("/sse/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.contains("event: connection"));
    }

    #[tokio::test]
    async fn test_slack_signature_is_enforced() {
        let server = Server::new_async().await;
        let payload = json!({"type": "url_verification", "challenge": "c-123"}).to_string();

        let unsigned = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .body(Body::from(payload.clone()))
            .unwrap();
        let (status, _) = send(app(&server, Some("shh")), unsigned).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let ts = Utc::now().timestamp().to_string();
        let signature = SignatureVerifier::new("shh").sign(&ts, payload.as_bytes()).unwrap();
        let signed = Request::builder()
            .method("POST")
            .uri("/slack/events")
            .header("x-slack-request-timestamp", &ts)
            .header("x-slack-signature", &signature)
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = send(app(&server, Some("shh")), signed).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"challenge": "c-123"}));
    }

    #[tokio::test]
    async fn test_slack_retries_are_ignored() {
        let server = Server::new_async().await;
        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "channel_type": "im", "channel": "D1", "text": "help"}
        });
        let mut request = post_json("/slack/events", payload);
        request
            .headers_mut()
            .insert("x-slack-retry-num", "1".parse().unwrap());

        let (_, body) = send(app(&server, None), request).await;
        assert_eq!(body, json!({"status": "ignored"}));
    }
}
