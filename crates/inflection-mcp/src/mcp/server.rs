//! Transport-independent MCP dispatcher.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::protocol::{InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::tools::ToolHandler;

#[derive(Clone)]
pub struct McpServer {
    tools: ToolHandler,
}

impl McpServer {
    pub fn new(tools: ToolHandler) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolHandler {
        &self.tools
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(raw) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                ));
            }
        };
        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        if request.is_notification() {
            debug!(method = %request.method, "Received notification");
            return None;
        }

        debug!(method = %request.method, "Handling request");
        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => Self::serialize(id, &InitializeResult::default()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.tools.list_tools() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };
        Some(response)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(params) = params.as_object() else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("params must be an object"));
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing 'name' field"));
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.tools.call(name, arguments).await {
            Ok(result) => Self::serialize(id, &result),
            Err(e) => {
                warn!(tool = name, error = %e, "Rejected tool call");
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string()))
            }
        }
    }

    fn serialize<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(
                id,
                JsonRpcError::internal_error(format!("Serialization error: {}", e)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;
    use crate::mcp::tools::tests::{handler_for, mock_journeys, mock_login};

    async fn server() -> (mockito::ServerGuard, McpServer) {
        let mock = Server::new_async().await;
        let server = McpServer::new(handler_for(&mock));
        (mock, server)
    }

    #[tokio::test]
    async fn test_initialize() {
        let (_mock, server) = server().await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18"}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-06-18");
        assert_eq!(result["serverInfo"]["name"], "inflection-mcp");
        assert_eq!(response.id, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let (_mock, server) = server().await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_error_codes() {
        let (_mock, server) = server().await;

        let parse = server.handle_message("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, -32700);
        assert_eq!(parse.id, None);

        let unknown = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, -32601);

        let bad = server
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(bad.error.unwrap().code, -32602);

        let unknown_tool = server
            .handle_message(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope"}}"#)
            .await
            .unwrap();
        assert_eq!(unknown_tool.error.unwrap().code, -32602);

        let version = server
            .handle_message(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(version.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_ping_and_tools_list() {
        let (_mock, server) = server().await;
        let ping = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(ping.result, Some(json!({})));

        let list = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 2);
    }

    #[tokio::test]
    async fn test_tools_call_round_trip() {
        let (mut mock, server) = server().await;
        mock_login(&mut mock).await;
        mock_journeys(&mut mock).await;

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list_journeys","arguments":{"search_keyword":"Wel"}}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("matching 'Wel'"));
    }
}
