//! The two tools exposed on every surface.
//!
//! `ToolHandler` owns the gateway, validates arguments and renders each
//! operation's result (or failure) as text. MCP, HTTP and Slack all go
//! through it so the wording stays identical across front-ends.

use inflection_core::{
    get_email_reports, list_journeys, Gateway, JourneyQuery, OperationError, ReportRequest,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::protocol::{CallToolResult, Tool};

pub const LIST_JOURNEYS: &str = "list_journeys";
pub const GET_EMAIL_REPORTS: &str = "get_email_reports";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListJourneysArgs {
    pub page_size: Option<i64>,
    pub page_number: Option<i64>,
    pub search_keyword: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailReportArgs {
    pub journey_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub include_details: Option<bool>,
}

/// Why a `tools/call` could not even start.
#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },
}

#[derive(Clone)]
pub struct ToolHandler {
    gateway: Gateway,
}

impl ToolHandler {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: LIST_JOURNEYS,
                description: "List marketing journeys (campaigns) from Inflection.io, with optional pagination and name search.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "page_size": {
                            "type": "integer",
                            "description": "Number of journeys per page (1-100)",
                            "minimum": 1,
                            "maximum": 100,
                            "default": 30
                        },
                        "page_number": {
                            "type": "integer",
                            "description": "Page number to retrieve (starts at 1)",
                            "minimum": 1,
                            "default": 1
                        },
                        "search_keyword": {
                            "type": "string",
                            "description": "Filter journeys by name",
                            "default": ""
                        }
                    },
                    "additionalProperties": false
                }),
            },
            Tool {
                name: GET_EMAIL_REPORTS,
                description: "Get a comprehensive email performance report for one journey: aggregate metrics, report runs, bounces, email clients, top links and recipient engagement.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "journey_id": {
                            "type": "string",
                            "description": "Journey ID to report on"
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Start date, YYYY-MM-DD or ISO 8601 (defaults to 30 days ago)"
                        },
                        "end_date": {
                            "type": "string",
                            "description": "End date, YYYY-MM-DD or ISO 8601 (defaults to now)"
                        },
                        "include_details": {
                            "type": "boolean",
                            "description": "Include bounce, email client, link and engagement breakdowns",
                            "default": true
                        }
                    },
                    "required": ["journey_id"],
                    "additionalProperties": false
                }),
            },
        ]
    }

    /// Dispatch a `tools/call`. Operation failures come back as an
    /// error result; only an unknown tool or malformed arguments are `Err`.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CallToolResult, ToolCallError> {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };

        match name {
            LIST_JOURNEYS => {
                let args: ListJourneysArgs = parse_args(LIST_JOURNEYS, arguments)?;
                Ok(into_result(self.list_journeys(&args).await, "list journeys"))
            }
            GET_EMAIL_REPORTS => {
                let args: EmailReportArgs = parse_args(GET_EMAIL_REPORTS, arguments)?;
                Ok(into_result(self.email_reports(&args).await, "retrieve email reports"))
            }
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }

    pub async fn list_journeys(&self, args: &ListJourneysArgs) -> Result<String, OperationError> {
        let query = JourneyQuery::new(args.page_size, args.page_number, args.search_keyword.as_deref())?;
        let listing = list_journeys(&self.gateway, &query).await?;
        Ok(listing.to_string())
    }

    pub async fn email_reports(&self, args: &EmailReportArgs) -> Result<String, OperationError> {
        let request = ReportRequest::new(
            &args.journey_id,
            args.start_date.as_deref(),
            args.end_date.as_deref(),
            args.include_details,
            self.gateway.config().report_offset(),
        )?;
        let report = get_email_reports(&self.gateway, &request).await?;
        Ok(report.to_string())
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<T, ToolCallError> {
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidArguments {
        tool,
        message: e.to_string(),
    })
}

fn into_result(result: Result<String, OperationError>, action: &str) -> CallToolResult {
    match result {
        Ok(text) => {
            info!(action = action, "Tool call succeeded");
            CallToolResult::text(text)
        }
        Err(e) => {
            error!(action = action, error = %e, "Tool call failed");
            CallToolResult::error(failure_text(action, &e))
        }
    }
}

/// User-facing text for a failed operation
pub fn failure_text(action: &str, err: &OperationError) -> String {
    if err.is_validation() {
        format!("❌ {}", err)
    } else if err.is_auth() {
        format!("❌ Authentication error: {}", err)
    } else {
        format!("❌ Failed to {}: {}", action, err)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};
    use inflection_core::{ApiConfig, Credentials};
    use mockito::{Server, ServerGuard};

    use super::*;

    pub(crate) fn handler_for(server: &ServerGuard) -> ToolHandler {
        let mut config = ApiConfig::with_base_url(&server.url());
        config.max_network_retries = 0;
        let gateway = Gateway::new(config, Credentials::new("ops@example.com", "pw").unwrap()).unwrap();
        ToolHandler::new(gateway)
    }

    pub(crate) async fn mock_login(server: &mut ServerGuard) -> mockito::Mock {
        let expires = (Utc::now() + Duration::hours(1)).to_rfc3339();
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(200)
            .with_body(json!({"session": {"access_token": "tok", "access_expires_at": expires}}).to_string())
            .create_async()
            .await
    }

    pub(crate) async fn mock_journeys(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/v2/campaigns/campaign.list")
            .with_status(200)
            .with_body(
                json!({
                    "records": [{"campaign_id": "j-1", "name": "Welcome", "active": true}],
                    "page_count": 1,
                    "record_count": 1
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    #[test]
    fn test_list_tools() {
        let server_url = "http://127.0.0.1:9";
        let gateway = Gateway::new(
            ApiConfig::with_base_url(server_url),
            Credentials::new("ops@example.com", "pw").unwrap(),
        )
        .unwrap();
        let tools = ToolHandler::new(gateway).list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names, vec![LIST_JOURNEYS, GET_EMAIL_REPORTS]);
        assert_eq!(tools[1].input_schema["required"], json!(["journey_id"]));
    }

    #[tokio::test]
    async fn test_call_list_journeys() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        mock_journeys(&mut server).await;

        let handler = handler_for(&server);
        let result = handler.call(LIST_JOURNEYS, json!({"page_size": 5})).await.unwrap();
        assert!(!result.is_error);
        assert!(result.joined_text().contains("📊 Found 1 journeys"));
    }

    #[tokio::test]
    async fn test_validation_failure_is_error_result() {
        let server = Server::new_async().await;
        let handler = handler_for(&server);

        let result = handler
            .call(GET_EMAIL_REPORTS, json!({"journey_id": "not valid!"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "❌ Invalid journey ID format");
    }

    #[tokio::test]
    async fn test_auth_failure_is_error_result() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/accounts/login")
            .with_status(403)
            .with_body("bad credentials")
            .create_async()
            .await;

        let handler = handler_for(&server);
        let result = handler.call(LIST_JOURNEYS, Value::Null).await.unwrap();
        assert!(result.is_error);
        assert!(result.joined_text().starts_with("❌ Authentication error:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let server = Server::new_async().await;
        let handler = handler_for(&server);

        assert!(matches!(
            handler.call("delete_everything", json!({})).await,
            Err(ToolCallError::UnknownTool(_))
        ));
        assert!(matches!(
            handler.call(GET_EMAIL_REPORTS, json!({})).await,
            Err(ToolCallError::InvalidArguments { .. })
        ));
        assert!(matches!(
            handler.call(LIST_JOURNEYS, json!({"page_size": "ten"})).await,
            Err(ToolCallError::InvalidArguments { .. })
        ));
    }
}
