//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! stdout carries protocol messages only; all logging goes to stderr.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::protocol::{JsonRpcError, JsonRpcResponse};
use super::server::McpServer;

pub async fn run_stdio(server: McpServer) -> Result<()> {
    info!("MCP server started, listening on stdin");
    serve_lines(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("MCP server shutting down");
    Ok(())
}

/// Serve until EOF on `reader`. Requests are handled one at a time, in order.
pub async fn serve_lines<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Received EOF");
                break;
            }
            Ok(_) => {
                let message = line.trim();
                if message.is_empty() {
                    continue;
                }

                let Some(response) = server.handle_message(message).await else {
                    continue;
                };

                let encoded = serde_json::to_string(&response).unwrap_or_else(|e| {
                    error!(error = %e, "Failed to serialize response");
                    let fallback = JsonRpcResponse::error(
                        response.id.clone(),
                        JsonRpcError::internal_error("Serialization error"),
                    );
                    serde_json::to_string(&fallback).unwrap_or_default()
                });

                writer.write_all(encoded.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Err(e) => {
                error!(error = %e, "Failed to read from stdin");
                return Err(e.into());
            }
        }
    }
    Ok(())
}
