//! Model Context Protocol server.
//!
//! JSON-RPC 2.0 over newline-delimited stdio, or over HTTP at `POST /mcp`.
//! Exposes `list_journeys` and `get_email_reports`.

pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use server::McpServer;
pub use stdio::run_stdio;
pub use tools::ToolHandler;
