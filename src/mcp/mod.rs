//! MCP (Model Context Protocol) Server Implementation
//!
//! The server speaks JSON-RPC 2.0 over stdio, built directly on Tokio and
//! Serde (no external SDK).
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`protocol`): JSON-RPC 2.0 message types
//! 2. **Server Layer** (`server`): line-delimited request loop and dispatch
//!    into the [`crate::tools::ToolRegistry`]

pub mod protocol;
pub mod server;

pub use protocol::{
    InitializeParams, InitializeResult, McpError, McpMethod, McpRequest, McpResponse, ServerInfo,
    Tool, ToolCallParams,
};
pub use server::McpServer;
