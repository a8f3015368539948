//! MCP (Model Context Protocol) server.
//!
//! Provides a JSON-RPC 2.0 interface over stdio so that agents can inspect
//! the repository: scan its file tree, fingerprint the SSOT document and
//! query the dependency graph.

/// MCP server implementation.
pub mod server;

/// Tool definitions and dispatch.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

pub use server::McpServer;
pub use tools::{get_tool_definitions, handle_tool_call, ToolDefinition};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
