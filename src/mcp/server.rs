//! MCP server that reads JSON-RPC 2.0 messages from stdin and writes
//! responses to stdout.
//!
//! Requests are handled strictly one at a time, so responses leave in the
//! order their requests arrived. Diagnostics go to stderr via `tracing`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::errors::Result;

use super::tools::{get_tool_definitions, handle_tool_call};
use super::transport::{is_request_id, ErrorCode, JsonRpcRequest, JsonRpcResponse};

/// Protocol version answered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "ssot-mcp";

/// Runtime statistics for the MCP server.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The MCP server over a fixed repository configuration.
pub struct McpServer {
    config: ServerConfig,
    stats: ServerStats,
    tool_call_counts: Mutex<HashMap<String, u64>>,
}

impl McpServer {
    /// Creates a new MCP server for the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            stats: ServerStats::new(),
            tool_call_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Runs the server on the process's stdin/stdout until stdin is closed.
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serves newline-delimited JSON-RPC from `reader`, writing one response
    /// line per answered request to `writer`.
    ///
    /// Returns when `reader` reaches end of input. Read and write failures
    /// are returned to the caller; everything else is handled per line.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            // A trailing line without '\n' at end of input is still handled.
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let Some(output) = self.handle_line(&buf) else {
                continue;
            };

            writer.write_all(output.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!(stats = %self.server_stats_json(), "stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw input line, returning the serialized response if the
    /// line warrants one.
    ///
    /// Blank lines are skipped. Lines that are not valid UTF-8 JSON are
    /// logged and dropped, since no id can be trusted from them.
    pub fn handle_line(&self, raw: &[u8]) -> Option<String> {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => s.trim(),
            Err(e) => {
                warn!("dropping line that is not valid UTF-8: {}", e);
                return None;
            }
        };
        if line.is_empty() {
            return None;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("parse error, dropping line: {}", e);
                return None;
            }
        };

        let response = self.handle_message(message)?;
        match serde_json::to_string(&response) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("failed to serialize response: {}", e);
                None
            }
        }
    }

    /// Dispatches a parsed JSON-RPC message to the appropriate handler.
    ///
    /// Returns `None` for notifications: any message whose `id` is not a
    /// number or string is never answered, whatever its method.
    pub fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = match message.get("id") {
            Some(id) if is_request_id(id) => id.clone(),
            _ => {
                debug!(method = ?message.get("method"), "notification, no response");
                return None;
            }
        };

        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        let response = match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.route(id, &request),
            Err(e) => JsonRpcResponse::error(
                id,
                ErrorCode::InvalidRequest,
                format!("invalid request: {}", e),
            ),
        };

        if response.is_error() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }

        Some(response)
    }

    fn route(&self, id: Value, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, &request.params),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, &request.params),
            "ping" => JsonRpcResponse::success(id, json!({ "pong": true })),
            other => {
                warn!(method = other, "method not found");
                JsonRpcResponse::error(
                    id,
                    ErrorCode::MethodNotFound,
                    format!("Method not found: {}", other),
                )
            }
        }
    }

    /// Handles the `initialize` method, returning server capabilities.
    fn handle_initialize(&self, id: Value, params: &Option<Value>) -> JsonRpcResponse {
        let protocol_version = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": protocol_version,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handles the `tools/list` method, returning all available tool definitions.
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = get_tool_definitions();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Handles the `tools/call` method, dispatching to the appropriate tool handler.
    fn handle_tools_call(&self, id: Value, params: &Option<Value>) -> JsonRpcResponse {
        let tool_name = match params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
        {
            Some(name) => name,
            None => {
                return JsonRpcResponse::error(
                    id,
                    ErrorCode::InvalidParams,
                    "missing 'name' in tools/call params".to_string(),
                );
            }
        };

        let arguments = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or(json!({}));

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut counts) = self.tool_call_counts.lock() {
            *counts.entry(tool_name.to_string()).or_insert(0) += 1;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            handle_tool_call(&self.config, tool_name, arguments)
        }));

        match outcome {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(e)) => {
                warn!(tool = tool_name, error = %e, "tool call failed");
                JsonRpcResponse::error(id, e.code(), non_empty_message(e.to_string()))
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!(tool = tool_name, "tool handler panicked: {}", message);
                JsonRpcResponse::failure(id, message)
            }
        }
    }

    /// Returns the current server runtime statistics as a JSON value.
    pub fn server_stats_json(&self) -> Value {
        let uptime = self.stats.started_at.elapsed();
        let tool_counts: Value = self
            .tool_call_counts
            .lock()
            .map(|counts| json!(*counts))
            .unwrap_or(json!({}));

        json!({
            "uptime_secs": uptime.as_secs(),
            "total_requests": self.stats.total_requests.load(Ordering::Relaxed),
            "tool_calls": self.stats.tool_calls.load(Ordering::Relaxed),
            "errors": self.stats.errors.load(Ordering::Relaxed),
            "tool_call_counts": tool_counts,
        })
    }
}

/// Message carried by a caught panic, or "Internal error" if it has none.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    non_empty_message(message)
}

fn non_empty_message(message: String) -> String {
    if message.trim().is_empty() {
        "Internal error".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(ServerConfig::default())
    }

    #[test]
    fn test_notification_with_valid_method_is_silent() {
        let out = server().handle_message(json!({"jsonrpc": "2.0", "method": "tools/list"}));
        assert!(out.is_none());
    }

    #[test]
    fn test_null_id_is_notification() {
        let out = server().handle_message(json!({"id": null, "method": "initialize"}));
        assert!(out.is_none());
    }

    #[test]
    fn test_missing_method_is_invalid_request() {
        let resp = server().handle_message(json!({"id": 9})).unwrap();
        assert_eq!(resp.error.unwrap().code, -32600);
    }

    #[test]
    fn test_initialize_echoes_protocol_version() {
        let resp = server()
            .handle_message(json!({
                "id": 1,
                "method": "initialize",
                "params": {"protocolVersion": "2025-03-26"}
            }))
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_initialize_default_protocol_version() {
        let resp = server()
            .handle_message(json!({"id": 1, "method": "initialize"}))
            .unwrap();
        assert_eq!(resp.result.unwrap()["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn test_stats_track_requests_and_errors() {
        let s = server();
        s.handle_message(json!({"id": 1, "method": "nope"}));
        s.handle_message(json!({"id": 2, "method": "tools/call", "params": {"name": "ping"}}));
        s.handle_message(json!({"method": "ping"}));

        let stats = s.server_stats_json();
        assert_eq!(stats["total_requests"], 2);
        assert_eq!(stats["errors"], 1);
        assert_eq!(stats["tool_calls"], 1);
        assert_eq!(stats["tool_call_counts"]["ping"], 1);
    }

    #[test]
    fn test_panic_message_from_str_and_string() {
        let payload = catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload), "boom");

        let payload = catch_unwind(|| panic!("tool {} failed", 7)).unwrap_err();
        assert_eq!(panic_message(payload), "tool 7 failed");
    }

    #[test]
    fn test_panic_message_falls_back_to_internal_error() {
        let payload = catch_unwind(|| std::panic::panic_any(5)).unwrap_err();
        assert_eq!(panic_message(payload), "Internal error");

        let payload = catch_unwind(|| panic!("")).unwrap_err();
        assert_eq!(panic_message(payload), "Internal error");
    }

    #[test]
    fn test_blank_and_garbage_lines_dropped() {
        let s = server();
        assert!(s.handle_line(b"   \r\n").is_none());
        assert!(s.handle_line(b"not json\n").is_none());
        assert!(s.handle_line(&[0xff, 0xfe, b'\n']).is_none());
    }
}
