//! MCP tool definitions and dispatch.
//!
//! The tool set is fixed. Descriptors include JSON Schema input descriptions
//! so that MCP clients can discover available capabilities.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ServerConfig;
use crate::errors::{Result, SsotMcpError};
use crate::graph::query_dependency_graph;
use crate::scanner::scan_repository;
use crate::ssot::validate_ssot;

pub const TOOL_PING: &str = "ping";
pub const TOOL_SCAN_REPOSITORY: &str = "scan_repository";
pub const TOOL_VALIDATE_SSOT: &str = "validate_ssot_integrity";
pub const TOOL_QUERY_GRAPH: &str = "query_dependency_graph";

/// Query run when `query_dependency_graph` is called without one.
pub const DEFAULT_GRAPH_QUERY: &str = "stats";

/// A tool definition exposed by the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Returns the list of all tool definitions, in the order clients see them.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    let no_args = json!({ "type": "object", "properties": {} });
    vec![
        ToolDefinition {
            name: TOOL_PING.to_string(),
            description: "Check that the server is alive.".to_string(),
            input_schema: no_args.clone(),
        },
        ToolDefinition {
            name: TOOL_SCAN_REPOSITORY.to_string(),
            description: "Walk the repository tree and report the total file count with a preview of the first 50 files and their sizes.".to_string(),
            input_schema: no_args.clone(),
        },
        ToolDefinition {
            name: TOOL_VALIDATE_SSOT.to_string(),
            description: "Compute the canonical SHA-256 hash of the SSOT document for drift detection.".to_string(),
            input_schema: no_args,
        },
        ToolDefinition {
            name: TOOL_QUERY_GRAPH.to_string(),
            description: "Query the dependency graph: 'node <file>', 'dependencies <file>', 'dependents <file>', 'spectral <FREQ>' or 'stats'.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Query command (default: stats)"
                    }
                }
            }),
        },
    ]
}

/// Dispatches a tool call to the appropriate handler.
///
/// Returns the tool result as a JSON value, or an error if the tool name
/// is unknown or the handler fails.
pub fn handle_tool_call(config: &ServerConfig, tool_name: &str, args: Value) -> Result<Value> {
    match tool_name {
        TOOL_PING => Ok(json!({ "pong": true })),
        TOOL_SCAN_REPOSITORY => handle_scan(config),
        TOOL_VALIDATE_SSOT => handle_validate_ssot(config),
        TOOL_QUERY_GRAPH => handle_query_graph(config, args),
        _ => Err(SsotMcpError::UnknownTool(tool_name.to_string())),
    }
}

/// Wraps already-serialized text as MCP text content.
fn text_content(text: String) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}

/// Handles `scan_repository` tool calls. Filesystem errors propagate.
fn handle_scan(config: &ServerConfig) -> Result<Value> {
    let result = scan_repository(config)?;
    Ok(text_content(serde_json::to_string_pretty(&result)?))
}

/// Handles `validate_ssot_integrity` tool calls.
fn handle_validate_ssot(config: &ServerConfig) -> Result<Value> {
    let report = validate_ssot(config);
    Ok(text_content(serde_json::to_string_pretty(&report)?))
}

/// Handles `query_dependency_graph` tool calls.
fn handle_query_graph(config: &ServerConfig, args: Value) -> Result<Value> {
    let query = match args.get("query") {
        None | Some(Value::Null) => DEFAULT_GRAPH_QUERY,
        Some(Value::String(q)) if q.trim().is_empty() => DEFAULT_GRAPH_QUERY,
        Some(Value::String(q)) => q.as_str(),
        Some(other) => {
            return Err(SsotMcpError::InvalidParams(format!(
                "'query' must be a string, got {}",
                other
            )))
        }
    };

    let answer = query_dependency_graph(&config.graph_file(), query);
    Ok(text_content(serde_json::to_string_pretty(&answer)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions_order() {
        let names: Vec<String> = get_tool_definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "ping",
                "scan_repository",
                "validate_ssot_integrity",
                "query_dependency_graph"
            ]
        );
    }

    #[test]
    fn test_tool_definitions_have_schemas() {
        for tool in &get_tool_definitions() {
            assert!(!tool.description.is_empty());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_unknown_tool_is_method_not_found() {
        let err = handle_tool_call(&ServerConfig::default(), "frobnicate", json!({})).unwrap_err();
        assert_eq!(err.code().as_i32(), -32601);
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_non_string_query_is_invalid_params() {
        let err = handle_tool_call(
            &ServerConfig::default(),
            "query_dependency_graph",
            json!({ "query": 7 }),
        )
        .unwrap_err();
        assert_eq!(err.code().as_i32(), -32602);
    }

    #[test]
    fn test_ping_result() {
        let out = handle_tool_call(&ServerConfig::default(), "ping", Value::Null).unwrap();
        assert_eq!(out, json!({ "pong": true }));
    }
}
