use thiserror::Error;

use crate::mcp::transport::ErrorCode;

/// Errors that can occur while serving repository introspection requests.
#[derive(Error, Debug)]
pub enum SsotMcpError {
    #[error("scan error: {message} (path: {path})")]
    Scan { message: String, path: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SsotMcpError {
    /// The JSON-RPC error code this error is reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownTool(_) => ErrorCode::MethodNotFound,
            Self::InvalidParams(_) => ErrorCode::InvalidParams,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Convenience alias for results using `SsotMcpError`.
pub type Result<T> = std::result::Result<T, SsotMcpError>;
