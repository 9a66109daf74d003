//! Structured errors for the tokicon MCP tools.
//!
//! Store and collaborator failures arrive as `tokicon_core::Error`, which
//! already maps onto MCP error codes; these cover tool-level input handling.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty token id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    Output(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Output(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

/// Pretty JSON for a tool result.
pub fn to_json<T: serde::Serialize>(output: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(output).map_err(|e| ToolError::Output(format!("Failed to serialize output: {e}")))
}
