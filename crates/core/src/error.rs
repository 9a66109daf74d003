//! Unified error types for tokicon.
//!
//! `Error` covers infrastructure failures (store, input, collaborators) and maps
//! onto MCP error codes. `FailureKind` is the taxonomy recorded for icon lookups
//! that came up empty; it never reaches a caller as an error.

use std::fmt;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite;

/// Unified error types for the tokicon services.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty token id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored value could not be encoded or decoded.
    #[error("STORE_ERROR: serialization failed: {0}")]
    Serialization(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be constructed.
    #[error("HTTP_CLIENT: {0}")]
    HttpClient(String),

    /// A wallet-side collaborator (wallet handle, metadata client, renderer) failed.
    #[error("COLLABORATOR_ERROR: {0}")]
    Collaborator(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::HttpClient(msg) => (-32008, msg.clone()),
            Error::Collaborator(msg) => (-32009, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Serialization(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

/// Why an icon lookup step failed.
///
/// Recorded for diagnostics only; a failed lookup always degrades to the placeholder icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Timeout,
    Cors,
    Network,
    Dns,
    InvalidMetadata,
    Unknown,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Cors => "cors",
            FailureKind::Network => "network",
            FailureKind::Dns => "dns",
            FailureKind::InvalidMetadata => "invalid-metadata",
            FailureKind::Unknown => "unknown",
        }
    }

    /// How much a classification says about the cause. Higher is more informative.
    pub fn specificity(self) -> u8 {
        match self {
            FailureKind::Cors | FailureKind::Dns => 4,
            FailureKind::Timeout => 3,
            FailureKind::InvalidMetadata => 2,
            FailureKind::Network => 1,
            FailureKind::Unknown => 0,
        }
    }

    /// Keep the more informative of two classifications; ties keep `current`.
    pub fn most_specific(current: Option<Self>, candidate: Self) -> Self {
        match current {
            Some(kind) if kind.specificity() >= candidate.specificity() => kind,
            _ => candidate,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("token_id cannot be empty".to_string());
        assert!(err.to_string().contains("INVALID_INPUT"));
        assert!(err.to_string().contains("token_id"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidUrl("nope".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32003);
    }

    #[test]
    fn test_failure_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&FailureKind::InvalidMetadata).unwrap();
        assert_eq!(json, "\"invalid-metadata\"");
        assert_eq!(FailureKind::InvalidMetadata.to_string(), "invalid-metadata");
    }

    #[test]
    fn test_most_specific_prefers_cors_and_dns() {
        let kind = FailureKind::most_specific(Some(FailureKind::Network), FailureKind::Cors);
        assert_eq!(kind, FailureKind::Cors);

        let kind = FailureKind::most_specific(Some(FailureKind::Dns), FailureKind::Unknown);
        assert_eq!(kind, FailureKind::Dns);

        let kind = FailureKind::most_specific(None, FailureKind::Unknown);
        assert_eq!(kind, FailureKind::Unknown);
    }

    #[test]
    fn test_most_specific_ties_keep_first() {
        let kind = FailureKind::most_specific(Some(FailureKind::Dns), FailureKind::Cors);
        assert_eq!(kind, FailureKind::Dns);
    }
}
