//! MCP error types
//!
//! This module provides the error type for remote MCP operations, including
//! mapping from rmcp errors and conversion into the tool-layer [`ToolError`].

use armory_core::ToolError;
use rmcp::ServiceError;
use rmcp::service::ClientInitializeError;
use std::time::Duration;
use thiserror::Error;

/// MCP operation result type
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur during MCP operations
#[derive(Debug, Error)]
pub enum McpError {
    /// Operation attempted in the wrong connection state
    #[error("Connection state error: {0}")]
    ConnectionState(String),

    /// Tool not found on the remote server
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Transport could not be established or broke mid-session
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The MCP initialize handshake failed
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// The server answered with a protocol-level error
    #[error("MCP protocol error: {0}")]
    ProtocolError(String),

    /// A request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid server configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl McpError {
    /// Check if this error is retryable
    ///
    /// Returns true for transient errors that may succeed on a fresh
    /// session. Connection-state errors are caller misuse and never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            McpError::TransportError(_) | McpError::HandshakeFailed(_) | McpError::Timeout(_)
        )
    }

    /// Check if this error indicates the session should be discarded
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            McpError::TransportError(_) | McpError::ProtocolError(_) | McpError::ConfigError(_)
        )
    }

    /// Whether the error came from a closed or never-opened connection
    pub fn is_connection_state(&self) -> bool {
        matches!(self, McpError::ConnectionState(_))
    }

    /// Map an rmcp request error
    pub fn from_service_error(error: ServiceError) -> Self {
        match error {
            ServiceError::McpError(data) => McpError::ProtocolError(data.message.into_owned()),
            ServiceError::Timeout { timeout } => McpError::Timeout(timeout),
            ServiceError::UnexpectedResponse => {
                McpError::ProtocolError("unexpected response type".to_string())
            }
            other => McpError::TransportError(other.to_string()),
        }
    }

    /// Map an rmcp initialize failure
    pub fn from_init_error(error: ClientInitializeError) -> Self {
        McpError::HandshakeFailed(error.to_string())
    }
}

impl From<ServiceError> for McpError {
    fn from(error: ServiceError) -> Self {
        McpError::from_service_error(error)
    }
}

impl From<toml::de::Error> for McpError {
    fn from(error: toml::de::Error) -> Self {
        McpError::ConfigError(error.to_string())
    }
}

impl From<McpError> for ToolError {
    fn from(error: McpError) -> Self {
        match error {
            McpError::ConnectionState(message) => ToolError::ConnectionState(message),
            McpError::ToolNotFound(name) => ToolError::ToolNotFound(name),
            other => ToolError::RemoteTransport(other.to_string()),
        }
    }
}
