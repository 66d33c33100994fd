//! Error types for tool registration and dispatch
//!
//! [`ToolError`] is the single error surface of the tool layer. Registration
//! errors (schema, duplicate name, preset conflicts) are raised immediately
//! and never leave a partial registration behind. Dispatch errors are
//! propagated unmodified; the engine never retries.

use crate::schema::SchemaError;
use thiserror::Error;

/// Result type used throughout the tool layer.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised while registering, resolving or invoking tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed or incomplete capability description, detected at registration.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A tool with this name is already registered.
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Unknown tool name at dispatch or remote lookup.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Preset arguments that do not match the tool's declared parameters.
    #[error("Preset argument conflict for tool '{tool}': {message}")]
    PresetArgConflict { tool: String, message: String },

    /// Operation attempted in the wrong connection state.
    #[error("Connection state error: {0}")]
    ConnectionState(String),

    /// The invocation observed a cancellation signal.
    ///
    /// The dispatch engine converts this into an interrupted chunk; it never
    /// reaches callers of `Toolkit::call_tool`.
    #[error("Invocation of '{0}' was cancelled")]
    Cancelled(String),

    /// Transport or handshake failure talking to a remote tool server.
    #[error("Remote transport error: {0}")]
    RemoteTransport(String),

    /// Arguments could not be interpreted by the tool.
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The tool body itself failed.
    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },

    /// A group with this name already exists.
    #[error("Tool group already exists: {0}")]
    DuplicateGroup(String),

    /// The named group does not exist.
    #[error("Tool group not found: {0}")]
    GroupNotFound(String),

    /// The reserved default group cannot be removed or reassigned.
    #[error("Tool group '{0}' is reserved")]
    ReservedGroup(String),
}

impl ToolError {
    /// Shorthand for an execution failure inside a tool body.
    pub fn execution(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ToolError::Execution {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for rejected arguments.
    pub fn invalid_arguments(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ToolError::InvalidArguments {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error was raised at registration time.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            ToolError::Schema(_)
                | ToolError::DuplicateTool(_)
                | ToolError::PresetArgConflict { .. }
                | ToolError::DuplicateGroup(_)
                | ToolError::ReservedGroup(_)
        )
    }

    /// Check if this error is retryable
    ///
    /// Only remote transport failures are transient. Connection-state errors
    /// indicate caller misuse and are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::RemoteTransport(_))
    }

    /// Check if this error cannot be resolved by calling again
    ///
    /// Registration errors and connection-state misuse need the program to
    /// change something first; the model cannot fix them by adjusting input.
    pub fn is_fatal(&self) -> bool {
        self.is_registration_error() || matches!(self, ToolError::ConnectionState(_))
    }

    /// Check if this error is the internal cancellation marker
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ToolError::Cancelled(_))
    }
}
