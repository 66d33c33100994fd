//! # Armory Core
//!
//! Shared contract for every Armory tool:
//!
//! - [`Tool`]: one `invoke` method returning a lazy stream of [`ResponseChunk`]s
//! - [`schema`]: declarative parameter metadata and function-calling schema extraction
//! - [`ToolError`]: the error taxonomy for registration and dispatch
//!
//! Registries, groups and dispatch live in `armory-tools`; remote MCP tools
//! live in `armory-mcp`.

pub mod args;
pub mod error;
pub mod response;
pub mod schema;
pub mod tool;

pub use error::{ToolError, ToolResult};
pub use response::{ContentBlock, INTERRUPTION_NOTE, MediaSource, ResponseChunk};
pub use schema::{
    ExtensionSchema, ParamSpec, ParametersSchema, SchemaError, ToolSchema, ToolSignature,
    extract_schema,
};
pub use tool::{Arguments, ChunkStream, FunctionTool, Tool, ToolContext, ToolShape, ToolUse};

/// Cooperative cancellation signal passed to every invocation.
pub use tokio_util::sync::CancellationToken;
