//! # Armory
//!
//! Armory gives an LLM-driven agent one uniform way to call tools, whether a
//! tool is a local function or lives on a remote MCP server.
//!
//! ## Core Components
//!
//! - **[Tool]**: the single capability contract; every invocation yields a lazy
//!   stream of [ResponseChunk]s
//! - **[Toolkit]**: registry, groups and dispatch with cooperative cancellation
//! - **[StatefulClient], [StatelessClient]**: remote MCP tool sources (feature `mcp`)
//!
//! ## Quick Start
//!
//! ```rust
//! use armory::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let toolkit = Toolkit::new();
//!
//! let search = FunctionTool::asynchronous(
//!     ToolSignature::new("search", "Search the web")
//!         .param(ParamSpec::string("query", "What to look for"))
//!         .param(ParamSpec::string("api_key", "Search API key")),
//!     |args, _ctx| async move {
//!         let key = args["api_key"].as_str().unwrap_or_default().to_string();
//!         Ok(ResponseChunk::text(format!("searched with {key}")))
//!     },
//! );
//! toolkit
//!     .register_with(ToolRegistration::new(search).preset("api_key", json!("xxx")))
//!     .await
//!     .unwrap();
//!
//! let call = ToolUse::from_json("search", json!({"query": "Armory"})).unwrap();
//! let chunks = toolkit.call_tool_collect(call, CancellationToken::new()).await.unwrap();
//! assert_eq!(chunks[0].text_content(), "searched with xxx");
//! # });
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use armory_core as core;
#[cfg(feature = "mcp")]
pub use armory_mcp as mcp;
#[cfg(feature = "testing")]
pub use armory_testing as testing;
pub use armory_tools as tools;

// ============================================================================
// Tool contract and response envelope
// ============================================================================

pub use armory_core::{
    Arguments, CancellationToken, ChunkStream, ContentBlock, ExtensionSchema, FunctionTool,
    INTERRUPTION_NOTE, MediaSource, ParamSpec, ResponseChunk, SchemaError, Tool, ToolContext,
    ToolError, ToolResult, ToolSchema, ToolShape, ToolSignature, ToolUse,
};

// ============================================================================
// Registry, groups and dispatch
// ============================================================================

pub use armory_tools::{
    DEFAULT_GROUP, GroupActivation, META_TOOL_NAME, ToolGroup, ToolRegistration, Toolkit,
};

// ============================================================================
// Remote MCP tools
// ============================================================================

#[cfg(feature = "mcp")]
pub use armory_mcp::{
    McpClient, McpClientsConfig, McpError, McpOutput, McpServerConfig, McpTool,
    RemoteRegistration, StatefulClient, StatelessClient, register_mcp_tools,
};

/// The types most agents need.
pub mod prelude {
    pub use armory_core::{
        Arguments, CancellationToken, ContentBlock, FunctionTool, ParamSpec, ResponseChunk, Tool,
        ToolContext, ToolError, ToolResult, ToolSignature, ToolUse,
    };
    pub use armory_tools::{ToolRegistration, Toolkit};

    #[cfg(feature = "mcp")]
    pub use armory_mcp::{
        McpClient, McpServerConfig, RemoteRegistration, StatefulClient, StatelessClient,
        register_mcp_tools,
    };
}
