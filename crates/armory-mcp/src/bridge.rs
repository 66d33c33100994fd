//! Bridge between remote MCP tools and the local tool contract
//!
//! An [`McpTool`] implements [`Tool`], so once registered in a [`Toolkit`] the
//! dispatch engine cannot tell it apart from a local function.

use crate::adapter::{raw_result_chunk, wrap_result};
use crate::client::{McpClient, RemoteToolHandle};
use crate::error::McpResult;
use crate::session::{McpSession, SessionFactory};
use armory_core::{
    Arguments, ChunkStream, ResponseChunk, Tool, ToolContext, ToolError, ToolResult, ToolShape,
    ToolSignature,
};
use armory_tools::{ToolRegistration, Toolkit};
use rmcp::model::CallToolResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a remote call is sent.
#[derive(Clone)]
pub(crate) enum RemoteBinding {
    /// The long-lived session of a stateful client
    Session(Arc<dyn McpSession>),
    /// A factory opening one session per call
    PerCall(Arc<dyn SessionFactory>),
}

/// Result of calling a remote tool directly.
#[derive(Debug, Clone)]
pub enum McpOutput {
    /// Translated into the local chunk shape
    Wrapped(ResponseChunk),
    /// The protocol result, untouched
    Raw(CallToolResult),
}

impl McpOutput {
    /// Convert to a chunk regardless of mode. Raw results become a data block.
    pub fn into_chunk(self) -> ResponseChunk {
        match self {
            McpOutput::Wrapped(chunk) => chunk,
            McpOutput::Raw(result) => raw_result_chunk(&result),
        }
    }
}

impl From<McpOutput> for ResponseChunk {
    fn from(output: McpOutput) -> Self {
        output.into_chunk()
    }
}

/// A callable remote tool.
#[derive(Clone)]
pub struct McpTool {
    handle: RemoteToolHandle,
    binding: RemoteBinding,
    wrap_result: bool,
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("server", &self.handle.server_name())
            .field("tool", &self.handle.name())
            .field("wrap_result", &self.wrap_result)
            .finish()
    }
}

impl McpTool {
    pub(crate) fn new(handle: RemoteToolHandle, binding: RemoteBinding, wrap_result: bool) -> Self {
        Self {
            handle,
            binding,
            wrap_result,
        }
    }

    pub fn handle(&self) -> &RemoteToolHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn wraps_result(&self) -> bool {
        self.wrap_result
    }

    /// Call the remote tool.
    pub async fn call(&self, arguments: Arguments) -> McpResult<McpOutput> {
        let result = self.call_raw(arguments).await?;
        Ok(if self.wrap_result {
            McpOutput::Wrapped(wrap_result(&result))
        } else {
            McpOutput::Raw(result)
        })
    }

    async fn call_raw(&self, arguments: Arguments) -> McpResult<CallToolResult> {
        let server = self.handle.server_name();
        let name = self.handle.name();
        match &self.binding {
            RemoteBinding::Session(session) => session.call_tool(name, arguments).await,
            RemoteBinding::PerCall(factory) => {
                let session = factory.open().await?;
                debug!(server = %server, tool = %name, "Opened per-call session");
                let result = session.call_tool(name, arguments).await;
                if let Err(e) = session.close().await {
                    debug!(server = %server, error = %e, "Per-call session close failed");
                }
                debug!(
                    server = %server,
                    tool = %name,
                    ok = result.is_ok(),
                    "Per-call session torn down"
                );
                result
            }
        }
    }
}

impl Tool for McpTool {
    fn signature(&self) -> ToolSignature {
        let tool = self.handle.tool();
        ToolSignature::from_json_schema(
            tool.name.to_string(),
            self.handle.description(),
            &tool.input_schema,
        )
    }

    fn shape(&self) -> ToolShape {
        ToolShape::Async
    }

    fn invoke(&self, input: Arguments, _ctx: ToolContext) -> ChunkStream {
        let tool = self.clone();
        Box::pin(futures::stream::once(async move {
            tool.call(input)
                .await
                .map(McpOutput::into_chunk)
                .map_err(ToolError::from)
        }))
    }
}

/// Options for [`register_mcp_tools`].
#[derive(Debug, Clone)]
pub struct RemoteRegistration {
    group: Option<String>,
    enable: Option<HashSet<String>>,
    disable: HashSet<String>,
    preset_args: HashMap<String, Arguments>,
    wrap_result: bool,
}

impl Default for RemoteRegistration {
    fn default() -> Self {
        Self {
            group: None,
            enable: None,
            disable: HashSet::new(),
            preset_args: HashMap::new(),
            wrap_result: true,
        }
    }
}

impl RemoteRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register into this group instead of the default one.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Register only the named tools.
    pub fn enable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enable = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Skip the named tools.
    pub fn disable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disable.extend(names.into_iter().map(Into::into));
        self
    }

    /// Preset arguments for one tool.
    pub fn preset_args(mut self, tool: impl Into<String>, args: Arguments) -> Self {
        self.preset_args.insert(tool.into(), args);
        self
    }

    pub fn wrap_result(mut self, wrap: bool) -> Self {
        self.wrap_result = wrap;
        self
    }

    fn selects(&self, name: &str) -> bool {
        self.enable.as_ref().is_none_or(|enabled| enabled.contains(name))
            && !self.disable.contains(name)
    }
}

/// List a client's tools and register the selected ones.
///
/// Returns the registered names. Registration stops at the first error; tools
/// registered before it stay registered.
pub async fn register_mcp_tools(
    toolkit: &Toolkit,
    client: &dyn McpClient,
    options: RemoteRegistration,
) -> ToolResult<Vec<String>> {
    let handles = client.list_tools().await.map_err(ToolError::from)?;

    let mut registered = Vec::new();
    for handle in handles.iter().filter(|handle| options.selects(handle.name())) {
        let tool = client
            .get_callable(handle.name(), options.wrap_result)
            .await
            .map_err(ToolError::from)?;

        let mut registration = ToolRegistration::new(tool);
        if let Some(group) = &options.group {
            registration = registration.group(group.clone());
        }
        if let Some(args) = options.preset_args.get(handle.name()) {
            registration = registration.preset_args(args.clone());
        }
        toolkit.register_with(registration).await?;
        registered.push(handle.name().to_string());
    }

    info!(
        server = %client.server_name(),
        count = registered.len(),
        group = options.group.as_deref().unwrap_or(armory_tools::DEFAULT_GROUP),
        "Registered remote MCP tools"
    );
    Ok(registered)
}
