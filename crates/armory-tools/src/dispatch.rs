//! Dispatch engine
//!
//! [`Toolkit`] owns one [`ToolRegistry`] behind a read/write lock and turns a
//! [`ToolUse`] into a stream of [`ResponseChunk`]s.
//!
//! Each invocation moves through `Pending → Running → {Completed | Interrupted | Failed}`:
//!
//! - resolution failure is an immediate `Err(ToolNotFound)`; the tool is never invoked
//! - preset arguments are bound over the caller's input
//! - chunks are forwarded in order with one chunk of lookahead, so the final
//!   chunk can be flagged `is_last`
//! - a cancelled invocation ends with exactly one interrupted chunk; for
//!   streams the interruption is merged into the last produced chunk
//! - any other error is yielded unmodified and ends the stream
//!
//! Cancellation is cooperative. The token is observed only while the tool is
//! suspended; synchronous tools run to completion once started.

use crate::groups::{GroupActivation, ToolGroup};
use crate::meta::{EquipTool, META_TOOL_NAME};
use crate::registry::{PostProcessFn, ToolDescriptor, ToolRegistration, ToolRegistry};
use armory_core::{
    CancellationToken, ChunkStream, ExtensionSchema, ResponseChunk, Tool, ToolContext, ToolResult,
    ToolSchema, ToolUse,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Span, debug, info, info_span, warn};

/// One engine instance: a registry, its groups, and dispatch.
///
/// Cloning a `Toolkit` yields another handle to the same registry.
///
/// # Example
///
/// ```rust
/// use armory_core::{
///     CancellationToken, FunctionTool, ParamSpec, ResponseChunk, ToolSignature, ToolUse,
/// };
/// use armory_tools::Toolkit;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let toolkit = Toolkit::new();
/// toolkit
///     .register(FunctionTool::sync(
///         ToolSignature::new("greet", "Say hello")
///             .param(ParamSpec::string("name", "Who to greet")),
///         |args| {
///             let name = args["name"].as_str().unwrap_or("you");
///             Ok(ResponseChunk::text(format!("Hello, {name}!")))
///         },
///     ))
///     .await
///     .unwrap();
///
/// let call = ToolUse::from_json("greet", json!({"name": "Ada"})).unwrap();
/// let chunks = toolkit.call_tool_collect(call, CancellationToken::new()).await.unwrap();
/// assert_eq!(chunks[0].text_content(), "Hello, Ada!");
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Toolkit {
    registry: Arc<RwLock<ToolRegistry>>,
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit").finish_non_exhaustive()
    }
}

enum Step {
    Cancelled,
    Next(Option<ToolResult<ResponseChunk>>),
}

impl Toolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a toolkit with the group-equipping meta tool registered.
    pub async fn with_meta_tool() -> ToolResult<Self> {
        let toolkit = Self::new();
        toolkit.enable_meta_tool().await?;
        Ok(toolkit)
    }

    /// Register the meta tool that lets the agent choose its active groups.
    pub async fn enable_meta_tool(&self) -> ToolResult<()> {
        let tool = EquipTool::new(Arc::downgrade(&self.registry));
        let mut registry = self.registry.write().await;
        registry.register(ToolRegistration::new(tool))?;
        registry.set_meta_tool(META_TOOL_NAME.to_string());
        Ok(())
    }

    /// Register a tool in the default group with no presets.
    pub async fn register(&self, tool: impl Tool + 'static) -> ToolResult<()> {
        self.register_with(ToolRegistration::new(tool)).await
    }

    /// Register a tool with explicit group, presets, extension or postprocess hook.
    pub async fn register_with(&self, registration: ToolRegistration) -> ToolResult<()> {
        self.registry.write().await.register(registration)
    }

    pub async fn remove_tool(&self, name: &str) -> ToolResult<()> {
        self.registry.write().await.remove_tool(name).map(|_| ())
    }

    /// Remove a group and every tool in it.
    pub async fn remove_group(&self, name: &str) -> ToolResult<Vec<String>> {
        self.registry.write().await.remove_group(name)
    }

    pub async fn set_extension(
        &self,
        name: &str,
        extension: Option<ExtensionSchema>,
    ) -> ToolResult<()> {
        self.registry.write().await.set_extension(name, extension)
    }

    /// Schemas of the tools currently exposed to the agent.
    pub async fn list_schemas(&self) -> Vec<ToolSchema> {
        self.registry.read().await.list_schemas()
    }

    pub async fn resolve(&self, name: &str) -> ToolResult<Arc<ToolDescriptor>> {
        self.registry.read().await.resolve(name)
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.registry.read().await.tool_names()
    }

    /// Whether a tool is registered, active or not.
    pub async fn contains(&self, name: &str) -> bool {
        self.registry.read().await.contains(name)
    }

    pub async fn create_group(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        active: bool,
        notes: Option<String>,
    ) -> ToolResult<()> {
        self.registry
            .write()
            .await
            .create_group(name, description, active, notes)
    }

    /// Toggle groups. The default group is never deactivated.
    pub async fn set_active<S: AsRef<str>>(&self, names: &[S], active: bool) -> ToolResult<()> {
        self.registry
            .write()
            .await
            .set_active(names, active)
            .map(|_| ())
    }

    /// Notes of active groups, in creation order.
    pub async fn activated_notes(&self) -> Vec<String> {
        self.registry.read().await.groups().activated_notes()
    }

    pub async fn groups(&self) -> Vec<ToolGroup> {
        self.registry.read().await.groups().groups().to_vec()
    }

    pub async fn activation_state(&self) -> GroupActivation {
        self.registry.read().await.activation()
    }

    pub async fn restore_activation_state(&self, activation: &GroupActivation) {
        self.registry.write().await.restore_activation(activation)
    }

    /// Remove every tool and optional group.
    pub async fn clear(&self) {
        self.registry.write().await.clear()
    }

    /// Dispatch a tool-use request.
    ///
    /// The registry lock is released before the tool runs, so tools may
    /// themselves modify the registry and different tools run concurrently.
    ///
    /// Streamed chunks are forwarded one behind the tool: a chunk is held
    /// until the next one arrives or the stream ends, so that the final chunk
    /// can carry `is_last` or an interruption. A tool that pauses between
    /// chunks therefore delays delivery of the chunk before the pause.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the name is unknown or its group is inactive. Errors
    /// raised while the tool runs arrive as `Err` items of the stream.
    pub async fn call_tool(
        &self,
        call: ToolUse,
        cancel: CancellationToken,
    ) -> ToolResult<ChunkStream> {
        let descriptor = match self.registry.read().await.resolve_active(&call.name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool dispatch failed");
                return Err(e);
            }
        };

        let span = info_span!("tool.invoke", tool = %descriptor.name(), call_id = %call.id);
        debug!(parent: &span, shape = ?descriptor.shape(), "Dispatching tool");

        let args = descriptor.bind_args(call.input.clone());
        let ctx = ToolContext::new(call.id.clone(), descriptor.name(), cancel.clone());
        let inner = descriptor.tool().invoke(args, ctx);

        Ok(normalize(
            inner,
            descriptor.shape().is_interruptible(),
            cancel,
            call,
            descriptor.postprocess().cloned(),
            span,
        ))
    }

    /// Dispatch and drain the stream.
    pub async fn call_tool_collect(
        &self,
        call: ToolUse,
        cancel: CancellationToken,
    ) -> ToolResult<Vec<ResponseChunk>> {
        let mut stream = self.call_tool(call, cancel).await?;
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }
}

fn normalize(
    mut inner: ChunkStream,
    interruptible: bool,
    cancel: CancellationToken,
    call: ToolUse,
    postprocess: Option<Arc<PostProcessFn>>,
    span: Span,
) -> ChunkStream {
    Box::pin(async_stream::stream! {
        let stamp = |mut chunk: ResponseChunk| {
            chunk.id = call.id.clone();
            chunk
        };

        if interruptible && cancel.is_cancelled() {
            info!(parent: &span, "Tool invocation cancelled before start");
            yield Ok(stamp(ResponseChunk::interrupted()));
            return;
        }

        let mut pending: Option<ResponseChunk> = None;
        let mut produced = 0usize;
        loop {
            let step = if interruptible {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Step::Cancelled,
                    next = inner.next() => Step::Next(next),
                }
            } else {
                Step::Next(inner.next().await)
            };

            match step {
                Step::Next(Some(Ok(chunk))) => {
                    produced += 1;
                    let chunk = match &postprocess {
                        Some(hook) => hook(&call, &chunk).unwrap_or(chunk),
                        None => chunk,
                    };
                    if let Some(previous) = pending.replace(chunk) {
                        yield Ok(stamp(previous));
                    }
                }
                Step::Next(Some(Err(e))) if !e.is_cancellation() => {
                    warn!(parent: &span, error = %e, "Tool invocation failed");
                    if let Some(previous) = pending.take() {
                        yield Ok(stamp(previous));
                    }
                    yield Err(e);
                    return;
                }
                Step::Cancelled | Step::Next(Some(Err(_))) => {
                    info!(parent: &span, produced, "Tool invocation interrupted");
                    let mut last = pending.take().unwrap_or_default();
                    last.mark_interrupted();
                    yield Ok(stamp(last));
                    return;
                }
                Step::Next(None) => {
                    debug!(parent: &span, produced, "Tool invocation completed");
                    if let Some(mut last) = pending.take() {
                        last.is_last = true;
                        yield Ok(stamp(last));
                    }
                    return;
                }
            }
        }
    })
}
