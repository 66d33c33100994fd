//! The unified tool contract
//!
//! Every tool, local or remote, implements [`Tool`]: a single `invoke` method
//! returning a lazy, finite [`ChunkStream`]. Single-result tools yield one
//! chunk. [`FunctionTool`] adapts the four native callable shapes to this
//! contract so the dispatch engine only ever sees streams.

use crate::error::{ToolError, ToolResult};
use crate::response::ResponseChunk;
use crate::schema::ToolSignature;
use futures::Stream;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Named arguments passed to a tool.
pub type Arguments = Map<String, Value>;

/// Lazy, finite, non-restartable sequence of response chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ToolResult<ResponseChunk>> + Send>>;

/// The native shape of a tool body.
///
/// Only the suspending shapes can observe cancellation. Synchronous bodies run
/// to completion once started; stopping them is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolShape {
    Sync,
    Async,
    SyncStream,
    AsyncStream,
}

impl ToolShape {
    /// Whether the dispatch engine can interrupt this shape.
    pub fn is_interruptible(self) -> bool {
        matches!(self, ToolShape::Async | ToolShape::AsyncStream)
    }

    /// Whether the shape yields more than one chunk.
    pub fn is_streaming(self) -> bool {
        matches!(self, ToolShape::SyncStream | ToolShape::AsyncStream)
    }
}

/// A tool-use request as produced by the model: `{name, id, input}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Arguments,
}

impl ToolUse {
    /// Create a request with a fresh id.
    pub fn new(name: impl Into<String>, input: Arguments) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            input,
        }
    }

    /// Create a request from a JSON object input.
    pub fn from_json(name: impl Into<String>, input: Value) -> ToolResult<Self> {
        let name = name.into();
        match input {
            Value::Object(input) => Ok(Self::new(name, input)),
            Value::Null => Ok(Self::new(name, Arguments::new())),
            other => Err(ToolError::invalid_arguments(
                name,
                format!("input must be a JSON object, got {other}"),
            )),
        }
    }

    /// Override the request id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Per-invocation context handed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub call_id: String,
    pub tool_name: String,
    cancellation: CancellationToken,
}

impl ToolContext {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            cancellation,
        }
    }

    /// Context with its own, never-cancelled token.
    pub fn detached(tool_name: impl Into<String>) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            tool_name,
            CancellationToken::new(),
        )
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the invocation is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

/// A named, schema-described capability.
///
/// # Example
///
/// ```rust
/// use armory_core::{Arguments, ChunkStream, ResponseChunk, Tool, ToolContext, ToolSignature};
/// use armory_core::schema::ParamSpec;
///
/// struct Echo;
///
/// impl Tool for Echo {
///     fn signature(&self) -> ToolSignature {
///         ToolSignature::new("echo", "Echo the message back")
///             .param(ParamSpec::string("message", "Text to echo"))
///     }
///
///     fn invoke(&self, args: Arguments, _ctx: ToolContext) -> ChunkStream {
///         let text = args.get("message").and_then(|v| v.as_str()).unwrap_or_default().to_string();
///         Box::pin(futures::stream::once(async move { Ok(ResponseChunk::text(text)) }))
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    /// Declarative metadata used to derive the schema at registration.
    fn signature(&self) -> ToolSignature;

    /// Native shape of the body. Remote and hand-written tools are async streams.
    fn shape(&self) -> ToolShape {
        ToolShape::AsyncStream
    }

    /// Start the invocation. Nothing runs until the stream is polled.
    fn invoke(&self, args: Arguments, ctx: ToolContext) -> ChunkStream;
}

type SyncFn = dyn Fn(Arguments) -> ToolResult<ResponseChunk> + Send + Sync;
type AsyncFn =
    dyn Fn(Arguments, ToolContext) -> BoxFuture<'static, ToolResult<ResponseChunk>> + Send + Sync;
type SyncStreamFn = dyn Fn(Arguments) -> Box<dyn Iterator<Item = ToolResult<ResponseChunk>> + Send>
    + Send
    + Sync;
type AsyncStreamFn = dyn Fn(Arguments, ToolContext) -> ChunkStream + Send + Sync;

#[derive(Clone)]
enum Callable {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
    SyncStream(Arc<SyncStreamFn>),
    AsyncStream(Arc<AsyncStreamFn>),
}

/// A tool backed by a closure of one of the four native shapes.
#[derive(Clone)]
pub struct FunctionTool {
    signature: ToolSignature,
    callable: Callable,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.signature.name)
            .field("shape", &self.shape())
            .finish()
    }
}

impl FunctionTool {
    /// Wrap a blocking function returning one chunk.
    pub fn sync<F>(signature: ToolSignature, f: F) -> Self
    where
        F: Fn(Arguments) -> ToolResult<ResponseChunk> + Send + Sync + 'static,
    {
        Self {
            signature,
            callable: Callable::Sync(Arc::new(f)),
        }
    }

    /// Wrap an async function returning one chunk.
    pub fn asynchronous<F, Fut>(signature: ToolSignature, f: F) -> Self
    where
        F: Fn(Arguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<ResponseChunk>> + Send + 'static,
    {
        Self {
            signature,
            callable: Callable::Async(Arc::new(
                move |args: Arguments,
                      ctx: ToolContext|
                      -> BoxFuture<'static, ToolResult<ResponseChunk>> {
                    Box::pin(f(args, ctx))
                },
            )),
        }
    }

    /// Wrap a blocking function producing an iterator of chunks.
    pub fn sync_stream<F, I>(signature: ToolSignature, f: F) -> Self
    where
        F: Fn(Arguments) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = ToolResult<ResponseChunk>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            signature,
            callable: Callable::SyncStream(Arc::new(
                move |args: Arguments|
                      -> Box<dyn Iterator<Item = ToolResult<ResponseChunk>> + Send> {
                    Box::new(f(args).into_iter())
                },
            )),
        }
    }

    /// Wrap an async function producing a stream of chunks.
    pub fn async_stream<F, S>(signature: ToolSignature, f: F) -> Self
    where
        F: Fn(Arguments, ToolContext) -> S + Send + Sync + 'static,
        S: Stream<Item = ToolResult<ResponseChunk>> + Send + 'static,
    {
        Self {
            signature,
            callable: Callable::AsyncStream(Arc::new(
                move |args: Arguments, ctx: ToolContext| -> ChunkStream { Box::pin(f(args, ctx)) },
            )),
        }
    }
}

impl Tool for FunctionTool {
    fn signature(&self) -> ToolSignature {
        self.signature.clone()
    }

    fn shape(&self) -> ToolShape {
        match self.callable {
            Callable::Sync(_) => ToolShape::Sync,
            Callable::Async(_) => ToolShape::Async,
            Callable::SyncStream(_) => ToolShape::SyncStream,
            Callable::AsyncStream(_) => ToolShape::AsyncStream,
        }
    }

    fn invoke(&self, args: Arguments, ctx: ToolContext) -> ChunkStream {
        match &self.callable {
            Callable::Sync(f) => {
                let f = Arc::clone(f);
                Box::pin(futures::stream::once(async move { f(args) }))
            }
            Callable::Async(f) => Box::pin(futures::stream::once(f(args, ctx))),
            Callable::SyncStream(f) => {
                let f = Arc::clone(f);
                Box::pin(async_stream::stream! {
                    for item in f(args) {
                        yield item;
                    }
                })
            }
            Callable::AsyncStream(f) => f(args, ctx),
        }
    }
}
