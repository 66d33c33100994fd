//! # Mock Tools for Testing
//!
//! This module provides a scripted tool that yields predictable chunks and
//! records every invocation, for reliable dispatch and cancellation tests.

use armory_core::{
    Arguments, ChunkStream, ResponseChunk, Tool, ToolContext, ToolError, ToolShape, ToolSignature,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted step of a [`MockTool`].
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield this chunk
    Chunk(ResponseChunk),
    /// Fail the invocation with an execution error
    Fail(String),
}

/// A tool that plays back a fixed script of chunks.
///
/// Without a script, each call yields a single chunk echoing its arguments.
#[derive(Debug, Clone)]
pub struct MockTool {
    signature: ToolSignature,
    shape: ToolShape,
    script: Vec<MockStep>,
    delay: Option<Duration>,
    call_history: Arc<Mutex<Vec<Arguments>>>,
}

impl MockTool {
    /// Create a mock tool with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::with_signature(ToolSignature::new(name.clone(), format!("Mock tool {name}")))
    }

    /// Create a mock tool with an explicit signature
    pub fn with_signature(signature: ToolSignature) -> Self {
        Self {
            signature,
            shape: ToolShape::AsyncStream,
            script: Vec::new(),
            delay: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a text chunk to the script
    pub fn with_chunk(mut self, text: impl Into<String>) -> Self {
        self.script.push(MockStep::Chunk(ResponseChunk::text(text)));
        self
    }

    /// Append several text chunks to the script
    pub fn with_chunks<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script.extend(
            texts
                .into_iter()
                .map(|text| MockStep::Chunk(ResponseChunk::text(text))),
        );
        self
    }

    /// Append a failure to the script
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.script.push(MockStep::Fail(message.into()));
        self
    }

    /// Sleep before every scripted step
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report a different native shape to the dispatch engine
    pub fn with_shape(mut self, shape: ToolShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Get the number of times this tool has been invoked
    pub fn call_count(&self) -> usize {
        self.history().len()
    }

    /// Get the arguments of every invocation, in order
    pub fn call_history(&self) -> Vec<Arguments> {
        self.history().clone()
    }

    /// Arguments of the most recent invocation
    pub fn last_call(&self) -> Option<Arguments> {
        self.history().last().cloned()
    }

    /// Reset the call history
    pub fn reset(&self) {
        self.history().clear();
    }

    fn history(&self) -> std::sync::MutexGuard<'_, Vec<Arguments>> {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tool for MockTool {
    fn signature(&self) -> ToolSignature {
        self.signature.clone()
    }

    fn shape(&self) -> ToolShape {
        self.shape
    }

    fn invoke(&self, args: Arguments, _ctx: ToolContext) -> ChunkStream {
        self.history().push(args.clone());

        let name = self.signature.name.clone();
        let delay = self.delay;
        let script = if self.script.is_empty() {
            let echo = serde_json::Value::Object(args).to_string();
            vec![MockStep::Chunk(ResponseChunk::text(format!(
                "Mock response for: {echo}"
            )))]
        } else {
            self.script.clone()
        };

        Box::pin(async_stream::stream! {
            for step in script {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match step {
                    MockStep::Chunk(chunk) => yield Ok(chunk),
                    MockStep::Fail(message) => {
                        yield Err(ToolError::execution(&name, message));
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armory_core::ParamSpec;
    use futures::StreamExt;
    use serde_json::json;

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_scripted_chunks_and_history() {
        let tool = MockTool::new("stream").with_chunks(["a", "b"]);
        let chunks: Vec<_> = tool
            .invoke(args(json!({"x": 1})), ToolContext::detached("stream"))
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].as_ref().unwrap().text_content(), "b");
        assert_eq!(tool.call_count(), 1);
        assert_eq!(tool.last_call().unwrap()["x"], 1);

        tool.reset();
        assert_eq!(tool.call_count(), 0);
    }

    #[tokio::test]
    async fn test_default_echo_and_failure() {
        let tool = MockTool::with_signature(
            ToolSignature::new("echo", "Echo").param(ParamSpec::string("q", "Query")),
        );
        let mut stream = tool.invoke(args(json!({"q": "hi"})), ToolContext::detached("echo"));
        let chunk = stream.next().await.unwrap().unwrap();
        assert!(chunk.text_content().contains("\"q\":\"hi\""));

        let failing = MockTool::new("bad")
            .with_chunk("partial")
            .with_failure("boom");
        let results: Vec<_> = failing
            .invoke(Arguments::new(), ToolContext::detached("bad"))
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(ToolError::Execution { .. })));
    }
}
