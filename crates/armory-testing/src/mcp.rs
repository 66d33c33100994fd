//! # Scripted MCP Sessions
//!
//! An in-memory [`SessionFactory`] for exercising the stateful and stateless
//! clients without a network or subprocess. It counts handshakes, records
//! calls, and can fail chosen handshakes or calls.

use armory_core::Arguments;
use armory_mcp::{McpError, McpResult, McpSession, SessionFactory};
use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A call observed by a scripted session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Handshake number of the session that served the call, starting at 1
    pub session: usize,
    pub tool: String,
    pub arguments: Arguments,
}

#[derive(Default)]
struct Script {
    server_name: String,
    tools: Vec<Tool>,
    responses: HashMap<String, CallToolResult>,
    fail_handshakes: HashSet<usize>,
    fail_calls: HashSet<usize>,
    handshakes: AtomicUsize,
    call_attempts: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Script {
    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Build a remote tool description with a JSON object input schema.
pub fn remote_tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool::new(
        name.to_string(),
        description.to_string(),
        Arc::new(input_schema.as_object().cloned().unwrap_or_default()),
    )
}

/// Builder for [`ScriptedSessionFactory`].
#[derive(Default)]
pub struct ScriptedSessionFactoryBuilder {
    script: Script,
}

impl ScriptedSessionFactoryBuilder {
    /// Expose a tool taking arbitrary string parameters
    pub fn tool(mut self, name: &str, params: &[&str]) -> Self {
        let properties: serde_json::Map<String, Value> = params
            .iter()
            .map(|param| {
                (
                    param.to_string(),
                    json!({"type": "string", "description": format!("The {param}")}),
                )
            })
            .collect();
        self.script.tools.push(remote_tool(
            name,
            &format!("Remote tool {name}"),
            json!({"type": "object", "properties": properties, "required": params}),
        ));
        self
    }

    /// Expose a fully described tool
    pub fn remote(mut self, tool: Tool) -> Self {
        self.script.tools.push(tool);
        self
    }

    /// Answer calls to `tool` with a fixed result
    pub fn respond(mut self, tool: &str, result: CallToolResult) -> Self {
        self.script.responses.insert(tool.to_string(), result);
        self
    }

    /// Fail the n-th handshake (1-based)
    pub fn fail_handshake(mut self, n: usize) -> Self {
        self.script.fail_handshakes.insert(n);
        self
    }

    /// Fail the n-th call across all sessions (1-based)
    pub fn fail_call(mut self, n: usize) -> Self {
        self.script.fail_calls.insert(n);
        self
    }

    pub fn build(self) -> ScriptedSessionFactory {
        ScriptedSessionFactory {
            script: Arc::new(self.script),
        }
    }
}

/// Session factory playing back a script.
#[derive(Clone)]
pub struct ScriptedSessionFactory {
    script: Arc<Script>,
}

impl ScriptedSessionFactory {
    pub fn builder(server_name: impl Into<String>) -> ScriptedSessionFactoryBuilder {
        ScriptedSessionFactoryBuilder {
            script: Script {
                server_name: server_name.into(),
                ..Default::default()
            },
        }
    }

    /// Number of handshakes attempted, failed ones included
    pub fn handshake_count(&self) -> usize {
        self.script.handshakes.load(Ordering::SeqCst)
    }

    /// Number of sessions closed
    pub fn close_count(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }

    /// Calls that reached a live session and were not scripted to fail
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    fn server_name(&self) -> &str {
        &self.script.server_name
    }

    async fn open(&self) -> McpResult<Arc<dyn McpSession>> {
        let n = self.script.handshakes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.script.fail_handshakes.contains(&n) {
            return Err(McpError::HandshakeFailed(format!(
                "scripted handshake failure #{n}"
            )));
        }
        Ok(Arc::new(ScriptedSession {
            script: Arc::clone(&self.script),
            id: n,
            closed: AtomicBool::new(false),
        }))
    }
}

struct ScriptedSession {
    script: Arc<Script>,
    id: usize,
    closed: AtomicBool,
}

impl ScriptedSession {
    fn ensure_open(&self) -> McpResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::ConnectionState(format!(
                "scripted session #{} is closed",
                self.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl McpSession for ScriptedSession {
    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.ensure_open()?;
        Ok(self.script.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Arguments) -> McpResult<CallToolResult> {
        self.ensure_open()?;
        let n = self.script.call_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.script.fail_calls.contains(&n) {
            return Err(McpError::TransportError(format!(
                "scripted call failure #{n}"
            )));
        }
        if !self.script.tools.iter().any(|tool| tool.name == name) {
            return Err(McpError::ProtocolError(format!("unknown tool '{name}'")));
        }

        let echo = Value::Object(arguments.clone()).to_string();
        self.script.record(RecordedCall {
            session: self.id,
            tool: name.to_string(),
            arguments,
        });
        Ok(self.script.responses.get(name).cloned().unwrap_or_else(|| {
            CallToolResult::success(vec![Content::text(format!("{name} {echo}"))])
        }))
    }

    async fn close(&self) -> McpResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(McpError::ConnectionState(format!(
                "scripted session #{} is already closed",
                self.id
            )));
        }
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_handshakes_and_calls() {
        let factory = ScriptedSessionFactory::builder("fake")
            .tool("echo", &["text"])
            .fail_handshake(1)
            .build();

        assert!(matches!(
            factory.open().await.err(),
            Some(McpError::HandshakeFailed(_))
        ));
        let session = factory.open().await.unwrap();
        assert_eq!(factory.handshake_count(), 2);

        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");

        let mut args = Arguments::new();
        args.insert("text".into(), json!("hi"));
        let result = session.call_tool("echo", args).await.unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(factory.calls()[0].session, 2);

        session.close().await.unwrap();
        assert!(matches!(
            session.call_tool("echo", Arguments::new()).await,
            Err(McpError::ConnectionState(_))
        ));
        assert_eq!(factory.close_count(), 1);
    }
}
