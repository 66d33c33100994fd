//! Stateful and stateless MCP clients
//!
//! Both clients list remote tools and hand out [`McpTool`] callables. They
//! differ in session lifetime:
//!
//! - [`StatefulClient`] opens one session on [`connect`](StatefulClient::connect)
//!   and reuses it for every call until [`close`](StatefulClient::close).
//!   Use it for servers that keep state between calls, such as a remote browser.
//! - [`StatelessClient`] opens a fresh session for every call and tears it
//!   down afterwards, so one failing call cannot poison the next.

use crate::bridge::{McpTool, RemoteBinding};
use crate::config::McpServerConfig;
use crate::error::{McpError, McpResult};
use crate::session::{McpSession, RmcpSessionFactory, SessionFactory};
use async_trait::async_trait;
use rmcp::model::Tool;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Connection state of a [`StatefulClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// A tool discovered on a remote server.
///
/// Handles carry the listing generation they came from. Closing the client or
/// listing again invalidates every older handle.
#[derive(Debug, Clone)]
pub struct RemoteToolHandle {
    server_name: String,
    tool: Tool,
    generation: u64,
    epoch: Arc<AtomicU64>,
}

impl RemoteToolHandle {
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or_default()
    }

    /// The protocol tool description, including its input schema.
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Whether the owning client has neither closed nor re-listed since.
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.generation
    }
}

fn handles(server_name: &str, tools: Vec<Tool>, epoch: &Arc<AtomicU64>) -> Vec<RemoteToolHandle> {
    let generation = epoch.fetch_add(1, Ordering::AcqRel) + 1;
    tools
        .into_iter()
        .map(|tool| RemoteToolHandle {
            server_name: server_name.to_string(),
            tool,
            generation,
            epoch: Arc::clone(epoch),
        })
        .collect()
}

fn find_handle(
    handles: &[RemoteToolHandle],
    server: &str,
    name: &str,
) -> McpResult<RemoteToolHandle> {
    handles
        .iter()
        .find(|handle| handle.name() == name)
        .cloned()
        .ok_or_else(|| McpError::ToolNotFound(format!("{name} (server '{server}')")))
}

/// Common surface of both client disciplines.
#[async_trait]
pub trait McpClient: Send + Sync {
    fn server_name(&self) -> &str;

    /// Discover the server's tools.
    async fn list_tools(&self) -> McpResult<Vec<RemoteToolHandle>>;

    /// Get a callable for one remote tool.
    ///
    /// With `wrap_result` the call yields a [`ResponseChunk`](armory_core::ResponseChunk)
    /// like any local tool; without it the raw protocol result is returned.
    async fn get_callable(&self, name: &str, wrap_result: bool) -> McpResult<McpTool>;
}

#[derive(Default)]
struct SessionState {
    session: Option<Arc<dyn McpSession>>,
    tools: Option<Vec<RemoteToolHandle>>,
}

/// Client keeping one session alive between `connect` and `close`.
pub struct StatefulClient {
    factory: Arc<dyn SessionFactory>,
    state: RwLock<SessionState>,
    epoch: Arc<AtomicU64>,
}

impl std::fmt::Debug for StatefulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulClient")
            .field("server", &self.factory.server_name())
            .finish_non_exhaustive()
    }
}

impl StatefulClient {
    /// Client for a configured server. Nothing is opened until `connect`.
    pub fn new(config: McpServerConfig) -> McpResult<Self> {
        Ok(Self::with_factory(Arc::new(RmcpSessionFactory::new(config)?)))
    }

    pub fn with_factory(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(SessionState::default()),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        if self.state.read().await.session.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Acquire the transport and perform the handshake.
    ///
    /// # Errors
    ///
    /// `ConnectionState` if already connected. Handshake failures leave the
    /// client disconnected with nothing held open.
    pub async fn connect(&self) -> McpResult<()> {
        let mut state = self.state.write().await;
        if state.session.is_some() {
            return Err(McpError::ConnectionState(format!(
                "client for '{}' is already connected",
                self.server_name()
            )));
        }
        state.session = Some(self.factory.open().await?);
        info!(server = %self.server_name(), "MCP client connected");
        Ok(())
    }

    /// Release the session. Every handle and callable obtained so far goes stale.
    pub async fn close(&self) -> McpResult<()> {
        let mut state = self.state.write().await;
        let Some(session) = state.session.take() else {
            return Err(McpError::ConnectionState(format!(
                "client for '{}' is not connected",
                self.server_name()
            )));
        };
        state.tools = None;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        drop(state);

        let result = session.close().await;
        info!(server = %self.server_name(), "MCP client closed");
        result
    }

    async fn session(&self) -> McpResult<Arc<dyn McpSession>> {
        self.state.read().await.session.clone().ok_or_else(|| {
            McpError::ConnectionState(format!(
                "client for '{}' is not connected",
                self.server_name()
            ))
        })
    }

    /// Handles from the last listing, if any.
    pub async fn cached_tools(&self) -> Option<Vec<RemoteToolHandle>> {
        self.state.read().await.tools.clone()
    }
}

#[async_trait]
impl McpClient for StatefulClient {
    fn server_name(&self) -> &str {
        self.factory.server_name()
    }

    /// List tools over the open session and replace the cache.
    async fn list_tools(&self) -> McpResult<Vec<RemoteToolHandle>> {
        let session = self.session().await?;
        let tools = session.list_tools().await?;

        let mut state = self.state.write().await;
        // close() may have run while the request was in flight.
        if !state
            .session
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &session))
        {
            return Err(McpError::ConnectionState(format!(
                "client for '{}' was closed during listing",
                self.server_name()
            )));
        }
        let listed = handles(self.server_name(), tools, &self.epoch);
        state.tools = Some(listed.clone());
        Ok(listed)
    }

    /// Look the tool up in the cached listing.
    ///
    /// The tools are listed first when no listing has been cached since
    /// `connect`. The callable reuses the client's session.
    async fn get_callable(&self, name: &str, wrap_result: bool) -> McpResult<McpTool> {
        let session = self.session().await?;
        let cached = self.cached_tools().await;
        let tools = match cached {
            Some(tools) => tools,
            None => self.list_tools().await?,
        };
        let handle = find_handle(&tools, self.server_name(), name)?;
        Ok(McpTool::new(handle, RemoteBinding::Session(session), wrap_result))
    }
}

/// Client opening a fresh session for every operation.
pub struct StatelessClient {
    factory: Arc<dyn SessionFactory>,
    tools: RwLock<Option<Vec<RemoteToolHandle>>>,
    epoch: Arc<AtomicU64>,
}

impl std::fmt::Debug for StatelessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatelessClient")
            .field("server", &self.factory.server_name())
            .finish_non_exhaustive()
    }
}

impl StatelessClient {
    pub fn new(config: McpServerConfig) -> McpResult<Self> {
        Ok(Self::with_factory(Arc::new(RmcpSessionFactory::new(config)?)))
    }

    pub fn with_factory(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            tools: RwLock::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl McpClient for StatelessClient {
    fn server_name(&self) -> &str {
        self.factory.server_name()
    }

    /// List tools through a transient session.
    async fn list_tools(&self) -> McpResult<Vec<RemoteToolHandle>> {
        let session = self.factory.open().await?;
        debug!(server = %self.server_name(), "Opened transient session for listing");
        let listed = session.list_tools().await;
        if let Err(e) = session.close().await {
            debug!(server = %self.server_name(), error = %e, "Transient session close failed");
        }

        let listed = handles(self.server_name(), listed?, &self.epoch);
        *self.tools.write().await = Some(listed.clone());
        Ok(listed)
    }

    /// Each invocation of the returned callable opens its own session.
    async fn get_callable(&self, name: &str, wrap_result: bool) -> McpResult<McpTool> {
        let cached = self.tools.read().await.clone();
        let tools = match cached {
            Some(tools) => tools,
            None => self.list_tools().await?,
        };
        let handle = find_handle(&tools, self.server_name(), name)?;
        Ok(McpTool::new(
            handle,
            RemoteBinding::PerCall(Arc::clone(&self.factory)),
            wrap_result,
        ))
    }
}
