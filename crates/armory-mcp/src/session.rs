//! MCP sessions and the factories that open them
//!
//! A [`McpSession`] is one initialized protocol session: the handshake has
//! completed and the peer answers `tools/list` and `tools/call`. A
//! [`SessionFactory`] acquires a transport and performs that handshake. The
//! stateful client opens one session and keeps it; the stateless client opens
//! one per call.

use crate::config::{McpServerConfig, TransportConfig};
use crate::error::{McpError, McpResult};
use crate::sse;
use armory_core::Arguments;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo, Implementation, Tool};
use rmcp::service::RunningService;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{
    ConfigureCommandExt, IntoTransport, StreamableHttpClientTransport, TokioChildProcess,
};
use rmcp::{Peer, RoleClient, ServiceExt};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One initialized MCP session.
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Every tool the server exposes, following pagination.
    async fn list_tools(&self) -> McpResult<Vec<Tool>>;

    /// Issue one `tools/call`.
    async fn call_tool(&self, name: &str, arguments: Arguments) -> McpResult<CallToolResult>;

    /// Release the transport. Later requests fail with `ConnectionState`.
    async fn close(&self) -> McpResult<()>;
}

/// Acquires a transport and performs the MCP handshake.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Name of the server sessions are opened against.
    fn server_name(&self) -> &str;

    /// Open a fresh, initialized session.
    ///
    /// When the handshake fails, every partially acquired resource is
    /// released before the error is returned.
    async fn open(&self) -> McpResult<Arc<dyn McpSession>>;
}

fn client_info() -> ClientInfo {
    ClientInfo {
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A session backed by the rmcp client runtime.
pub struct RmcpSession {
    server: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    timeout: Duration,
}

impl RmcpSession {
    /// Run the handshake over any rmcp client transport.
    ///
    /// The transport is moved into the handshake future, so a failed or
    /// timed-out handshake drops it (closing pipes, killing child processes)
    /// before this returns.
    pub async fn handshake<T, E, A>(
        server: impl Into<String>,
        transport: T,
        timeout: Duration,
    ) -> McpResult<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let server = server.into();
        let handshake = tokio::time::timeout(timeout, client_info().serve(transport));
        let service = match handshake.await {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => {
                warn!(server = %server, error = %e, "MCP handshake failed");
                return Err(McpError::from_init_error(e));
            }
            Err(_) => {
                warn!(server = %server, timeout = ?timeout, "MCP handshake timed out");
                return Err(McpError::Timeout(timeout));
            }
        };

        if let Some(peer_info) = service.peer_info() {
            info!(
                server = %server,
                remote = %peer_info.server_info.name,
                version = %peer_info.server_info.version,
                "MCP session initialized"
            );
        }

        Ok(Self {
            server,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            timeout,
        })
    }

    async fn ensure_open(&self) -> McpResult<()> {
        if self.service.lock().await.is_none() {
            return Err(McpError::ConnectionState(format!(
                "session to '{}' is closed",
                self.server
            )));
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, request: F) -> McpResult<T>
    where
        F: Future<Output = Result<T, rmcp::ServiceError>>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| McpError::Timeout(self.timeout))?
            .map_err(McpError::from_service_error)
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.ensure_open().await?;
        let tools = self.bounded(self.peer.list_all_tools()).await?;
        debug!(server = %self.server, count = tools.len(), "Listed remote tools");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Arguments) -> McpResult<CallToolResult> {
        self.ensure_open().await?;
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };
        self.bounded(self.peer.call_tool(params)).await
    }

    async fn close(&self) -> McpResult<()> {
        let Some(service) = self.service.lock().await.take() else {
            return Err(McpError::ConnectionState(format!(
                "session to '{}' is already closed",
                self.server
            )));
        };
        match service.cancel().await {
            Ok(reason) => debug!(server = %self.server, reason = ?reason, "MCP session closed"),
            Err(e) => warn!(server = %self.server, error = %e, "MCP session task ended abnormally"),
        }
        Ok(())
    }
}

/// Opens rmcp sessions from an [`McpServerConfig`].
#[derive(Debug, Clone)]
pub struct RmcpSessionFactory {
    config: McpServerConfig,
}

impl RmcpSessionFactory {
    pub fn new(config: McpServerConfig) -> McpResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    fn http_client(&self, headers: &HashMap<String, String>) -> McpResult<reqwest::Client> {
        reqwest::Client::builder()
            .default_headers(header_map(headers)?)
            .connect_timeout(self.config.timeout())
            .read_timeout(self.config.sse_read_timeout())
            .build()
            .map_err(|e| McpError::TransportError(format!("failed to build HTTP client: {e}")))
    }
}

fn header_map(headers: &HashMap<String, String>) -> McpResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| McpError::ConfigError(format!("invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| McpError::ConfigError(format!("invalid value for header '{key}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl SessionFactory for RmcpSessionFactory {
    fn server_name(&self) -> &str {
        &self.config.name
    }

    async fn open(&self) -> McpResult<Arc<dyn McpSession>> {
        let name = self.config.name.clone();
        let timeout = self.config.timeout();

        let session = match &self.config.transport {
            TransportConfig::Stdio {
                command,
                args,
                cwd,
                env,
            } => {
                debug!(server = %name, command = %command, "Spawning MCP server process");
                let command = Command::new(command).configure(|cmd| {
                    cmd.args(args).envs(env);
                    if let Some(dir) = cwd {
                        cmd.current_dir(dir);
                    }
                });
                let (process, _) = TokioChildProcess::builder(command)
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| {
                        McpError::TransportError(format!("failed to spawn '{name}': {e}"))
                    })?;
                RmcpSession::handshake(name, process, timeout).await?
            }
            TransportConfig::StreamableHttp { url, headers } => {
                debug!(server = %name, url = %url, "Connecting over streamable HTTP");
                let transport = StreamableHttpClientTransport::with_client(
                    self.http_client(headers)?,
                    StreamableHttpClientTransportConfig::with_uri(url.as_str()),
                );
                RmcpSession::handshake(name, transport, timeout).await?
            }
            TransportConfig::Sse { url, headers } => {
                debug!(server = %name, url = %url, "Connecting over SSE");
                let transport = sse::connect(
                    self.http_client(headers)?,
                    url,
                    timeout,
                    self.config.sse_read_timeout(),
                )
                .await?;
                RmcpSession::handshake(name, transport, timeout).await?
            }
        };

        Ok(Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer xxx".to_string());
        let map = header_map(&headers).unwrap();
        assert_eq!(map["authorization"], "Bearer xxx");

        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(header_map(&headers), Err(McpError::ConfigError(_))));
    }

    #[test]
    fn test_factory_validates_config() {
        let err = RmcpSessionFactory::new(McpServerConfig::stdio("", "cmd", vec![])).unwrap_err();
        assert!(matches!(err, McpError::ConfigError(_)));

        let factory =
            RmcpSessionFactory::new(McpServerConfig::sse("legacy", "http://localhost:1/sse"))
                .unwrap();
        assert_eq!(factory.server_name(), "legacy");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_transport_error() {
        let factory = RmcpSessionFactory::new(McpServerConfig::stdio(
            "missing",
            "/nonexistent/armory-mcp-server",
            vec![],
        ))
        .unwrap();
        let err = factory.open().await.err().unwrap();
        assert!(matches!(err, McpError::TransportError(_)));
    }
}
