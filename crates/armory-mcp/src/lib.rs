//! # Armory MCP - Remote Model Context Protocol Tools
//!
//! This crate lets remote MCP servers supply tools to an Armory [`Toolkit`](armory_tools::Toolkit).
//!
//! ## Features
//!
//! - **Stateful client**: one session from `connect` to `close`, reused by every call
//! - **Stateless client**: a fresh session per call, isolating failures
//! - **Transports**: stdio subprocess, legacy HTTP+SSE, streamable HTTP
//! - **Result wrapping**: remote results become ordinary response chunks
//!
//! ## Example
//!
//! ```rust,no_run
//! use armory_mcp::{
//!     McpClient, McpServerConfig, RemoteRegistration, StatefulClient, register_mcp_tools,
//! };
//! use armory_tools::Toolkit;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let args = vec!["@playwright/mcp@latest".into()];
//!     let config = McpServerConfig::stdio("browser", "npx", args);
//!     let client = StatefulClient::new(config)?;
//!     client.connect().await?;
//!
//!     let toolkit = Toolkit::with_meta_tool().await?;
//!     toolkit.create_group("browser_use", "Drive a web browser", false, None).await?;
//!     let options = RemoteRegistration::new().group("browser_use");
//!     register_mcp_tools(&toolkit, &client, options).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod sse;

pub use adapter::{convert_content, wrap_result};
pub use bridge::{McpOutput, McpTool, RemoteRegistration, register_mcp_tools};
pub use client::{ConnectionState, McpClient, RemoteToolHandle, StatefulClient, StatelessClient};
pub use config::{McpClientsConfig, McpServerConfig, TransportConfig};
pub use error::{McpError, McpResult};
pub use session::{McpSession, RmcpSession, RmcpSessionFactory, SessionFactory};
