//! # Armory Testing
//!
//! Test doubles for Armory:
//!
//! - [`MockTool`]: a scripted local tool with call history and optional delays
//! - [`ScriptedSessionFactory`]: an in-memory MCP server counting handshakes,
//!   recording calls, and failing chosen handshakes or calls
//!
//! ```rust
//! use armory_testing::{MockTool, ScriptedSessionFactory};
//!
//! let tool = MockTool::new("search").with_chunks(["first", "second"]);
//! let factory = ScriptedSessionFactory::builder("fake").tool("navigate", &["url"]).build();
//! assert_eq!(tool.call_count(), 0);
//! assert_eq!(factory.handshake_count(), 0);
//! ```

pub mod mcp;
pub mod mock_tools;

pub use mcp::{RecordedCall, ScriptedSessionFactory, ScriptedSessionFactoryBuilder, remote_tool};
pub use mock_tools::{MockStep, MockTool};
