//! # Armory Tools
//!
//! Registry, groups and dispatch for Armory tools.
//!
//! - [`ToolRegistry`]: owns descriptors and derives validated schemas at registration
//! - [`GroupManager`]: named groups with an always-active default group
//! - [`Toolkit`]: one engine instance; resolves, binds presets, invokes and
//!   normalizes every tool into a stream of response chunks with cooperative
//!   cancellation
//!
//! ## Example
//!
//! ```rust
//! use armory_core::{FunctionTool, ParamSpec, ResponseChunk, ToolSignature};
//! use armory_tools::{Toolkit, ToolRegistration};
//!
//! # tokio_test::block_on(async {
//! let toolkit = Toolkit::with_meta_tool().await.unwrap();
//! toolkit
//!     .create_group(
//!         "browser_use",
//!         "Drive a web browser",
//!         false,
//!         Some("Close tabs when done".into()),
//!     )
//!     .await
//!     .unwrap();
//!
//! let navigate = FunctionTool::sync(
//!     ToolSignature::new("navigate", "Open a page").param(ParamSpec::string("url", "Page URL")),
//!     |_| Ok(ResponseChunk::text("opened")),
//! );
//! toolkit
//!     .register_with(ToolRegistration::new(navigate).group("browser_use"))
//!     .await
//!     .unwrap();
//!
//! // Only the meta tool is visible until the group is activated
//! assert_eq!(toolkit.list_schemas().await.len(), 1);
//! toolkit.set_active(&["browser_use"], true).await.unwrap();
//! assert_eq!(toolkit.list_schemas().await.len(), 2);
//! # });
//! ```

pub mod dispatch;
pub mod groups;
pub mod meta;
pub mod registry;

pub use dispatch::Toolkit;
pub use groups::{DEFAULT_GROUP, GroupActivation, GroupManager, ToolGroup};
pub use meta::{GROUP_NAMES_PARAM, META_TOOL_NAME};
pub use registry::{PostProcessFn, ToolDescriptor, ToolRegistration, ToolRegistry};
