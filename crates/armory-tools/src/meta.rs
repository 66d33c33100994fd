//! The group-equipping meta tool
//!
//! Lets the agent choose its own working set: calling it with
//! `{"group_names": [...]}` activates exactly those groups, deactivates every
//! other optional group, and answers with the notes of the groups that just
//! became active.

use crate::groups::{DEFAULT_GROUP, GroupManager};
use crate::registry::ToolRegistry;
use armory_core::{
    Arguments, ChunkStream, ParamSpec, ResponseChunk, Tool, ToolContext, ToolError, ToolShape,
    ToolSignature, args,
};
use serde_json::json;
use std::sync::Weak;
use tokio::sync::RwLock;
use tracing::debug;

/// Name the meta tool is registered under.
pub const META_TOOL_NAME: &str = "reset_equipped_tools";

/// Parameter holding the requested group names.
pub const GROUP_NAMES_PARAM: &str = "group_names";

/// Signature of the meta tool for the current set of groups.
pub(crate) fn equip_signature(groups: &GroupManager) -> ToolSignature {
    let optional: Vec<String> = groups
        .groups()
        .iter()
        .filter(|group| group.name != DEFAULT_GROUP)
        .map(|group| format!("- {}: {}", group.name, group.description))
        .collect();

    let mut description = String::from(
        "Choose which tool groups are equipped. The listed groups become active and every \
         other optional group is deactivated. Pass an empty list to keep only the \
         always-available tools.",
    );
    if !optional.is_empty() {
        description.push_str("\n\nAvailable tool groups:\n");
        description.push_str(&optional.join("\n"));
    }

    ToolSignature::new(META_TOOL_NAME, description)
        .param(ParamSpec::array(
            GROUP_NAMES_PARAM,
            "Names of the tool groups to activate",
            json!({"type": "string"}),
        ))
        .accepts_extra()
}

/// Meta tool bound to the registry that owns it.
///
/// Holds a weak reference so the registry and the tool do not keep each
/// other alive.
pub(crate) struct EquipTool {
    registry: Weak<RwLock<ToolRegistry>>,
}

impl EquipTool {
    pub(crate) fn new(registry: Weak<RwLock<ToolRegistry>>) -> Self {
        Self { registry }
    }
}

impl Tool for EquipTool {
    fn signature(&self) -> ToolSignature {
        equip_signature(&GroupManager::new())
    }

    fn shape(&self) -> ToolShape {
        ToolShape::Async
    }

    fn invoke(&self, input: Arguments, _ctx: ToolContext) -> ChunkStream {
        let registry = self.registry.clone();
        Box::pin(futures::stream::once(async move {
            let names = args::string_list(META_TOOL_NAME, &input, GROUP_NAMES_PARAM)?;
            let registry = registry
                .upgrade()
                .ok_or_else(|| ToolError::execution(META_TOOL_NAME, "toolkit has been dropped"))?;
            let mut registry = registry.write().await;

            match registry.equip(names.as_slice()) {
                Ok(newly_active) => {
                    debug!(
                        requested = ?names,
                        activated = ?newly_active,
                        "Meta tool equipped groups"
                    );
                    Ok(render_equipped(registry.groups(), &names, &newly_active))
                }
                Err(ToolError::GroupNotFound(unknown)) => {
                    Ok(render_unknown(registry.groups(), &unknown))
                }
                Err(other) => Err(other),
            }
        }))
    }
}

fn render_equipped(
    groups: &GroupManager,
    requested: &[String],
    newly_active: &[String],
) -> ResponseChunk {
    let mut text = if requested.is_empty() {
        "All optional tool groups are now inactive; only the always-available tools remain."
            .to_string()
    } else {
        format!("Active tool groups: {}.", requested.join(", "))
    };

    for name in newly_active {
        if let Some(notes) = groups.get(name).and_then(|group| group.notes.as_deref()) {
            text.push_str(&format!("\n\n## About tool group '{name}'\n{notes}"));
        }
    }

    ResponseChunk::text(text).with_metadata("activated_groups", json!(newly_active))
}

fn render_unknown(groups: &GroupManager, unknown: &str) -> ResponseChunk {
    let available: Vec<&str> = groups
        .groups()
        .iter()
        .filter(|group| group.name != DEFAULT_GROUP)
        .map(|group| group.name.as_str())
        .collect();
    ResponseChunk::text(format!(
        "Tool group '{unknown}' does not exist, no groups were changed. Available groups: {}.",
        if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        }
    ))
}
