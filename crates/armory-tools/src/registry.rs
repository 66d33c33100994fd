//! Tool registry
//!
//! The registry exclusively owns every [`ToolDescriptor`] and the
//! [`GroupManager`]. Schemas are derived once at registration and validated
//! there; [`ToolRegistry::list_schemas`] is a live view filtered by the group
//! activation at call time.

use crate::groups::{DEFAULT_GROUP, GroupActivation, GroupManager, ToolGroup};
use crate::meta;
use armory_core::{
    Arguments, ExtensionSchema, ResponseChunk, Tool, ToolError, ToolResult, ToolSchema, ToolShape,
    ToolSignature, ToolUse, extract_schema,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Hook applied to every chunk a tool produces.
///
/// Returning `None` keeps the original chunk.
pub type PostProcessFn = dyn Fn(&ToolUse, &ResponseChunk) -> Option<ResponseChunk> + Send + Sync;

/// Everything the engine needs to invoke one registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    tool: Arc<dyn Tool>,
    signature: ToolSignature,
    schema: ToolSchema,
    group: String,
    preset_args: Arguments,
    extension: Option<ExtensionSchema>,
    postprocess: Option<Arc<PostProcessFn>>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("shape", &self.tool.shape())
            .field("preset_keys", &self.preset_args.keys().collect::<Vec<_>>())
            .field("extended", &self.extension.is_some())
            .finish()
    }
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn preset_args(&self) -> &Arguments {
        &self.preset_args
    }

    pub fn extension(&self) -> Option<&ExtensionSchema> {
        self.extension.as_ref()
    }

    pub fn shape(&self) -> ToolShape {
        self.tool.shape()
    }

    pub fn postprocess(&self) -> Option<&Arc<PostProcessFn>> {
        self.postprocess.as_ref()
    }

    /// Merge caller input with preset arguments. Presets always win.
    pub fn bind_args(&self, input: Arguments) -> Arguments {
        let mut args = input;
        for (key, value) in &self.preset_args {
            args.insert(key.clone(), value.clone());
        }
        args
    }

    fn preset_keys(&self) -> Vec<&str> {
        self.preset_args.keys().map(String::as_str).collect()
    }
}

/// Builder describing how a tool should be registered.
///
/// # Example
///
/// ```rust
/// use armory_core::{FunctionTool, ResponseChunk, ToolSignature, ParamSpec};
/// use armory_tools::ToolRegistration;
/// use serde_json::json;
///
/// let search = FunctionTool::sync(
///     ToolSignature::new("search", "Search the web")
///         .param(ParamSpec::string("query", "The query"))
///         .param(ParamSpec::string("api_key", "Backend key")),
///     |_| Ok(ResponseChunk::text("no results")),
/// );
///
/// let registration = ToolRegistration::new(search)
///     .group("research")
///     .preset("api_key", json!("xxx"));
/// ```
pub struct ToolRegistration {
    tool: Arc<dyn Tool>,
    name: Option<String>,
    group: Option<String>,
    preset_args: Arguments,
    extension: Option<ExtensionSchema>,
    postprocess: Option<Arc<PostProcessFn>>,
}

impl ToolRegistration {
    pub fn new(tool: impl Tool + 'static) -> Self {
        Self::from_arc(Arc::new(tool))
    }

    pub fn from_arc(tool: Arc<dyn Tool>) -> Self {
        Self {
            tool,
            name: None,
            group: None,
            preset_args: Arguments::new(),
            extension: None,
            postprocess: None,
        }
    }

    /// Register under a different name than the tool's signature declares.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Place the tool in a group instead of the default one.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Bind a parameter to a fixed value hidden from the model.
    pub fn preset(mut self, key: impl Into<String>, value: Value) -> Self {
        self.preset_args.insert(key.into(), value);
        self
    }

    /// Bind several parameters at once.
    pub fn preset_args(mut self, args: Arguments) -> Self {
        self.preset_args.extend(args);
        self
    }

    pub fn extension(mut self, extension: ExtensionSchema) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn postprocess<F>(mut self, f: F) -> Self
    where
        F: Fn(&ToolUse, &ResponseChunk) -> Option<ResponseChunk> + Send + Sync + 'static,
    {
        self.postprocess = Some(Arc::new(f));
        self
    }
}

/// Name → descriptor map plus the group manager.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolDescriptor>>,
    order: Vec<String>,
    groups: GroupManager,
    meta_tool: Option<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// All validation happens before anything is inserted, so a failed
    /// registration leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// - `DuplicateTool` if the name is taken
    /// - `GroupNotFound` if the target group does not exist
    /// - `PresetArgConflict` if a preset key is not a declared parameter
    /// - `Schema` if the signature or extension is invalid
    pub fn register(&mut self, registration: ToolRegistration) -> ToolResult<()> {
        let mut signature = registration.tool.signature();
        if let Some(name) = registration.name {
            signature.name = name;
        }
        let name = signature.name.clone();

        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        let group = registration
            .group
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());
        if !self.groups.contains(&group) {
            return Err(ToolError::GroupNotFound(group));
        }

        if let Some(key) = registration
            .preset_args
            .keys()
            .find(|key| !signature.declares(key))
        {
            return Err(ToolError::PresetArgConflict {
                tool: name,
                message: format!("'{key}' is not a declared parameter"),
            });
        }

        let preset_keys: Vec<&str> = registration.preset_args.keys().map(String::as_str).collect();
        let schema = extract_schema(&signature, &preset_keys, registration.extension.as_ref())?;

        debug!(tool = %name, group = %group, "Registered tool");
        self.tools.insert(
            name.clone(),
            Arc::new(ToolDescriptor {
                name: name.clone(),
                tool: registration.tool,
                signature,
                schema,
                group,
                preset_args: registration.preset_args,
                extension: registration.extension,
                postprocess: registration.postprocess,
            }),
        );
        self.order.push(name);
        Ok(())
    }

    /// Remove a single tool.
    pub fn remove_tool(&mut self, name: &str) -> ToolResult<Arc<ToolDescriptor>> {
        let descriptor = self
            .tools
            .remove(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        self.order.retain(|n| n != name);
        if self.meta_tool.as_deref() == Some(name) {
            self.meta_tool = None;
        }
        debug!(tool = %name, "Removed tool");
        Ok(descriptor)
    }

    /// Remove a group together with every tool it contains.
    ///
    /// Returns the names of the removed tools.
    pub fn remove_group(&mut self, name: &str) -> ToolResult<Vec<String>> {
        self.groups.remove_group(name)?;

        let removed: Vec<String> = self
            .order
            .iter()
            .filter(|tool| self.tools.get(*tool).is_some_and(|d| d.group == name))
            .cloned()
            .collect();
        for tool in &removed {
            self.tools.remove(tool);
        }
        self.order.retain(|tool| !removed.contains(tool));

        debug!(group = %name, tools = ?removed, "Removed tool group");
        self.refresh_meta_schema();
        Ok(removed)
    }

    /// Replace (or clear, with `None`) a tool's extension schema.
    ///
    /// The merged schema is re-derived immediately; on error the previous
    /// schema stays in place.
    pub fn set_extension(
        &mut self,
        name: &str,
        extension: Option<ExtensionSchema>,
    ) -> ToolResult<()> {
        let current = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        let schema = extract_schema(
            &current.signature,
            &current.preset_keys(),
            extension.as_ref(),
        )?;
        let mut updated = ToolDescriptor::clone(current);
        updated.schema = schema;
        updated.extension = extension;

        debug!(tool = %name, extended = updated.extension.is_some(), "Updated tool extension");
        self.tools.insert(name.to_string(), Arc::new(updated));
        Ok(())
    }

    /// Schemas of tools in currently active groups, in registration order.
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .filter(|descriptor| self.groups.is_active(&descriptor.group))
            .map(|descriptor| descriptor.schema.clone())
            .collect()
    }

    /// Look up a tool regardless of group activation.
    pub fn resolve(&self, name: &str) -> ToolResult<Arc<ToolDescriptor>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))
    }

    /// Look up a tool that is currently exposed to the agent.
    pub fn resolve_active(&self, name: &str) -> ToolResult<Arc<ToolDescriptor>> {
        let descriptor = self.resolve(name)?;
        if self.groups.is_active(&descriptor.group) {
            Ok(descriptor)
        } else {
            Err(ToolError::ToolNotFound(name.to_string()))
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        active: bool,
        notes: Option<String>,
    ) -> ToolResult<()> {
        self.groups.create_group(name, description, active, notes)?;
        self.refresh_meta_schema();
        Ok(())
    }

    pub fn set_active<S: AsRef<str>>(
        &mut self,
        names: &[S],
        active: bool,
    ) -> ToolResult<Vec<String>> {
        self.groups.set_active(names, active)
    }

    pub fn equip<S: AsRef<str>>(&mut self, names: &[S]) -> ToolResult<Vec<String>> {
        self.groups.equip(names)
    }

    pub fn group(&self, name: &str) -> Option<&ToolGroup> {
        self.groups.get(name)
    }

    pub fn activation(&self) -> GroupActivation {
        self.groups.activation()
    }

    pub fn restore_activation(&mut self, activation: &GroupActivation) {
        self.groups.restore(activation);
    }

    /// Remove every tool and non-default group. The meta tool survives.
    pub fn clear(&mut self) {
        let keep = self.meta_tool.clone();
        self.tools.retain(|name, _| Some(name) == keep.as_ref());
        self.order.retain(|name| Some(name) == keep.as_ref());
        self.groups.clear();
        self.refresh_meta_schema();
        debug!("Cleared tool registry");
    }

    pub(crate) fn set_meta_tool(&mut self, name: String) {
        self.meta_tool = Some(name);
        self.refresh_meta_schema();
    }

    /// Rebuild the meta tool's schema so its description lists current groups.
    fn refresh_meta_schema(&mut self) {
        let Some(name) = self.meta_tool.clone() else {
            return;
        };
        let Some(current) = self.tools.get(&name) else {
            return;
        };

        let mut signature = meta::equip_signature(&self.groups);
        signature.name = name.clone();
        // The meta signature is always well formed; keep the old one otherwise.
        let extracted = extract_schema(
            &signature,
            &current.preset_keys(),
            current.extension.as_ref(),
        );
        if let Ok(schema) = extracted {
            let mut updated = ToolDescriptor::clone(current);
            updated.signature = signature;
            updated.schema = schema;
            self.tools.insert(name, Arc::new(updated));
        }
    }
}
