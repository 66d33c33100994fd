//! Tool groups and activation state
//!
//! Groups toggle the visibility of related tools together. The reserved
//! [`DEFAULT_GROUP`] is created with the manager, is always active and can
//! neither be deactivated nor removed.

use armory_core::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Name of the reserved, always-active group.
pub const DEFAULT_GROUP: &str = "basic";

/// A named set of tools whose visibility is toggled together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolGroup {
    pub name: String,
    pub description: String,
    pub active: bool,
    /// Operating guidance surfaced to the agent while the group is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Serializable snapshot of which groups are active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupActivation {
    pub active_groups: Vec<String>,
}

/// Owns all groups in creation order.
#[derive(Debug, Clone)]
pub struct GroupManager {
    groups: Vec<ToolGroup>,
}

impl Default for GroupManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupManager {
    /// Create a manager holding only the default group.
    pub fn new() -> Self {
        Self {
            groups: vec![ToolGroup {
                name: DEFAULT_GROUP.to_string(),
                description: "Tools that are always available.".to_string(),
                active: true,
                notes: None,
            }],
        }
    }

    /// Create a new group.
    ///
    /// # Errors
    ///
    /// `ReservedGroup` for the default group's name, `DuplicateGroup` if the
    /// name is taken.
    pub fn create_group(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        active: bool,
        notes: Option<String>,
    ) -> ToolResult<()> {
        let name = name.into();
        if name == DEFAULT_GROUP {
            return Err(ToolError::ReservedGroup(name));
        }
        if self.contains(&name) {
            return Err(ToolError::DuplicateGroup(name));
        }
        info!(group = %name, active, "Created tool group");
        self.groups.push(ToolGroup {
            name,
            description: description.into(),
            active,
            notes,
        });
        Ok(())
    }

    /// Remove a group, returning it.
    pub fn remove_group(&mut self, name: &str) -> ToolResult<ToolGroup> {
        if name == DEFAULT_GROUP {
            return Err(ToolError::ReservedGroup(name.to_string()));
        }
        let index = self
            .groups
            .iter()
            .position(|group| group.name == name)
            .ok_or_else(|| ToolError::GroupNotFound(name.to_string()))?;
        Ok(self.groups.remove(index))
    }

    /// Set the activation of the named groups.
    ///
    /// The default group is skipped silently. Unknown names fail before any
    /// group is changed. Returns the groups whose state actually flipped.
    pub fn set_active<S: AsRef<str>>(
        &mut self,
        names: &[S],
        active: bool,
    ) -> ToolResult<Vec<String>> {
        self.ensure_known(names)?;

        let mut changed = Vec::new();
        for group in self.groups.iter_mut().filter(|g| g.name != DEFAULT_GROUP) {
            if names.iter().any(|n| n.as_ref() == group.name) && group.active != active {
                group.active = active;
                changed.push(group.name.clone());
            }
        }
        if !changed.is_empty() {
            info!(groups = ?changed, active, "Updated tool group activation");
        }
        Ok(changed)
    }

    /// Activate exactly `names` and deactivate every other non-default group.
    ///
    /// Returns the groups that were inactive and are now active.
    pub fn equip<S: AsRef<str>>(&mut self, names: &[S]) -> ToolResult<Vec<String>> {
        self.ensure_known(names)?;

        let mut newly_active = Vec::new();
        for group in self.groups.iter_mut().filter(|g| g.name != DEFAULT_GROUP) {
            let wanted = names.iter().any(|n| n.as_ref() == group.name);
            if wanted && !group.active {
                newly_active.push(group.name.clone());
            }
            group.active = wanted;
        }
        info!(groups = ?self.active_names(), "Equipped tool groups");
        Ok(newly_active)
    }

    /// Whether tools in `name` are currently exposed.
    pub fn is_active(&self, name: &str) -> bool {
        name == DEFAULT_GROUP || self.get(name).is_some_and(|group| group.active)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ToolGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// All groups, default first, then in creation order.
    pub fn groups(&self) -> &[ToolGroup] {
        &self.groups
    }

    /// Notes of the currently active groups, in creation order.
    pub fn activated_notes(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|group| self.is_active(&group.name))
            .filter_map(|group| group.notes.clone())
            .collect()
    }

    /// Names of active groups, default included.
    pub fn active_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|group| self.is_active(&group.name))
            .map(|group| group.name.clone())
            .collect()
    }

    /// Snapshot of the activation state.
    pub fn activation(&self) -> GroupActivation {
        GroupActivation {
            active_groups: self
                .active_names()
                .into_iter()
                .filter(|name| name != DEFAULT_GROUP)
                .collect(),
        }
    }

    /// Restore an activation snapshot.
    ///
    /// Groups that no longer exist are skipped with a warning so snapshots
    /// from older sessions stay loadable.
    pub fn restore(&mut self, activation: &GroupActivation) {
        for name in &activation.active_groups {
            if !self.contains(name) {
                warn!(group = %name, "Skipping unknown group in activation snapshot");
            }
        }
        for group in self.groups.iter_mut().filter(|g| g.name != DEFAULT_GROUP) {
            group.active = activation.active_groups.contains(&group.name);
        }
    }

    /// Drop every group except the default one.
    pub fn clear(&mut self) {
        self.groups.retain(|group| group.name == DEFAULT_GROUP);
    }

    fn ensure_known<S: AsRef<str>>(&self, names: &[S]) -> ToolResult<()> {
        match names.iter().find(|name| !self.contains(name.as_ref())) {
            Some(unknown) => Err(ToolError::GroupNotFound(unknown.as_ref().to_string())),
            None => Ok(()),
        }
    }
}
