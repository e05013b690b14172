//! Permission System
//!
//! Permissions are opaque string keys. A user's effective set is derived from
//! their role, then adjusted by resource-scoped overrides held by the
//! identity store.

use super::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Fine-grained capability key, e.g. `projects.manage`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub const WORKSPACE_VIEW: &'static str = "workspace.view";
    pub const PROJECTS_VIEW: &'static str = "projects.view";
    pub const TASKS_VIEW: &'static str = "tasks.view";
    pub const TASKS_EDIT: &'static str = "tasks.edit";
    pub const TASKS_COMMENT: &'static str = "tasks.comment";
    pub const ASSISTANT_USE: &'static str = "assistant.use";
    pub const PROJECTS_MANAGE: &'static str = "projects.manage";
    pub const RESOURCES_MANAGE: &'static str = "resources.manage";
    pub const MEMBERS_INVITE: &'static str = "members.invite";
    pub const MEMBERS_MANAGE: &'static str = "members.manage";
    pub const WORKSPACE_SETTINGS: &'static str = "workspace.settings";
    pub const WORKSPACE_BILLING: &'static str = "workspace.billing";
    pub const WORKSPACE_DELETE: &'static str = "workspace.delete";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key can never be satisfied
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Permission {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Permission {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a project, resource or other scoped object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an override adds or removes a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideEffect {
    Grant,
    Deny,
}

/// Resource-scoped adjustment to the role-derived permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    pub permission: Permission,
    pub resource: ResourceId,
    pub effect: OverrideEffect,
}

impl PermissionOverride {
    pub fn grant(permission: impl Into<Permission>, resource: impl Into<ResourceId>) -> Self {
        Self {
            permission: permission.into(),
            resource: resource.into(),
            effect: OverrideEffect::Grant,
        }
    }

    pub fn deny(permission: impl Into<Permission>, resource: impl Into<ResourceId>) -> Self {
        Self {
            permission: permission.into(),
            resource: resource.into(),
            effect: OverrideEffect::Deny,
        }
    }

    fn applies_to(&self, permission: &Permission, resource: &ResourceId) -> bool {
        &self.permission == permission && &self.resource == resource
    }
}

impl Role {
    /// Keys introduced at exactly this level of the hierarchy
    fn own_permission_keys(self) -> &'static [&'static str] {
        match self {
            Role::Viewer => &[
                Permission::WORKSPACE_VIEW,
                Permission::PROJECTS_VIEW,
                Permission::TASKS_VIEW,
            ],
            Role::Member => &[
                Permission::TASKS_EDIT,
                Permission::TASKS_COMMENT,
                Permission::ASSISTANT_USE,
            ],
            Role::Manager => &[
                Permission::PROJECTS_MANAGE,
                Permission::RESOURCES_MANAGE,
                Permission::MEMBERS_INVITE,
            ],
            Role::Admin => &[Permission::MEMBERS_MANAGE, Permission::WORKSPACE_SETTINGS],
            Role::Owner => &[Permission::WORKSPACE_BILLING, Permission::WORKSPACE_DELETE],
        }
    }

    /// Permissions granted by this role alone; each role includes the ones below it
    pub fn default_permissions(self) -> HashSet<Permission> {
        Role::ALL
            .into_iter()
            .filter(|role| *role <= self)
            .flat_map(|role| role.own_permission_keys().iter().copied())
            .map(Permission::from)
            .collect()
    }
}

/// Resolve a permission check against a role and a list of overrides.
///
/// A resource-scoped override for the exact `(permission, resource)` pair
/// wins over the role default. Blank keys and missing roles deny.
pub fn resolve_permission(
    role: Option<Role>,
    overrides: &[PermissionOverride],
    permission: &Permission,
    resource: Option<&ResourceId>,
) -> bool {
    if permission.is_blank() {
        return false;
    }

    if let Some(resource) = resource {
        // Last matching override wins, so later grants can undo earlier denies
        if let Some(found) = overrides
            .iter()
            .rev()
            .find(|o| o.applies_to(permission, resource))
        {
            return found.effect == OverrideEffect::Grant;
        }
    }

    role.is_some_and(|role| role.default_permissions().contains(permission))
}
