//! User Identity Management
//!
//! Defines the identity record and the identity store contract every guard
//! reads from. The store is the single source of truth for who is signed in,
//! which role they hold in the current workspace, and what they may do.

use super::permissions::{resolve_permission, PermissionOverride};
use super::{meets_minimum_role, Permission, ResourceId, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// User identity information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique user identifier
    pub user_id: String,
    /// Display name (optional)
    pub display_name: Option<String>,
    /// User email (optional)
    pub email: Option<String>,
    /// Workspace the role below applies to
    pub workspace_id: Option<String>,
    /// Role in the current workspace; `None` until resolved
    pub role: Option<Role>,
    /// Platform-wide role, checked by the rank-based variants
    pub system_role: Option<Role>,
    /// Resource-scoped permission adjustments
    pub overrides: Vec<PermissionOverride>,
    /// Additional user metadata
    pub metadata: HashMap<String, String>,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
            workspace_id: None,
            role: None,
            system_role: None,
            overrides: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_system_role(mut self, role: Role) -> Self {
        self.system_role = Some(role);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_override(mut self, permission_override: PermissionOverride) -> Self {
        self.overrides.push(permission_override);
        self
    }

    /// System role, falling back to the workspace role when none is assigned
    pub fn effective_system_role(&self) -> Option<Role> {
        self.system_role.or(self.role)
    }

    /// Check a permission, optionally scoped to a resource
    pub fn has_permission(&self, permission: &Permission, resource: Option<&ResourceId>) -> bool {
        resolve_permission(self.role, &self.overrides, permission, resource)
    }

    /// Get user display string
    pub fn display_string(&self) -> String {
        let role = self.role.map(Role::as_str).unwrap_or("no role");
        match &self.display_name {
            Some(name) => format!("{} ({})", name, role),
            None => format!("{} ({})", self.user_id, role),
        }
    }
}

/// Identity store contract consumed by the guards.
///
/// Implementations report `loading = true` until the identity is resolved.
/// A store that fails to resolve must settle on `loading = false` with no
/// user; guards then take the unauthenticated path.
pub trait IdentityStore: Send + Sync {
    /// Currently signed-in user, if any
    fn current_user(&self) -> Option<UserIdentity>;

    /// Whether identity resolution is still in progress
    fn is_loading(&self) -> bool;

    /// Role of the current user in the active workspace
    fn role(&self) -> Option<Role> {
        self.current_user().and_then(|user| user.role)
    }

    /// Rank-based workspace role check
    fn has_role(&self, role: Role) -> bool {
        self.role()
            .is_some_and(|current| meets_minimum_role(current, role))
    }

    /// Permission check, optionally scoped to a resource
    fn has_permission(&self, permission: &Permission, resource: Option<&ResourceId>) -> bool {
        self.current_user()
            .is_some_and(|user| user.has_permission(permission, resource))
    }

    /// Rank-based system role check
    fn has_system_role(&self, role: Role) -> bool {
        self.current_user()
            .and_then(|user| user.effective_system_role())
            .is_some_and(|current| meets_minimum_role(current, role))
    }

    /// Permission check where system admins pass every non-blank key
    fn has_admin_permission(&self, permission: &Permission, resource: Option<&ResourceId>) -> bool {
        match self.current_user() {
            Some(user) if user.effective_system_role().is_some_and(Role::is_admin) => {
                !permission.is_blank()
            }
            Some(user) => user.has_permission(permission, resource),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
struct IdentityState {
    user: Option<UserIdentity>,
    loading: bool,
}

/// Simple in-memory identity store for tests and embedded deployments
#[derive(Debug)]
pub struct InMemoryIdentityStore {
    state: RwLock<IdentityState>,
}

impl InMemoryIdentityStore {
    /// A store that has not resolved the identity yet
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IdentityState {
                user: None,
                loading: true,
            }),
        }
    }

    /// A resolved store with nobody signed in
    pub fn signed_out() -> Self {
        Self {
            state: RwLock::new(IdentityState {
                user: None,
                loading: false,
            }),
        }
    }

    /// A resolved store with `user` signed in
    pub fn with_user(user: UserIdentity) -> Self {
        Self {
            state: RwLock::new(IdentityState {
                user: Some(user),
                loading: false,
            }),
        }
    }

    /// Mark identity resolution as in progress
    pub fn begin_loading(&self) {
        self.write(|state| state.loading = true);
    }

    /// Finish resolution with the given user (or nobody)
    pub fn resolve(&self, user: Option<UserIdentity>) {
        debug!(
            user_id = user.as_ref().map(|u| u.user_id.as_str()),
            "Identity resolved"
        );
        self.write(|state| {
            state.user = user;
            state.loading = false;
        });
    }

    /// Resolution failed; settle on the unauthenticated state
    pub fn fail_resolution(&self, reason: &str) {
        warn!(reason = reason, "Identity resolution failed, treating as signed out");
        self.resolve(None);
    }

    /// Switch the active workspace role of the current user
    pub fn set_role(&self, role: Option<Role>) {
        self.write(|state| {
            if let Some(user) = state.user.as_mut() {
                user.role = role;
            }
        });
    }

    /// Forget the current user without touching the loading flag
    pub fn clear(&self) {
        self.write(|state| state.user = None);
    }

    fn write(&self, f: impl FnOnce(&mut IdentityState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    fn read(&self) -> IdentityState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn current_user(&self) -> Option<UserIdentity> {
        self.read().user
    }

    fn is_loading(&self) -> bool {
        self.read().loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> UserIdentity {
        UserIdentity::new("u-1")
            .with_display_name("Dana")
            .with_role(Role::Member)
    }

    #[test]
    fn test_store_lifecycle() {
        let store = InMemoryIdentityStore::new();
        assert!(store.is_loading());
        assert!(store.current_user().is_none());

        store.resolve(Some(member()));
        assert!(!store.is_loading());
        assert_eq!(store.role(), Some(Role::Member));

        store.clear();
        assert!(store.current_user().is_none());
        assert!(!store.is_loading());
    }

    #[test]
    fn test_failed_resolution_is_signed_out() {
        let store = InMemoryIdentityStore::new();
        store.fail_resolution("role lookup failed");
        assert!(!store.is_loading());
        assert!(store.current_user().is_none());
        assert!(!store.has_role(Role::Viewer));
    }

    #[test]
    fn test_has_role_is_rank_based() {
        let store = InMemoryIdentityStore::with_user(member());
        assert!(store.has_role(Role::Viewer));
        assert!(store.has_role(Role::Member));
        assert!(!store.has_role(Role::Manager));
    }

    #[test]
    fn test_missing_role_denies() {
        let store = InMemoryIdentityStore::with_user(UserIdentity::new("u-2"));
        assert!(!store.has_role(Role::Viewer));
        assert!(!store.has_permission(&Permission::from(Permission::WORKSPACE_VIEW), None));
    }

    #[test]
    fn test_system_role_falls_back_to_workspace_role() {
        let store = InMemoryIdentityStore::with_user(member());
        assert!(store.has_system_role(Role::Member));
        assert!(!store.has_system_role(Role::Admin));

        let admin = InMemoryIdentityStore::with_user(member().with_system_role(Role::Admin));
        assert!(admin.has_system_role(Role::Admin));
        // Workspace role is unaffected by the system role
        assert!(!admin.has_role(Role::Manager));
    }

    #[test]
    fn test_admin_permission_bypass() {
        let billing = Permission::from(Permission::WORKSPACE_BILLING);

        let member_store = InMemoryIdentityStore::with_user(member());
        assert!(!member_store.has_admin_permission(&billing, None));

        let owner_store =
            InMemoryIdentityStore::with_user(member().with_system_role(Role::Owner));
        assert!(owner_store.has_admin_permission(&billing, None));
        assert!(!owner_store.has_admin_permission(&Permission::from(""), None));
        assert!(!owner_store.has_permission(&billing, None));
    }

    #[test]
    fn test_set_role_switches_workspace_role() {
        let store = InMemoryIdentityStore::with_user(member());
        store.set_role(Some(Role::Owner));
        assert!(store.has_role(Role::Admin));
        store.set_role(None);
        assert!(!store.has_role(Role::Viewer));
    }

    #[test]
    fn test_display_string() {
        assert_eq!(member().display_string(), "Dana (member)");
        assert_eq!(UserIdentity::new("u-3").display_string(), "u-3 (no role)");
    }
}
