//! Capability Guard
//!
//! Hides or shows fragments inside an already rendered page. Membership in
//! the allowed set is exact; nothing here navigates.

use super::CapabilityDecision;
use crate::auth::{is_in_role_set, IdentityStore, Permission, ResourceId, RoleSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGuard {
    allowed_roles: RoleSet,
    required_permission: Option<Permission>,
    resource: Option<ResourceId>,
}

impl CapabilityGuard {
    pub fn new(allowed_roles: impl Into<RoleSet>) -> Self {
        Self {
            allowed_roles: allowed_roles.into(),
            required_permission: None,
            resource: None,
        }
    }

    /// Admits `{admin, owner}`
    pub fn admin_only() -> Self {
        Self::new(RoleSet::admin_only())
    }

    /// Admits `{manager, admin, owner}`
    pub fn manager_only() -> Self {
        Self::new(RoleSet::manager_only())
    }

    /// Admits `{member, manager, admin, owner}`
    pub fn member_only() -> Self {
        Self::new(RoleSet::member_only())
    }

    pub fn with_permission(mut self, permission: impl Into<Permission>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn allowed_roles(&self) -> RoleSet {
        self.allowed_roles
    }

    pub fn evaluate<S: IdentityStore + ?Sized>(&self, store: &S) -> CapabilityDecision {
        if store.is_loading() {
            return CapabilityDecision::Deny;
        }

        let role_ok = store
            .role()
            .is_some_and(|role| is_in_role_set(role, &self.allowed_roles));

        let permission_ok = role_ok
            && self
                .required_permission
                .as_ref()
                .map_or(true, |p| store.has_permission(p, self.resource.as_ref()));

        let decision = CapabilityDecision::from(permission_ok);
        debug!(
            allowed = %self.allowed_roles,
            decision = ?decision,
            "Capability guard evaluated"
        );
        decision
    }

    /// Children when allowed, nothing otherwise
    pub fn render<S, T>(&self, store: &S, children: impl FnOnce() -> T) -> Option<T>
    where
        S: IdentityStore + ?Sized,
    {
        self.evaluate(store).is_allowed().then(children)
    }

    /// Children when allowed, `fallback` otherwise
    pub fn render_or<S, T>(
        &self,
        store: &S,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T
    where
        S: IdentityStore + ?Sized,
    {
        match self.evaluate(store) {
            CapabilityDecision::Allow => children(),
            CapabilityDecision::Deny => fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessContext, PermissionOverride, Role, UserIdentity};

    fn user(role: Role) -> AccessContext {
        AccessContext::user(UserIdentity::new("u-1").with_role(role))
    }

    #[test]
    fn test_admin_only_admits_admin_and_owner() {
        let guard = CapabilityGuard::admin_only();
        for role in Role::ALL {
            let rendered = guard.render(&user(role), || "settings");
            assert_eq!(rendered.is_some(), role.is_admin(), "{}", role);
        }
    }

    #[test]
    fn test_manager_and_member_presets() {
        assert!(!CapabilityGuard::manager_only().evaluate(&user(Role::Member)).is_allowed());
        assert!(CapabilityGuard::manager_only().evaluate(&user(Role::Manager)).is_allowed());
        assert!(!CapabilityGuard::member_only().evaluate(&user(Role::Viewer)).is_allowed());
        assert!(CapabilityGuard::member_only().evaluate(&user(Role::Owner)).is_allowed());
    }

    #[test]
    fn test_exact_membership_not_rank() {
        let guard = CapabilityGuard::new([Role::Viewer, Role::Owner]);
        assert!(guard.evaluate(&user(Role::Viewer)).is_allowed());
        assert!(!guard.evaluate(&user(Role::Admin)).is_allowed());
    }

    #[test]
    fn test_permission_is_anded_with_role() {
        let guard = CapabilityGuard::member_only()
            .with_permission(Permission::PROJECTS_MANAGE)
            .with_resource("p-1");

        assert!(!guard.evaluate(&user(Role::Member)).is_allowed());

        let granted = AccessContext::user(
            UserIdentity::new("u-2")
                .with_role(Role::Member)
                .with_override(PermissionOverride::grant(Permission::PROJECTS_MANAGE, "p-1")),
        );
        assert!(guard.evaluate(&granted).is_allowed());
    }

    #[test]
    fn test_fallback_and_missing_inputs() {
        let guard = CapabilityGuard::manager_only();
        assert_eq!(
            guard.render_or(&user(Role::Viewer), || "edit", || "read-only"),
            "read-only"
        );
        assert_eq!(guard.render(&AccessContext::anonymous(), || ()), None);
        assert_eq!(guard.render(&AccessContext::loading(), || ()), None);
        assert_eq!(
            guard.render(&AccessContext::user(UserIdentity::new("u-3")), || ()),
            None
        );
    }
}
