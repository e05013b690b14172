//! Route Guard
//!
//! Declarative protection for whole views. Precedence, first match wins:
//! loading, unauthenticated, role, permission, allow.

use super::GuardDecision;
use crate::auth::{IdentityStore, Permission, ResourceId, Role};
use tracing::{debug, warn};
use trellis_core::Location;

/// What a protected route asks of the current user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    /// Minimum workspace role (rank-based)
    pub required_role: Option<Role>,
    /// Permission key, optionally scoped by `resource`
    pub required_permission: Option<Permission>,
    pub resource: Option<ResourceId>,
}

impl RouteRequirement {
    /// Any signed-in user
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Which pair of store checks a guard evaluates the requirement with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckMode {
    /// `has_role` / `has_permission`
    Workspace,
    /// `has_system_role` / `has_admin_permission`
    System,
}

/// Shared precedence chain behind [`RouteGuard`] and the require-auth hook
pub(crate) fn evaluate_requirement<S: IdentityStore + ?Sized>(
    store: &S,
    location: &Location,
    requirement: &RouteRequirement,
    mode: CheckMode,
) -> GuardDecision {
    if store.is_loading() {
        return GuardDecision::Loading;
    }

    let Some(user) = store.current_user() else {
        return GuardDecision::redirect_to_auth(location);
    };

    if let Some(role) = requirement.required_role {
        let passed = match mode {
            CheckMode::Workspace => store.has_role(role),
            CheckMode::System => store.has_system_role(role),
        };
        if !passed {
            warn!(
                user_id = %user.user_id,
                required_role = %role,
                path = %location.pathname,
                "Role check failed"
            );
            return GuardDecision::RedirectToUnauthorized;
        }
    }

    if let Some(permission) = &requirement.required_permission {
        let resource = requirement.resource.as_ref();
        let passed = match mode {
            CheckMode::Workspace => store.has_permission(permission, resource),
            CheckMode::System => store.has_admin_permission(permission, resource),
        };
        if !passed {
            warn!(
                user_id = %user.user_id,
                permission = %permission,
                resource = resource.map(ResourceId::as_str),
                path = %location.pathname,
                "Permission check failed"
            );
            return GuardDecision::RedirectToUnauthorized;
        }
    }

    GuardDecision::Allow
}

/// Declarative guard for a protected view
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    requirement: RouteRequirement,
}

impl RouteGuard {
    pub fn new(requirement: RouteRequirement) -> Self {
        Self { requirement }
    }

    pub fn requirement(&self) -> &RouteRequirement {
        &self.requirement
    }

    /// Decide what to do for the current render
    pub fn evaluate<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        location: &Location,
    ) -> GuardDecision {
        let decision =
            evaluate_requirement(store, location, &self.requirement, CheckMode::Workspace);
        debug!(path = %location.pathname, decision = %decision, "Route guard evaluated");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessContext, PermissionOverride, UserIdentity};

    fn user(role: Role) -> AccessContext {
        AccessContext::user(UserIdentity::new("u-1").with_role(role))
    }

    #[test]
    fn test_loading_wins_over_everything() {
        let guard = RouteGuard::new(RouteRequirement::authenticated().role(Role::Owner));
        let mut loading = user(Role::Viewer);
        loading.loading = true;

        assert_eq!(
            guard.evaluate(&loading, &Location::parse("/admin")),
            GuardDecision::Loading
        );
        assert_eq!(
            guard.evaluate(&AccessContext::loading(), &Location::parse("/admin")),
            GuardDecision::Loading
        );
    }

    #[test]
    fn test_role_then_permission_precedence() {
        let guard = RouteGuard::new(
            RouteRequirement::authenticated()
                .role(Role::Manager)
                .permission(Permission::RESOURCES_MANAGE),
        );
        let location = Location::parse("/resources");

        assert_eq!(
            guard.evaluate(&user(Role::Member), &location),
            GuardDecision::RedirectToUnauthorized
        );
        assert_eq!(guard.evaluate(&user(Role::Manager), &location), GuardDecision::Allow);
    }

    #[test]
    fn test_role_and_permission_combine_with_and() {
        // Owner passes the role check but a resource deny blocks the permission
        let context = AccessContext::user(
            UserIdentity::new("u-2")
                .with_role(Role::Owner)
                .with_override(PermissionOverride::deny(Permission::PROJECTS_MANAGE, "p-1")),
        );
        let guard = RouteGuard::new(
            RouteRequirement::authenticated()
                .role(Role::Manager)
                .permission(Permission::PROJECTS_MANAGE)
                .resource("p-1"),
        );

        assert_eq!(
            guard.evaluate(&context, &Location::parse("/projects/p-1")),
            GuardDecision::RedirectToUnauthorized
        );
    }

    #[test]
    fn test_blank_permission_denies() {
        let guard = RouteGuard::new(RouteRequirement::authenticated().permission(""));
        assert_eq!(
            guard.evaluate(&user(Role::Owner), &Location::parse("/billing")),
            GuardDecision::RedirectToUnauthorized
        );
    }

    #[test]
    fn test_no_requirement_allows_any_user() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.evaluate(&user(Role::Viewer), &Location::parse("/dashboard")),
            GuardDecision::Allow
        );
        assert!(matches!(
            guard.evaluate(&AccessContext::anonymous(), &Location::parse("/dashboard")),
            GuardDecision::RedirectToAuth { .. }
        ));
    }

    #[test]
    fn test_system_mode_uses_rank_based_variants() {
        let context = AccessContext::user(
            UserIdentity::new("u-3")
                .with_role(Role::Viewer)
                .with_system_role(Role::Admin),
        );
        let requirement = RouteRequirement::authenticated()
            .role(Role::Admin)
            .permission(Permission::WORKSPACE_BILLING);
        let location = Location::parse("/admin");

        assert_eq!(
            evaluate_requirement(&context, &location, &requirement, CheckMode::System),
            GuardDecision::Allow
        );
        assert_eq!(
            evaluate_requirement(&context, &location, &requirement, CheckMode::Workspace),
            GuardDecision::RedirectToUnauthorized
        );
    }
}
