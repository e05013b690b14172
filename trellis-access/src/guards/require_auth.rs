//! Imperative route protection
//!
//! [`RequireAuth`] evaluates the same precedence chain as the route guard,
//! using the rank-based system checks, and navigates instead of returning a
//! decision. It re-runs only when one of its inputs changed since the last
//! run, so repeated renders with the same state never navigate twice.

use super::route::{evaluate_requirement, CheckMode};
use super::{GuardDecision, RouteRequirement};
use crate::auth::{IdentityStore, Permission, ResourceId, Role, UserIdentity};
use serde::Serialize;
use tracing::info;
use trellis_core::{NavigateOptions, Navigator, RouteSettings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequireAuthOptions {
    pub required_role: Option<Role>,
    pub required_permission: Option<Permission>,
    pub resource: Option<ResourceId>,
    /// Where unauthenticated users are sent; the auth route when unset
    pub redirect_to: Option<String>,
}

impl RequireAuthOptions {
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

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    fn requirement(&self) -> RouteRequirement {
        RouteRequirement {
            required_role: self.required_role,
            required_permission: self.required_permission.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Derived booleans for callers that branch without relying on the redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequireAuthStatus {
    pub user: Option<UserIdentity>,
    pub loading: bool,
    pub is_authenticated: bool,
    pub is_authorized: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Inputs {
    user: Option<UserIdentity>,
    loading: bool,
    required_role: Option<Role>,
    required_permission: Option<Permission>,
    resource: Option<ResourceId>,
}

#[derive(Debug)]
pub struct RequireAuth {
    options: RequireAuthOptions,
    routes: RouteSettings,
    last_inputs: Option<Inputs>,
}

impl RequireAuth {
    pub fn new(options: RequireAuthOptions, routes: RouteSettings) -> Self {
        Self {
            options,
            routes,
            last_inputs: None,
        }
    }

    pub fn options(&self) -> &RequireAuthOptions {
        &self.options
    }

    /// Swap the requirement; the next sync re-evaluates if it changed
    pub fn set_options(&mut self, options: RequireAuthOptions) {
        self.options = options;
    }

    /// Evaluate against the current store state, navigating when required
    pub fn sync<S, N>(&mut self, store: &S, navigator: &N) -> RequireAuthStatus
    where
        S: IdentityStore + ?Sized,
        N: Navigator + ?Sized,
    {
        let user = store.current_user();
        let loading = store.is_loading();
        let location = navigator.location();
        let decision =
            evaluate_requirement(store, &location, &self.options.requirement(), CheckMode::System);

        let status = RequireAuthStatus {
            is_authenticated: user.is_some(),
            is_authorized: decision.is_allowed(),
            user: user.clone(),
            loading,
        };

        let inputs = Inputs {
            user,
            loading,
            required_role: self.options.required_role,
            required_permission: self.options.required_permission.clone(),
            resource: self.options.resource.clone(),
        };
        if self.last_inputs.as_ref() == Some(&inputs) {
            return status;
        }
        self.last_inputs = Some(inputs);

        let target = match decision {
            GuardDecision::Loading | GuardDecision::Allow => None,
            GuardDecision::RedirectToAuth { .. } => Some(
                self.options
                    .redirect_to
                    .clone()
                    .unwrap_or_else(|| self.routes.auth_route.clone()),
            ),
            GuardDecision::RedirectToUnauthorized => Some(self.routes.unauthorized_route.clone()),
        };

        if let Some(target) = target {
            info!(from = %location.pathname, to = %target, "Redirecting");
            navigator.navigate(&target, NavigateOptions::replace());
        }

        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryIdentityStore;
    use crate::guards::test_support::RecordingNavigator;

    fn hook(options: RequireAuthOptions) -> RequireAuth {
        RequireAuth::new(options, RouteSettings::default())
    }

    #[test]
    fn test_never_navigates_while_loading() {
        let store = InMemoryIdentityStore::new();
        let navigator = RecordingNavigator::at("/projects");
        let mut require = hook(RequireAuthOptions::default());

        let status = require.sync(&store, &navigator);
        assert!(status.loading);
        assert!(!status.is_authenticated);
        assert!(navigator.calls().is_empty());
    }

    #[test]
    fn test_redirects_after_loading_resolves() {
        let store = InMemoryIdentityStore::new();
        let navigator = RecordingNavigator::at("/projects");
        let mut require = hook(RequireAuthOptions::default());

        require.sync(&store, &navigator);
        store.resolve(None);
        require.sync(&store, &navigator);

        assert_eq!(navigator.calls(), vec![("/auth".to_string(), true)]);
    }

    #[test]
    fn test_custom_redirect_target() {
        let store = InMemoryIdentityStore::signed_out();
        let navigator = RecordingNavigator::at("/projects");
        let mut require = hook(RequireAuthOptions::default().redirect_to("/welcome"));

        require.sync(&store, &navigator);
        assert_eq!(navigator.calls(), vec![("/welcome".to_string(), true)]);
    }

    #[test]
    fn test_unauthorized_uses_system_role() {
        let store =
            InMemoryIdentityStore::with_user(UserIdentity::new("u-1").with_role(Role::Member));
        let navigator = RecordingNavigator::at("/admin");
        let mut require = hook(RequireAuthOptions::default().role(Role::Admin));

        let status = require.sync(&store, &navigator);
        assert!(status.is_authenticated);
        assert!(!status.is_authorized);
        assert_eq!(navigator.calls(), vec![("/unauthorized".to_string(), true)]);

        // System admin passes even though the workspace role is lower
        let admin = InMemoryIdentityStore::with_user(
            UserIdentity::new("u-2")
                .with_role(Role::Member)
                .with_system_role(Role::Admin),
        );
        let navigator = RecordingNavigator::at("/admin");
        let status = hook(RequireAuthOptions::default().role(Role::Admin)).sync(&admin, &navigator);
        assert!(status.is_authorized);
        assert!(navigator.calls().is_empty());
    }

    #[test]
    fn test_reruns_only_when_inputs_change() {
        let store = InMemoryIdentityStore::signed_out();
        let navigator = RecordingNavigator::at("/projects");
        let mut require = hook(RequireAuthOptions::default());

        require.sync(&store, &navigator);
        require.sync(&store, &navigator);
        assert_eq!(navigator.calls().len(), 1);

        // A changed requirement re-runs the evaluation
        require.set_options(RequireAuthOptions::default().role(Role::Viewer));
        require.sync(&store, &navigator);
        assert_eq!(navigator.calls().len(), 2);

        // So does a changed user
        store.resolve(Some(UserIdentity::new("u-1")));
        let status = require.sync(&store, &navigator);
        assert_eq!(navigator.calls().len(), 3);
        assert_eq!(navigator.calls()[2].0, "/unauthorized");
        assert!(!status.is_authorized);
    }
}
