//! Access Context
//!
//! An immutable snapshot of the identity store, taken once per request or
//! render so every guard evaluated for it sees the same answer.

use super::{IdentityStore, PermissionOverride, Role, UserIdentity};
use std::collections::HashMap;

/// Point-in-time authorization information
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    /// Signed-in user (None for anonymous callers)
    pub identity: Option<UserIdentity>,
    /// Identity resolution still in flight
    pub loading: bool,
    /// Additional context metadata
    pub metadata: HashMap<String, String>,
}

impl AccessContext {
    /// Context for a caller whose identity is not resolved yet
    pub fn loading() -> Self {
        Self {
            identity: None,
            loading: true,
            metadata: HashMap::new(),
        }
    }

    /// Resolved context with nobody signed in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolved context for a signed-in user
    pub fn user(identity: UserIdentity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
            metadata: HashMap::new(),
        }
    }

    /// Freeze the current state of any identity store
    pub fn snapshot(store: &dyn IdentityStore) -> Self {
        Self {
            identity: store.current_user(),
            loading: store.is_loading(),
            metadata: HashMap::new(),
        }
    }

    /// Get user ID if available
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_id.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// Add metadata to the context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Create a summary string for logging
    pub fn summary(&self) -> String {
        if self.loading {
            return "AccessContext[loading]".to_string();
        }

        match &self.identity {
            Some(identity) => format!(
                "AccessContext[user={}, role={}, system_role={}, overrides={}]",
                identity.user_id,
                identity.role.map(Role::as_str).unwrap_or("-"),
                identity.system_role.map(Role::as_str).unwrap_or("-"),
                identity.overrides.len()
            ),
            None => "AccessContext[anonymous]".to_string(),
        }
    }

    /// Create context from request headers.
    ///
    /// `x-user-id` identifies the caller; `x-user-role` and `x-system-role`
    /// carry role names. Unknown role names are treated as no role.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let Some(user_id) = headers.get("x-user-id").filter(|id| !id.trim().is_empty()) else {
            return Self::anonymous();
        };

        let mut identity = UserIdentity::new(user_id.trim());
        identity.role = headers.get("x-user-role").and_then(|r| r.parse().ok());
        identity.system_role = headers.get("x-system-role").and_then(|r| r.parse().ok());
        identity.display_name = headers.get("x-user-name").cloned();
        identity.email = headers.get("x-user-email").cloned();
        identity.workspace_id = headers.get("x-workspace-id").cloned();

        Self::user(identity)
    }
}

impl IdentityStore for AccessContext {
    fn current_user(&self) -> Option<UserIdentity> {
        self.identity.clone()
    }

    fn is_loading(&self) -> bool {
        self.loading
    }
}

/// Builder for access contexts
#[derive(Debug, Default)]
pub struct AccessContextBuilder {
    identity: Option<UserIdentity>,
    loading: bool,
    overrides: Vec<PermissionOverride>,
    metadata: HashMap<String, String>,
}

impl AccessContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set user identity
    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Add a resource-scoped override to the identity
    pub fn add_override(mut self, permission_override: PermissionOverride) -> Self {
        self.overrides.push(permission_override);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the access context; overrides without an identity are dropped
    pub fn build(self) -> AccessContext {
        let identity = self.identity.map(|mut identity| {
            identity.overrides.extend(self.overrides);
            identity
        });

        AccessContext {
            identity,
            loading: self.loading,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryIdentityStore, Permission};

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_headers_with_roles() {
        let context = AccessContext::from_headers(&headers(&[
            ("x-user-id", "u-7"),
            ("x-user-role", "manager"),
            ("x-system-role", "owner"),
        ]));

        assert_eq!(context.user_id(), Some("u-7"));
        assert_eq!(context.role(), Some(Role::Manager));
        assert!(context.has_system_role(Role::Owner));
        assert!(!context.is_loading());
    }

    #[test]
    fn test_from_headers_anonymous_and_unknown_role() {
        let anonymous = AccessContext::from_headers(&HashMap::new());
        assert!(anonymous.is_anonymous());
        assert!(!anonymous.is_loading());

        let unknown = AccessContext::from_headers(&headers(&[
            ("x-user-id", "u-8"),
            ("x-user-role", "superuser"),
        ]));
        assert!(!unknown.is_anonymous());
        assert_eq!(unknown.role(), None);
        assert!(!unknown.has_role(Role::Viewer));
    }

    #[test]
    fn test_snapshot_is_detached_from_store() {
        let store =
            InMemoryIdentityStore::with_user(UserIdentity::new("u-1").with_role(Role::Admin));
        let context = AccessContext::snapshot(&store);
        store.clear();

        assert!(store.current_user().is_none());
        assert!(context.has_role(Role::Admin));
    }

    #[test]
    fn test_builder_attaches_overrides() {
        let context = AccessContextBuilder::new()
            .with_identity(UserIdentity::new("u-2").with_role(Role::Viewer))
            .add_override(PermissionOverride::grant(Permission::TASKS_EDIT, "proj-1"))
            .with_metadata("request_id", "r-1")
            .build();

        let edit = Permission::from(Permission::TASKS_EDIT);
        assert!(context.has_permission(&edit, Some(&"proj-1".into())));
        assert!(!context.has_permission(&edit, None));
        assert_eq!(context.get_metadata("request_id"), Some("r-1"));
    }

    #[test]
    fn test_summary() {
        assert_eq!(AccessContext::loading().summary(), "AccessContext[loading]");
        assert_eq!(AccessContext::anonymous().summary(), "AccessContext[anonymous]");
        let context = AccessContext::user(UserIdentity::new("u-3").with_role(Role::Member));
        assert_eq!(
            context.summary(),
            "AccessContext[user=u-3, role=member, system_role=-, overrides=0]"
        );
    }
}
