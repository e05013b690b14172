//! Workspace roles and the two role-check semantics
//!
//! Route protection asks "does the user hold at least this role?"
//! ([`meets_minimum_role`]), while fragment-level guards ask "is the user's
//! role one of these?" ([`is_in_role_set`]). The allow-lists used by the
//! convenience guards are pre-expanded upward, so the two agree for them, but
//! the checks stay separate so each can be pinned down on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a user within a workspace.
///
/// Ordered from least to most privileged:
/// Viewer < Member < Manager < Admin < Owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access to workspace content
    Viewer,
    /// Works on tasks inside projects
    Member,
    /// Runs projects and allocates resources
    Manager,
    /// Administers the workspace
    Admin,
    /// Owns the workspace; superset of admin
    Owner,
}

impl Role {
    /// Every role, least privileged first
    pub const ALL: [Role; 5] = [
        Role::Viewer,
        Role::Member,
        Role::Manager,
        Role::Admin,
        Role::Owner,
    ];

    /// Position in the hierarchy, starting at 0 for viewer
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Member => "member",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Admin-only areas accept owners too
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "member" => Ok(Role::Member),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Rank-based check: `user` is `required` or ranks above it
pub fn meets_minimum_role(user: Role, required: Role) -> bool {
    user.rank() >= required.rank()
}

/// Allow-list check: exact membership, no rank comparison
pub fn is_in_role_set(user: Role, allowed: &RoleSet) -> bool {
    allowed.contains(user)
}

/// A set of roles, stored as a bitmask over [`Role::rank`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// `min` and every role above it
    pub fn at_least(min: Role) -> Self {
        Role::ALL
            .into_iter()
            .filter(|role| meets_minimum_role(*role, min))
            .collect()
    }

    /// `{admin, owner}`
    pub fn admin_only() -> Self {
        Self::at_least(Role::Admin)
    }

    /// `{manager, admin, owner}`
    pub fn manager_only() -> Self {
        Self::at_least(Role::Manager)
    }

    /// `{member, manager, admin, owner}`
    pub fn member_only() -> Self {
        Self::at_least(Role::Member)
    }

    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= 1 << role.rank();
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & (1 << role.rank()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Least privileged role in the set
    pub fn minimum(&self) -> Option<Role> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_role_matches_rank_order() {
        for user in Role::ALL {
            for required in Role::ALL {
                assert_eq!(
                    meets_minimum_role(user, required),
                    user.rank() >= required.rank(),
                    "{} vs {}",
                    user,
                    required
                );
            }
        }
    }

    #[test]
    fn test_role_order_is_total() {
        assert!(Role::Viewer < Role::Member);
        assert!(Role::Member < Role::Manager);
        assert!(Role::Manager < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn test_convenience_sets() {
        assert_eq!(
            RoleSet::admin_only(),
            RoleSet::from([Role::Admin, Role::Owner])
        );
        assert_eq!(
            RoleSet::manager_only(),
            RoleSet::from([Role::Manager, Role::Admin, Role::Owner])
        );
        assert_eq!(
            RoleSet::member_only(),
            RoleSet::from([Role::Member, Role::Manager, Role::Admin, Role::Owner])
        );
    }

    #[test]
    fn test_role_set_membership_is_exact() {
        // A hand-written list that skips manager must not admit manager
        let allowed = RoleSet::from([Role::Member, Role::Owner]);
        assert!(is_in_role_set(Role::Member, &allowed));
        assert!(is_in_role_set(Role::Owner, &allowed));
        assert!(!is_in_role_set(Role::Manager, &allowed));
        assert!(!is_in_role_set(Role::Admin, &allowed));
        assert!(!is_in_role_set(Role::Viewer, &RoleSet::empty()));
    }

    #[test]
    fn test_minimum_of_expanded_set() {
        assert_eq!(RoleSet::manager_only().minimum(), Some(Role::Manager));
        assert_eq!(RoleSet::empty().minimum(), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(RoleSet::admin_only().to_string(), "{admin, owner}");
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
    }

    #[test]
    fn test_owner_counts_as_admin() {
        assert!(Role::Owner.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Manager.is_admin());
    }
}
