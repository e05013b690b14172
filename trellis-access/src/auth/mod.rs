//! Authentication and Authorization Module
//!
//! - Role hierarchy and the two role-check semantics
//! - Permission keys and role-derived defaults
//! - The identity store contract consumed by every guard

pub mod context;
pub mod identity;
pub mod permissions;
pub mod role;

pub use context::{AccessContext, AccessContextBuilder};
pub use identity::{IdentityStore, InMemoryIdentityStore, UserIdentity};
pub use permissions::{OverrideEffect, Permission, PermissionOverride, ResourceId};
pub use role::{is_in_role_set, meets_minimum_role, Role, RoleSet};
