//! Route and capability guards
//!
//! Guards never block and never return an error decision: missing identity
//! or requirement inputs deny.

pub mod auth_redirect;
pub mod capability;
pub mod decision;
pub mod require_auth;
pub mod route;

pub use auth_redirect::{post_auth_redirect_target, redirect_authenticated_away};
pub use capability::CapabilityGuard;
pub use decision::{CapabilityDecision, GuardDecision};
pub use require_auth::{RequireAuth, RequireAuthOptions, RequireAuthStatus};
pub use route::{RouteGuard, RouteRequirement};
