//! Guard decisions
//!
//! Guards compute a tagged decision once per evaluation and leave the
//! consumption (render, redirect, hide) to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use trellis_core::{Location, RouteSettings};

/// Outcome of evaluating a route guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Identity still resolving; render a placeholder
    Loading,
    /// Nobody signed in; `return_to` is the percent-encoded path and query
    RedirectToAuth { return_to: String },
    /// Signed in but missing the required role or permission
    RedirectToUnauthorized,
    /// Render the protected view
    Allow,
}

impl GuardDecision {
    /// Redirect to the auth route, remembering where the user was going
    pub fn redirect_to_auth(location: &Location) -> Self {
        Self::RedirectToAuth {
            return_to: urlencoding::encode(&location.path_and_query()).into_owned(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Navigation target for redirecting decisions
    pub fn redirect_target(&self, routes: &RouteSettings) -> Option<String> {
        match self {
            Self::RedirectToAuth { return_to } => {
                Some(format!("{}?returnTo={}", routes.auth_route, return_to))
            }
            Self::RedirectToUnauthorized => Some(routes.unauthorized_route.clone()),
            Self::Loading | Self::Allow => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::RedirectToAuth { .. } => "redirect_to_auth",
            Self::RedirectToUnauthorized => "redirect_to_unauthorized",
            Self::Allow => "allow",
        }
    }
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating a capability guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityDecision {
    Allow,
    Deny,
}

impl CapabilityDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

impl From<bool> for CapabilityDecision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_to_encodes_path_and_query() {
        let decision = GuardDecision::redirect_to_auth(&Location::parse("/projects?x=1"));
        assert_eq!(
            decision,
            GuardDecision::RedirectToAuth {
                return_to: "%2Fprojects%3Fx%3D1".to_string()
            }
        );
    }

    #[test]
    fn test_redirect_targets() {
        let routes = RouteSettings::default();
        let decision = GuardDecision::redirect_to_auth(&Location::parse("/projects?x=1"));

        assert_eq!(
            decision.redirect_target(&routes).as_deref(),
            Some("/auth?returnTo=%2Fprojects%3Fx%3D1")
        );
        assert_eq!(
            GuardDecision::RedirectToUnauthorized
                .redirect_target(&routes)
                .as_deref(),
            Some("/unauthorized")
        );
        assert_eq!(GuardDecision::Allow.redirect_target(&routes), None);
        assert_eq!(GuardDecision::Loading.redirect_target(&routes), None);
    }

    #[test]
    fn test_round_trips_through_auth_location() {
        let routes = RouteSettings::default();
        let decision = GuardDecision::redirect_to_auth(&Location::parse("/tasks?filter=a&b=c d"));
        let target = decision.redirect_target(&routes).unwrap();

        assert_eq!(
            Location::parse(&target).query_param("returnTo").as_deref(),
            Some("/tasks?filter=a&b=c d")
        );
    }
}
