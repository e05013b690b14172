//! Trellis Access - Authorization decisions and session lifecycle
//!
//! This crate holds the parts of Trellis with real state-machine semantics:
//!
//! - Role hierarchy evaluation (rank-based and allow-list based)
//! - Route guards with redirect-preserving `returnTo` handling
//! - Capability guards for hiding fragments inside a rendered page
//! - The idle-session timeout controller and its tokio runtime
//! - View-models for the timeout warning and sign-out confirmation dialogs
//!
//! ## Architecture
//!
//! - **Core** (trellis-core): errors, config, logging, collaborator traits
//! - **Access** (this crate): pure decision logic plus the session runtime
//! - **Presentation** (trellis-web): HTTP routes that consume the decisions

pub mod auth;
pub mod dialogs;
pub mod guards;
pub mod session;

pub use auth::{
    is_in_role_set, meets_minimum_role, AccessContext, AccessContextBuilder, IdentityStore,
    InMemoryIdentityStore, OverrideEffect, Permission, PermissionOverride, ResourceId, Role,
    RoleSet, UserIdentity,
};
pub use dialogs::{
    DialogControl, SessionTimeoutWarning, SignOutConfirmDialog, SignOutFlow, SignOutOutcome,
};
pub use guards::{
    post_auth_redirect_target, redirect_authenticated_away, CapabilityDecision, CapabilityGuard,
    GuardDecision, RequireAuth, RequireAuthOptions, RequireAuthStatus, RouteGuard,
    RouteRequirement,
};
pub use session::{
    ExpiryReason, SessionPhase, SessionSnapshot, SessionTimeoutConfig, SessionTimeoutController,
    SessionTimeoutHandle, SessionTimeoutRuntime, SessionTransition,
};

use trellis_core::{RouteSettings, SessionSettings, TrellisConfig};

/// Access-layer error type
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Core error: {0}")]
    Core(#[from] trellis_core::TrellisError),

    #[error("Permission error: {message}")]
    Permission { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Create a permission error
    pub fn permission<S: Into<String>>(message: S) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Access-layer configuration
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    /// Redirect targets used by the guards
    pub routes: RouteSettings,
    /// Idle-timeout parameters
    pub session: SessionTimeoutConfig,
}

impl AccessConfig {
    /// Build from the on-disk configuration model
    pub fn from_settings(routes: RouteSettings, session: &SessionSettings) -> AccessResult<Self> {
        routes.validate()?;
        Ok(Self {
            routes,
            session: SessionTimeoutConfig::from_settings(session)?,
        })
    }
}

impl TryFrom<&TrellisConfig> for AccessConfig {
    type Error = AccessError;

    fn try_from(config: &TrellisConfig) -> AccessResult<Self> {
        Self::from_settings(config.routes.clone(), &config.session)
    }
}
