//! Core trait definitions
//!
//! Collaborators that the access layer consumes but does not implement:
//! routing and the remote sign-out call.

use crate::error::TrellisResult;
use crate::types::{Location, NavigateOptions};
use async_trait::async_trait;

/// Navigation surface of the host application
pub trait Navigator: Send + Sync {
    /// Navigate to an in-app path
    fn navigate(&self, path: &str, options: NavigateOptions);

    /// Current location
    fn location(&self) -> Location;
}

/// Terminates the authenticated session with the identity backend
///
/// Both the user-initiated sign-out and the idle-timeout forced sign-out go
/// through this trait.
#[async_trait]
pub trait SignOutService: Send + Sync {
    /// Revoke the session remotely
    async fn sign_out(&self) -> TrellisResult<()>;

    /// Drop any locally held credentials without contacting the backend
    fn clear_local_session(&self);
}
