//! Dialog view-models for the session lifecycle

pub mod sign_out;
pub mod timeout_warning;

pub use sign_out::{DialogControl, SignOutConfirmDialog, SignOutFlow, SignOutOutcome};
pub use timeout_warning::SessionTimeoutWarning;
