//! User-initiated sign-out
//!
//! A confirmation dialog with a busy sub-state. The idle-timeout path never
//! goes through here.

use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use trellis_core::SignOutService;

/// One actionable button of a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogControl {
    pub label: &'static str,
    pub disabled: bool,
}

/// Stateless confirmation dialog props
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOutConfirmDialog {
    pub open: bool,
    pub is_loading: bool,
}

impl SignOutConfirmDialog {
    pub const CANCEL_LABEL: &'static str = "Cancel";
    pub const CONFIRM_LABEL: &'static str = "Sign Out";
    pub const CONFIRM_BUSY_LABEL: &'static str = "Signing out...";

    pub fn new(open: bool, is_loading: bool) -> Self {
        Self { open, is_loading }
    }

    pub fn cancel_control(&self) -> DialogControl {
        DialogControl {
            label: Self::CANCEL_LABEL,
            disabled: self.is_loading,
        }
    }

    pub fn confirm_control(&self) -> DialogControl {
        DialogControl {
            label: if self.is_loading {
                Self::CONFIRM_BUSY_LABEL
            } else {
                Self::CONFIRM_LABEL
            },
            disabled: self.is_loading,
        }
    }

    /// Apply an open/close request; refused while signing out
    pub fn on_open_change(&mut self, open: bool) -> bool {
        if self.is_loading {
            return false;
        }
        self.open = open;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Closed,
    Confirming,
    SigningOut,
}

/// Result of confirming the dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// Remote sign-out succeeded and local state was cleared
    SignedOut,
    /// Remote sign-out failed; the dialog stays open for another try
    Failed { message: String },
    /// A sign-out from an earlier confirm is still running
    AlreadyInProgress,
    /// Confirm without an open dialog
    NotRequested,
}

/// Shared state of the sign-out confirmation
#[derive(Debug)]
pub struct SignOutFlow {
    state: Mutex<FlowState>,
}

impl Default for SignOutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SignOutFlow {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FlowState::Closed),
        }
    }

    /// Current dialog props
    pub fn dialog(&self) -> SignOutConfirmDialog {
        props(*self.lock())
    }

    /// Open the dialog
    pub fn request(&self) -> bool {
        self.on_open_change(true)
    }

    /// Close the dialog without signing out
    pub fn cancel(&self) -> bool {
        self.on_open_change(false)
    }

    /// Open/close request coming from the dialog itself
    pub fn on_open_change(&self, open: bool) -> bool {
        let mut state = self.lock();
        let mut dialog = props(*state);
        if !dialog.on_open_change(open) {
            return false;
        }
        *state = if dialog.open {
            FlowState::Confirming
        } else {
            FlowState::Closed
        };
        true
    }

    /// Run the sign-out; a second confirm while one is running is a no-op
    pub async fn confirm(&self, service: &dyn SignOutService) -> SignOutOutcome {
        {
            let mut state = self.lock();
            match *state {
                FlowState::SigningOut => return SignOutOutcome::AlreadyInProgress,
                FlowState::Closed => return SignOutOutcome::NotRequested,
                FlowState::Confirming => *state = FlowState::SigningOut,
            }
        }

        let mut in_flight = InFlight {
            flow: self,
            next: FlowState::Confirming,
        };
        let outcome = match service.sign_out().await {
            Ok(()) => {
                service.clear_local_session();
                info!("User signed out");
                in_flight.next = FlowState::Closed;
                SignOutOutcome::SignedOut
            }
            Err(error) => {
                warn!(
                    error = %error,
                    recoverable = error.is_recoverable(),
                    "Sign-out failed"
                );
                SignOutOutcome::Failed {
                    message: error.to_string(),
                }
            }
        };
        drop(in_flight);
        outcome
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn props(state: FlowState) -> SignOutConfirmDialog {
    match state {
        FlowState::Closed => SignOutConfirmDialog::new(false, false),
        FlowState::Confirming => SignOutConfirmDialog::new(true, false),
        FlowState::SigningOut => SignOutConfirmDialog::new(true, true),
    }
}

/// Leaves the signing-out state on completion, or back to confirming if the
/// sign-out future is dropped midway
struct InFlight<'a> {
    flow: &'a SignOutFlow,
    next: FlowState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.flow.lock() = self.next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::CountingSignOut;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;
    use trellis_core::TrellisResult;

    #[test]
    fn test_loading_disables_both_controls() {
        let dialog = SignOutConfirmDialog::new(true, true);
        assert!(dialog.cancel_control().disabled);
        assert!(dialog.confirm_control().disabled);
        assert_eq!(dialog.confirm_control().label, "Signing out...");

        let idle = SignOutConfirmDialog::new(true, false);
        assert!(!idle.cancel_control().disabled);
        assert_eq!(idle.confirm_control().label, "Sign Out");
    }

    #[test]
    fn test_open_change_ignored_while_loading() {
        let mut dialog = SignOutConfirmDialog::new(true, true);
        assert!(!dialog.on_open_change(false));
        assert!(dialog.open);

        let mut dialog = SignOutConfirmDialog::new(true, false);
        assert!(dialog.on_open_change(false));
        assert!(!dialog.open);
    }

    #[tokio::test]
    async fn test_confirm_signs_out_and_closes() {
        let flow = SignOutFlow::new();
        let service = CountingSignOut::default();

        assert_eq!(flow.confirm(&service).await, SignOutOutcome::NotRequested);
        assert!(flow.request());
        assert!(flow.dialog().open);

        assert_eq!(flow.confirm(&service).await, SignOutOutcome::SignedOut);
        assert!(!flow.dialog().open);
        assert_eq!(service.attempts(), 1);
        assert_eq!(service.cleared(), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_dialog_open() {
        let flow = SignOutFlow::new();
        let service = CountingSignOut::failing();
        flow.request();

        assert!(matches!(
            flow.confirm(&service).await,
            SignOutOutcome::Failed { .. }
        ));
        let dialog = flow.dialog();
        assert!(dialog.open);
        assert!(!dialog.is_loading);
        assert_eq!(service.cleared(), 0);
    }

    /// Blocks inside `sign_out` until released
    #[derive(Default)]
    struct GatedSignOut {
        entered: Notify,
        release: Notify,
        inner: CountingSignOut,
    }

    #[async_trait]
    impl SignOutService for GatedSignOut {
        async fn sign_out(&self) -> TrellisResult<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.sign_out().await
        }

        fn clear_local_session(&self) {
            self.inner.clear_local_session();
        }
    }

    #[tokio::test]
    async fn test_double_submit_is_prevented() {
        let flow = Arc::new(SignOutFlow::new());
        let service = Arc::new(GatedSignOut::default());
        flow.request();

        let first = {
            let flow = flow.clone();
            let service = service.clone();
            tokio::spawn(async move { flow.confirm(service.as_ref()).await })
        };
        service.entered.notified().await;

        let dialog = flow.dialog();
        assert!(dialog.is_loading);
        assert!(dialog.confirm_control().disabled);
        assert!(!flow.cancel());
        assert_eq!(
            flow.confirm(service.as_ref()).await,
            SignOutOutcome::AlreadyInProgress
        );

        service.release.notify_one();
        assert_eq!(first.await.unwrap(), SignOutOutcome::SignedOut);
        assert_eq!(service.inner.attempts(), 1);
        assert!(!flow.dialog().open);
    }
}
