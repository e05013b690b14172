//! Idle-session lifecycle
//!
//! `Active -> Warning -> Expired`, with extend and activity returning a
//! warning session to `Active`. The pure state machine lives in
//! [`controller`]; [`runtime`] drives it on tokio timers and performs the
//! forced sign-out.

pub mod controller;
pub mod runtime;
pub mod types;

pub use controller::SessionTimeoutController;
pub use runtime::{SessionTimeoutHandle, SessionTimeoutRuntime};
pub use types::{
    ExpiryReason, SessionPhase, SessionSnapshot, SessionTimeoutConfig, SessionTransition,
};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trellis_core::{SignOutService, TrellisResult};

    /// Sign-out collaborator that counts calls
    #[derive(Debug, Default)]
    pub struct CountingSignOut {
        attempts: AtomicUsize,
        cleared: AtomicUsize,
        fail: bool,
    }

    impl CountingSignOut {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub fn cleared(&self) -> usize {
            self.cleared.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SignOutService for CountingSignOut {
        async fn sign_out(&self) -> TrellisResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(trellis_core::sign_out_error!(
                    "identity backend unreachable",
                    "test"
                ));
            }
            Ok(())
        }

        fn clear_local_session(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }
}
