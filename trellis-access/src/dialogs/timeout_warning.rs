//! Idle warning dialog view-model

use crate::session::types::ceil_secs;
use crate::session::{SessionSnapshot, SessionTimeoutHandle};
use crate::AccessResult;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeoutWarning {
    pub open: bool,
    pub remaining: Duration,
}

impl SessionTimeoutWarning {
    pub const EXTEND_LABEL: &'static str = "Stay Signed In";
    pub const SIGN_OUT_LABEL: &'static str = "Sign Out Now";

    /// Open exactly while the session is in its warning phase
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        if snapshot.warning_active {
            Self {
                open: true,
                remaining: snapshot.remaining,
            }
        } else {
            Self {
                open: false,
                remaining: Duration::ZERO,
            }
        }
    }

    /// Countdown as `m:ss`, rounded up to the next whole second
    pub fn remaining_label(&self) -> String {
        let secs = ceil_secs(self.remaining);
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn extend(&self, handle: &SessionTimeoutHandle) -> AccessResult<()> {
        handle.extend()
    }

    pub fn sign_out(&self, handle: &SessionTimeoutHandle) -> AccessResult<()> {
        handle.sign_out_now()
    }
}
