//! Session Types
//!
//! Configuration and published state of the idle-session timeout.

use crate::{AccessError, AccessResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use trellis_core::SessionSettings;

/// Idle-timeout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeoutConfig {
    /// Inactivity after which the session is forcibly ended
    pub idle_timeout: Duration,
    /// How long before `idle_timeout` the warning opens
    pub warning_lead: Duration,
    /// Refresh cadence of the warning countdown
    pub countdown_interval: Duration,
}

impl Default for SessionTimeoutConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            warning_lead: Duration::from_secs(5 * 60),
            countdown_interval: Duration::from_secs(1),
        }
    }
}

impl SessionTimeoutConfig {
    pub const MAX_IDLE_TIMEOUT: Duration =
        Duration::from_secs(SessionSettings::MAX_IDLE_TIMEOUT_MINUTES * 60);

    /// Build from the caller-supplied `{ idleTimeout, warningTime }` minutes
    pub fn from_minutes(idle_timeout_minutes: u64, warning_minutes: u64) -> AccessResult<Self> {
        let config = Self {
            idle_timeout: minutes(idle_timeout_minutes)?,
            warning_lead: minutes(warning_minutes)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_settings(settings: &SessionSettings) -> AccessResult<Self> {
        settings.validate()?;
        Ok(Self {
            idle_timeout: minutes(settings.idle_timeout_minutes)?,
            warning_lead: minutes(settings.warning_minutes)?,
            countdown_interval: Duration::from_secs(settings.countdown_interval_secs),
        })
    }

    pub fn validate(&self) -> AccessResult<()> {
        if self.warning_lead.is_zero() || self.warning_lead >= self.idle_timeout {
            return Err(AccessError::config(format!(
                "Warning lead ({:?}) must be positive and below the idle timeout ({:?})",
                self.warning_lead, self.idle_timeout
            )));
        }
        if self.idle_timeout > Self::MAX_IDLE_TIMEOUT {
            return Err(AccessError::config(format!(
                "Idle timeout ({:?}) must not exceed {:?}",
                self.idle_timeout,
                Self::MAX_IDLE_TIMEOUT
            )));
        }
        if self.countdown_interval.is_zero() {
            return Err(AccessError::config("Countdown interval must be greater than 0"));
        }
        Ok(())
    }

    /// Idle time at which the warning opens
    pub fn warning_threshold(&self) -> Duration {
        self.idle_timeout.saturating_sub(self.warning_lead)
    }
}

fn minutes(value: u64) -> AccessResult<Duration> {
    value
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| AccessError::config(format!("{} minutes is out of range", value)))
}

/// Whole seconds in `duration`, rounded up
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Lifecycle phase of one authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Active,
    Warning,
    /// Terminal; a new session starts only after re-authentication
    Expired,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Warning => write!(f, "warning"),
            SessionPhase::Expired => write!(f, "expired"),
        }
    }
}

/// Why a session expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// The warning countdown ran out
    IdleTimeout,
    /// The user chose "sign out now" from the warning
    SignOutNow,
}

/// Observable state change produced by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Active to Warning; `remaining` is the countdown start
    WarningStarted { remaining: Duration },
    /// Warning to Active through extend or activity
    Extended,
    /// Emitted at most once per controller
    Expired { reason: ExpiryReason },
}

/// Published session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: SessionPhase,
    pub warning_active: bool,
    pub expired: bool,
    /// Time left before the forced sign-out; zero once expired
    pub remaining: Duration,
    pub last_activity_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Whole seconds left, rounded up so the countdown never shows 0:00 early
    pub fn remaining_secs(&self) -> u64 {
        ceil_secs(self.remaining)
    }
}
