//! Idle-session state machine
//!
//! Pure and clock-free: every method takes `now`, so the runtime and the
//! tests drive it with the same instants.

use super::types::{
    ExpiryReason, SessionPhase, SessionSnapshot, SessionTimeoutConfig, SessionTransition,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct SessionTimeoutController {
    session_id: String,
    config: SessionTimeoutConfig,
    phase: SessionPhase,
    last_activity: Instant,
    last_activity_at: DateTime<Utc>,
    sign_out_emitted: bool,
}

impl SessionTimeoutController {
    pub fn new(config: SessionTimeoutConfig, now: Instant) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            config,
            phase: SessionPhase::Active,
            last_activity: now,
            last_activity_at: Utc::now(),
            sign_out_emitted: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &SessionTimeoutConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    fn expires_at(&self) -> Instant {
        self.last_activity + self.config.idle_timeout
    }

    fn warns_at(&self) -> Instant {
        self.last_activity + self.config.warning_threshold()
    }

    fn reset_clock(&mut self, now: Instant) {
        self.last_activity = now;
        self.last_activity_at = Utc::now();
    }

    fn expire(&mut self, reason: ExpiryReason) -> Option<SessionTransition> {
        self.phase = SessionPhase::Expired;
        if self.sign_out_emitted {
            return None;
        }
        self.sign_out_emitted = true;
        Some(SessionTransition::Expired { reason })
    }

    /// Evaluate elapsed idle time
    pub fn tick(&mut self, now: Instant) -> Option<SessionTransition> {
        match self.phase {
            SessionPhase::Active if now >= self.expires_at() => {
                // Late wakeup, the whole warning window already passed
                self.expire(ExpiryReason::IdleTimeout)
            }
            SessionPhase::Active if now >= self.warns_at() => {
                self.phase = SessionPhase::Warning;
                Some(SessionTransition::WarningStarted {
                    remaining: self.remaining(now),
                })
            }
            SessionPhase::Warning if now >= self.expires_at() => {
                self.expire(ExpiryReason::IdleTimeout)
            }
            _ => None,
        }
    }

    /// Tracked user interaction
    pub fn record_activity(&mut self, now: Instant) -> Option<SessionTransition> {
        match self.phase {
            SessionPhase::Active => {
                self.reset_clock(now);
                None
            }
            SessionPhase::Warning => {
                self.reset_clock(now);
                self.phase = SessionPhase::Active;
                Some(SessionTransition::Extended)
            }
            SessionPhase::Expired => None,
        }
    }

    /// "Stay signed in"; repeated calls only reset the clock again
    pub fn extend(&mut self, now: Instant) -> Option<SessionTransition> {
        self.record_activity(now)
    }

    /// "Sign out now" from the warning; ignored in any other phase
    pub fn sign_out_now(&mut self) -> Option<SessionTransition> {
        match self.phase {
            SessionPhase::Warning => self.expire(ExpiryReason::SignOutNow),
            SessionPhase::Active | SessionPhase::Expired => None,
        }
    }

    /// Time left before the forced sign-out
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.phase {
            SessionPhase::Expired => Duration::ZERO,
            _ => self.expires_at().saturating_duration_since(now),
        }
    }

    /// When the controller next needs a tick; `None` once expired
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        match self.phase {
            SessionPhase::Active => Some(self.warns_at()),
            SessionPhase::Warning => {
                Some(self.expires_at().min(now + self.config.countdown_interval))
            }
            SessionPhase::Expired => None,
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.phase,
            warning_active: self.phase == SessionPhase::Warning,
            expired: self.phase == SessionPhase::Expired,
            remaining: self.remaining(now),
            last_activity_at: self.last_activity_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn controller() -> (SessionTimeoutController, Instant) {
        let start = Instant::now();
        let config = SessionTimeoutConfig::from_minutes(30, 5).unwrap();
        (SessionTimeoutController::new(config, start), start)
    }

    #[test]
    fn test_warning_at_exactly_threshold() {
        let (mut controller, start) = controller();

        assert_eq!(controller.tick(start + 25 * MINUTE - Duration::from_millis(1)), None);
        assert_eq!(controller.phase(), SessionPhase::Active);

        assert_eq!(
            controller.tick(start + 25 * MINUTE),
            Some(SessionTransition::WarningStarted {
                remaining: 5 * MINUTE
            })
        );
        assert!(controller.snapshot(start + 25 * MINUTE).warning_active);
    }

    #[test]
    fn test_expiry_at_idle_timeout() {
        let (mut controller, start) = controller();
        controller.tick(start + 25 * MINUTE);

        assert_eq!(controller.tick(start + 30 * MINUTE - Duration::from_secs(1)), None);
        assert_eq!(
            controller.tick(start + 30 * MINUTE),
            Some(SessionTransition::Expired {
                reason: ExpiryReason::IdleTimeout
            })
        );

        let snapshot = controller.snapshot(start + 30 * MINUTE);
        assert!(snapshot.expired);
        assert!(!snapshot.warning_active);
        assert_eq!(snapshot.remaining, Duration::ZERO);
    }

    #[test]
    fn test_expiry_emitted_once() {
        let (mut controller, start) = controller();
        controller.tick(start + 25 * MINUTE);
        assert!(controller.tick(start + 30 * MINUTE).is_some());
        assert_eq!(controller.tick(start + 31 * MINUTE), None);
        assert_eq!(controller.sign_out_now(), None);
        assert_eq!(controller.record_activity(start + 32 * MINUTE), None);
        assert_eq!(controller.phase(), SessionPhase::Expired);
    }

    #[test]
    fn test_late_tick_skips_warning() {
        let (mut controller, start) = controller();
        assert_eq!(
            controller.tick(start + 45 * MINUTE),
            Some(SessionTransition::Expired {
                reason: ExpiryReason::IdleTimeout
            })
        );
    }

    #[test]
    fn test_extend_resets_full_window() {
        let (mut controller, start) = controller();
        controller.tick(start + 25 * MINUTE);

        let extended_at = start + 27 * MINUTE;
        assert_eq!(controller.extend(extended_at), Some(SessionTransition::Extended));
        assert_eq!(controller.phase(), SessionPhase::Active);
        assert_eq!(controller.idle_for(extended_at), Duration::ZERO);

        // Next warning only after another 25 minutes
        assert_eq!(controller.tick(extended_at + 25 * MINUTE - Duration::from_secs(1)), None);
        assert!(matches!(
            controller.tick(extended_at + 25 * MINUTE),
            Some(SessionTransition::WarningStarted { .. })
        ));
    }

    #[test]
    fn test_extend_is_idempotent() {
        let (mut controller, start) = controller();
        controller.tick(start + 25 * MINUTE);

        let at = start + 26 * MINUTE;
        assert_eq!(controller.extend(at), Some(SessionTransition::Extended));
        assert_eq!(controller.extend(at), None);
        assert_eq!(controller.phase(), SessionPhase::Active);
        assert_eq!(controller.next_deadline(at), Some(at + 25 * MINUTE));
    }

    #[test]
    fn test_activity_during_warning_returns_to_active() {
        let (mut controller, start) = controller();
        controller.tick(start + 25 * MINUTE);
        assert_eq!(
            controller.record_activity(start + 28 * MINUTE),
            Some(SessionTransition::Extended)
        );
        assert!(!controller.snapshot(start + 28 * MINUTE).warning_active);
    }

    #[test]
    fn test_sign_out_now_only_from_warning() {
        let (mut controller, start) = controller();
        assert_eq!(controller.sign_out_now(), None);
        assert_eq!(controller.phase(), SessionPhase::Active);

        controller.tick(start + 25 * MINUTE);
        assert_eq!(
            controller.sign_out_now(),
            Some(SessionTransition::Expired {
                reason: ExpiryReason::SignOutNow
            })
        );
        assert_eq!(controller.sign_out_now(), None);
    }

    #[test]
    fn test_deadlines_follow_phase() {
        let (mut controller, start) = controller();
        assert_eq!(controller.next_deadline(start), Some(start + 25 * MINUTE));

        let warning_at = start + 25 * MINUTE;
        controller.tick(warning_at);
        assert_eq!(
            controller.next_deadline(warning_at),
            Some(warning_at + Duration::from_secs(1))
        );

        let almost = start + 30 * MINUTE - Duration::from_millis(200);
        assert_eq!(controller.next_deadline(almost), Some(start + 30 * MINUTE));

        controller.tick(start + 30 * MINUTE);
        assert_eq!(controller.next_deadline(start + 30 * MINUTE), None);
    }
}
