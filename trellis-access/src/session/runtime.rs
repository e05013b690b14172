//! Session timeout runtime
//!
//! A tokio task owns the controller and is the only timer owner. Activity,
//! extend and sign-out requests arrive as commands; state leaves through a
//! `watch` channel. Commands are always applied before a due timer tick, so
//! activity that races an expiry keeps the session alive.

use super::controller::SessionTimeoutController;
use super::types::{SessionSnapshot, SessionTimeoutConfig, SessionTransition};
use crate::{AccessError, AccessResult};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use trellis_core::{retry_async, RetryConfig, SignOutService};

/// Pause before the single retry of a failed forced sign-out
const FORCED_SIGN_OUT_RETRY_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Activity,
    Extend,
    SignOutNow,
}

/// Starts idle-timeout tasks with a shared configuration and sign-out path
#[derive(Clone)]
pub struct SessionTimeoutRuntime {
    config: SessionTimeoutConfig,
    sign_out: Arc<dyn SignOutService>,
}

impl SessionTimeoutRuntime {
    pub fn new(config: SessionTimeoutConfig, sign_out: Arc<dyn SignOutService>) -> Self {
        Self { config, sign_out }
    }

    /// Start a session immediately with the given collaborators
    pub fn spawn(
        config: SessionTimeoutConfig,
        sign_out: Arc<dyn SignOutService>,
    ) -> SessionTimeoutHandle {
        Self::new(config, sign_out).start()
    }

    pub fn config(&self) -> &SessionTimeoutConfig {
        &self.config
    }

    /// Start tracking a freshly authenticated session
    pub fn start(&self) -> SessionTimeoutHandle {
        let now = Instant::now();
        let controller = SessionTimeoutController::new(self.config, now);
        let session_id = controller.session_id().to_string();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot(now));

        info!(
            session_id = %session_id,
            idle_timeout_secs = self.config.idle_timeout.as_secs(),
            warning_lead_secs = self.config.warning_lead.as_secs(),
            "Session timeout started"
        );

        let task = tokio::spawn(run(
            controller,
            command_rx,
            snapshot_tx,
            Arc::clone(&self.sign_out),
        ));

        SessionTimeoutHandle {
            session_id,
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
        }
    }
}

impl std::fmt::Debug for SessionTimeoutRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTimeoutRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Owner-side handle of one running session timeout.
///
/// This is the single writer of the idle clock. Dropping it cancels the
/// task; no sign-out fires afterwards.
#[derive(Debug)]
pub struct SessionTimeoutHandle {
    session_id: String,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SessionTimeoutHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Report tracked user interaction
    pub fn record_activity(&self) -> AccessResult<()> {
        self.send(Command::Activity)
    }

    /// "Stay signed in" from the warning dialog
    pub fn extend(&self) -> AccessResult<()> {
        self.send(Command::Extend)
    }

    /// "Sign out now" from the warning dialog
    pub fn sign_out_now(&self) -> AccessResult<()> {
        self.send(Command::SignOutNow)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Whether the task has stopped (expired, or shut down)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timers without signing out
    pub fn shutdown(&self) {
        if !self.task.is_finished() {
            debug!(session_id = %self.session_id, "Session timeout shut down");
        }
        self.task.abort();
    }

    fn send(&self, command: Command) -> AccessResult<()> {
        self.commands.send(command).map_err(|_| {
            AccessError::session(format!("Session {} has already ended", self.session_id))
        })
    }
}

impl Drop for SessionTimeoutHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut controller: SessionTimeoutController,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    sign_out: Arc<dyn SignOutService>,
) {
    let session_id = controller.session_id().to_string();

    while let Some(deadline) = controller.next_deadline(Instant::now()) {
        let mut transitions = Vec::new();

        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(command) => transitions.extend(apply(&mut controller, command)),
                None => {
                    debug!(session_id = %session_id, "Session handle closed");
                    return;
                }
            },
            _ = sleep_until(deadline) => {}
        }

        // Queued activity is applied before the tick is evaluated
        while let Ok(command) = commands.try_recv() {
            transitions.extend(apply(&mut controller, command));
        }

        let now = Instant::now();
        transitions.extend(controller.tick(now));
        snapshots.send_replace(controller.snapshot(now));

        let mut expired = false;
        for transition in transitions {
            match transition {
                SessionTransition::WarningStarted { remaining } => info!(
                    session_id = %session_id,
                    remaining_secs = remaining.as_secs(),
                    "Session idle warning shown"
                ),
                SessionTransition::Extended => {
                    info!(session_id = %session_id, "Session extended")
                }
                SessionTransition::Expired { reason } => {
                    info!(session_id = %session_id, reason = ?reason, "Session expired");
                    expired = true;
                }
            }
        }

        if expired {
            force_sign_out(&session_id, sign_out).await;
            return;
        }
    }
}

fn apply(controller: &mut SessionTimeoutController, command: Command) -> Option<SessionTransition> {
    let now = Instant::now();
    match command {
        Command::Activity => controller.record_activity(now),
        Command::Extend => controller.extend(now),
        Command::SignOutNow => controller.sign_out_now(),
    }
}

/// Remote sign-out with one retry, then the local clear regardless
async fn force_sign_out(session_id: &str, service: Arc<dyn SignOutService>) {
    let remote = Arc::clone(&service);
    let result = retry_async(
        move || {
            let service = Arc::clone(&remote);
            async move { service.sign_out().await }.boxed()
        },
        RetryConfig::retry_once(FORCED_SIGN_OUT_RETRY_DELAY_MS),
        "forced_sign_out",
    )
    .await;

    if let Err(error) = result {
        error.log();
        warn!(
            session_id = %session_id,
            "Remote sign-out failed, clearing local session only"
        );
    }

    service.clear_local_session();
    info!(session_id = %session_id, "Forced sign-out complete");
}
