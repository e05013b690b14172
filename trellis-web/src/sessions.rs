//! Per-user idle-session registry
//!
//! Every signed-in user gets one running [`SessionTimeoutHandle`]. The
//! registry is also the sign-out backend of the web server: revoking a user
//! puts them on the signed-out list until they sign in again.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, info};
use trellis_access::{
    AccessError, AccessResult, SessionSnapshot, SessionTimeoutConfig, SessionTimeoutHandle,
    SessionTimeoutRuntime, SignOutFlow,
};
use trellis_core::{SignOutService, TrellisResult};

struct SessionEntry {
    generation: u64,
    handle: SessionTimeoutHandle,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<String, SessionEntry>,
    signed_out: HashSet<String>,
    flows: HashMap<String, Arc<SignOutFlow>>,
    next_generation: u64,
}

/// Running idle-session timeouts keyed by user id
#[derive(Clone)]
pub struct SessionRegistry {
    config: SessionTimeoutConfig,
    inner: Arc<Mutex<RegistryInner>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(config: SessionTimeoutConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(RegistryInner::default())),
        }
    }

    pub fn config(&self) -> &SessionTimeoutConfig {
        &self.config
    }

    /// Start a fresh session, replacing any previous one for the user
    pub fn sign_in(&self, user_id: &str) -> SessionSnapshot {
        let mut inner = self.lock();
        inner.signed_out.remove(user_id);
        inner.flows.remove(user_id);
        let previous = inner.sessions.remove(user_id);
        let snapshot = self.start_locked(&mut inner, user_id);
        drop(inner);

        if let Some(previous) = previous {
            debug!(
                user_id = %user_id,
                session_id = %previous.handle.session_id(),
                "Replacing session"
            );
        }
        info!(user_id = %user_id, session_id = %snapshot.session_id, "User signed in");
        snapshot
    }

    /// Current session of a user, starting one on first authenticated use.
    ///
    /// Fails for users who have been signed out.
    pub fn ensure(&self, user_id: &str) -> AccessResult<SessionSnapshot> {
        let mut inner = self.lock();
        if inner.signed_out.contains(user_id) {
            return Err(AccessError::session(format!("User {} is signed out", user_id)));
        }
        if let Some(entry) = inner.sessions.get(user_id) {
            if !entry.handle.is_finished() {
                return Ok(entry.handle.snapshot());
            }
        }
        Ok(self.start_locked(&mut inner, user_id))
    }

    /// Run an operation against the user's live session handle
    pub fn with_session<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&SessionTimeoutHandle) -> AccessResult<T>,
    ) -> AccessResult<T> {
        let inner = self.lock();
        let entry = inner
            .sessions
            .get(user_id)
            .ok_or_else(|| AccessError::session(format!("No active session for {}", user_id)))?;
        f(&entry.handle)
    }

    pub fn snapshot(&self, user_id: &str) -> Option<SessionSnapshot> {
        self.lock()
            .sessions
            .get(user_id)
            .map(|entry| entry.handle.snapshot())
    }

    pub fn subscribe(&self, user_id: &str) -> Option<watch::Receiver<SessionSnapshot>> {
        self.lock()
            .sessions
            .get(user_id)
            .map(|entry| entry.handle.subscribe())
    }

    /// Sign-out confirmation state for the user, created on first use
    pub fn sign_out_flow(&self, user_id: &str) -> Arc<SignOutFlow> {
        let mut inner = self.lock();
        Arc::clone(inner.flows.entry(user_id.to_string()).or_default())
    }

    /// Sign-out collaborator bound to the user's current session
    pub fn sign_out_service(&self, user_id: &str) -> Arc<dyn SignOutService> {
        let generation = self
            .lock()
            .sessions
            .get(user_id)
            .map(|entry| entry.generation);
        Arc::new(RegistrySignOut {
            user_id: user_id.to_string(),
            generation,
            registry: Arc::downgrade(&self.inner),
        })
    }

    pub fn is_signed_out(&self, user_id: &str) -> bool {
        self.lock().signed_out.contains(user_id)
    }

    /// Number of sessions whose timeout task is still running
    pub fn active_sessions(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    fn start_locked(&self, inner: &mut RegistryInner, user_id: &str) -> SessionSnapshot {
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let sign_out = Arc::new(RegistrySignOut {
            user_id: user_id.to_string(),
            generation: Some(generation),
            registry: Arc::downgrade(&self.inner),
        });

        let handle = SessionTimeoutRuntime::spawn(self.config, sign_out);
        let snapshot = handle.snapshot();
        inner
            .sessions
            .insert(user_id.to_string(), SessionEntry { generation, handle });
        snapshot
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        lock_inner(&self.inner)
    }
}

fn lock_inner(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sign-out backend for one user session.
///
/// Holds the registry weakly so a session task never keeps it alive, and
/// only tears down the session generation it was created for.
struct RegistrySignOut {
    user_id: String,
    generation: Option<u64>,
    registry: Weak<Mutex<RegistryInner>>,
}

impl RegistrySignOut {
    /// Whether the session this service was bound to is still the user's
    fn is_current(&self, inner: &RegistryInner) -> bool {
        inner.sessions.get(&self.user_id).map(|entry| entry.generation) == self.generation
    }
}

#[async_trait]
impl SignOutService for RegistrySignOut {
    async fn sign_out(&self) -> TrellisResult<()> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| trellis_core::sign_out_error!("Session registry is gone", "web"))?;
        let mut inner = lock_inner(&registry);
        if self.is_current(&inner) {
            inner.signed_out.insert(self.user_id.clone());
            debug!(user_id = %self.user_id, "Session revoked");
        }
        Ok(())
    }

    fn clear_local_session(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = {
            let mut inner = lock_inner(&registry);
            if !self.is_current(&inner) {
                return;
            }
            inner.signed_out.insert(self.user_id.clone());
            inner.flows.remove(&self.user_id);
            inner.sessions.remove(&self.user_id)
        };
        // Dropped outside the lock; this cancels the timeout task
        drop(removed);
        debug!(user_id = %self.user_id, "Local session cleared");
    }
}
