// ============================
// crates/client-lib/src/auth/session.rs
// ============================
//! Current-session slot shared by the whole client.
//!
//! At most one [`Session`] is current per process. Every change is mirrored to
//! client storage under [`keys::SESSION`], so a restarted process can show the
//! previous identity immediately and correct it once the backend answers.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use nutriplan_common::Session;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backend::{AuthBackend, SessionCallback, Subscription};
use crate::error::ClientError;
use crate::storage::{keys, ClientStorage};

/// Where an authenticated user lands
pub const HOME_PATH: &str = "/home";
/// Where an anonymous user lands
pub const LOGIN_PATH: &str = "/login";

/// Snapshot published to subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    /// Set once the backend has reported the authoritative session
    pub resolved: bool,
}

/// Session store. Cheap to clone; all clones share one slot.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn ClientStorage>,
    state: watch::Sender<SessionState>,
    observation: Mutex<Option<Subscription>>,
    /// Bumped on every change of the current session
    generation: AtomicU64,
}

impl SessionStore {
    /// Create the store, optimistically restoring the persisted session
    pub fn new(backend: Arc<dyn AuthBackend>, storage: Arc<dyn ClientStorage>) -> Self {
        let persisted = match storage.get_json::<Session>(keys::SESSION) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not read persisted session");
                None
            },
        };
        if let Some(session) = &persisted {
            debug!(user = %session.id, "restored persisted session");
        }

        let (state, _) = watch::channel(SessionState {
            session: persisted,
            resolved: false,
        });

        Self {
            inner: Arc::new(Inner {
                backend,
                storage,
                state,
                observation: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.inner.backend
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Replace the current session, persist it, and notify subscribers
    pub fn set_current(&self, session: Option<Session>) {
        self.inner.set_current(session);
    }

    /// Receive the current state and every later change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Ask the backend for the authoritative session and keep listening if
    /// the backend pushes updates.
    ///
    /// A report is dropped when the session changed locally after the
    /// previous report (or after the restore started), so a slow answer never
    /// overwrites a newer login or logout.
    pub async fn restore_from_backend(&self) {
        let callback = self.report_callback();
        let subscription = self.inner.backend.observe_session(callback).await;
        *self.inner.observation.lock() = Some(subscription);
    }

    /// Callback handed to the backend. It holds the store weakly and remembers
    /// the generation of the last report it applied.
    fn report_callback(&self) -> SessionCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let seen = Arc::new(AtomicU64::new(self.inner.generation()));
        Arc::new(move |session| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let expected = seen.load(Ordering::SeqCst);
            match inner.set_current_if(expected, session) {
                Ok(generation) => seen.store(generation, Ordering::SeqCst),
                Err(current) => {
                    debug!("discarding backend session report older than a local change");
                    seen.store(current, Ordering::SeqCst);
                },
            }
            inner.mark_resolved();
        })
    }

    /// Wait until the backend has answered at least once
    pub async fn wait_resolved(&self) -> SessionState {
        let mut rx = self.subscribe();
        let resolved = match rx.wait_for(|state| state.resolved).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        resolved
    }

    /// Landing path once the session is known
    pub async fn redirect_target(&self) -> &'static str {
        if self.wait_resolved().await.session.is_some() {
            HOME_PATH
        } else {
            LOGIN_PATH
        }
    }

    /// Guard for operations that need a signed-in user
    pub fn require_session(&self) -> Result<Session, ClientError> {
        self.current().ok_or(ClientError::Unauthenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let session = self.inner.backend.login(email, password).await?;
        info!(user = %session.id, "signed in");
        self.set_current(Some(session.clone()));
        Ok(session)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        let session = self
            .inner
            .backend
            .register(email, password, display_name)
            .await?;
        info!(user = %session.id, "registered");
        self.set_current(Some(session.clone()));
        Ok(session)
    }

    /// Clear local state first, then tell the backend. A backend failure is
    /// logged and otherwise ignored.
    pub async fn logout(&self) {
        self.set_current(None);
        if let Err(e) = self.inner.backend.logout().await {
            warn!(error = %e, "backend logout failed, local session cleared anyway");
        }
    }
}

impl Inner {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Apply `session` only if nothing changed it since `expected`. Returns the
    /// new generation, or the current one when the report was stale.
    fn set_current_if(&self, expected: u64, session: Option<Session>) -> Result<u64, u64> {
        self.generation
            .compare_exchange(expected, expected + 1, Ordering::SeqCst, Ordering::SeqCst)?;
        self.store(session);
        Ok(expected + 1)
    }

    fn set_current(&self, session: Option<Session>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store(session);
    }

    fn store(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(s) => self.storage.set_json(keys::SESSION, s),
            None => self.storage.remove(keys::SESSION),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "could not persist session");
        }

        self.state.send_modify(|state| state.session = session);
    }

    fn mark_resolved(&self) {
        self.state.send_if_modified(|state| {
            let changed = !state.resolved;
            state.resolved = true;
            changed
        });
    }
}
