//! The contract every authentication backend implements.
use std::sync::Arc;

use async_trait::async_trait;
use nutriplan_common::Session;
use tokio::task::JoinHandle;

use crate::config::AuthProviderKind;
use crate::error::ClientError;

/// Callback invoked with the authoritative session, or `None` when signed out
pub type SessionCallback = Arc<dyn Fn(Option<Session>) + Send + Sync>;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Which provider this backend talks to
    fn provider(&self) -> AuthProviderKind;

    /// Fails with `InvalidCredentials` or `Connection`.
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError>;

    /// Fails with `RegistrationFailed` or `Connection`.
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError>;

    /// End the session on the provider side. Callers clear local state
    /// whatever this returns.
    async fn logout(&self) -> Result<(), ClientError>;

    /// Report the current session to `callback`.
    ///
    /// Pull-based backends call it exactly once before returning and hand back
    /// an inert [`Subscription`]; push-based backends keep calling it on every
    /// change until the subscription is dropped.
    async fn observe_session(&self, callback: SessionCallback) -> Subscription;
}

/// Handle to a session observation. Dropping it stops the notifications.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription with nothing behind it
    pub fn noop() -> Self {
        Self { task: None }
    }

    pub(crate) fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Whether notifications may still arrive
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
