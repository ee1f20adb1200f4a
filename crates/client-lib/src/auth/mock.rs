//! Offline backend with one fixed account.
use std::sync::Arc;

use async_trait::async_trait;
use nutriplan_common::Session;
use tracing::debug;

use super::backend::{AuthBackend, SessionCallback, Subscription};
use crate::config::AuthProviderKind;
use crate::error::ClientError;
use crate::storage::{keys, ClientStorage};

pub const MOCK_USER_ID: &str = "123456";
pub const MOCK_EMAIL: &str = "demo@mock.com";
pub const MOCK_NAME: &str = "Usuario Demo";
pub const MOCK_PASSWORD: &str = "123456";

/// Accepts exactly one credential pair. `register` ignores its input and
/// returns the same fixed identity.
pub struct MockAuthBackend {
    storage: Arc<dyn ClientStorage>,
    email: String,
    password: String,
    user: Session,
}

impl MockAuthBackend {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self::with_credentials(storage, MOCK_EMAIL, MOCK_PASSWORD)
    }

    /// Builder for tests that need a different account
    pub fn with_credentials(
        storage: Arc<dyn ClientStorage>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let email = email.into();
        Self {
            storage,
            user: Session::new(MOCK_USER_ID, MOCK_NAME, email.clone()),
            email,
            password: password.into(),
        }
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    fn provider(&self) -> AuthProviderKind {
        AuthProviderKind::Mock
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        if email == self.email && password == self.password {
            Ok(self.user.clone())
        } else {
            Err(ClientError::InvalidCredentials)
        }
    }

    async fn register(
        &self,
        email: &str,
        _password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        debug!(email, ?display_name, "mock register, returning the fixed account");
        Ok(self.user.clone())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn observe_session(&self, callback: SessionCallback) -> Subscription {
        let stored = self.storage.get_json::<Session>(keys::SESSION).unwrap_or(None);
        callback(stored);
        Subscription::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use parking_lot::Mutex;

    fn backend() -> (Arc<dyn ClientStorage>, MockAuthBackend) {
        let storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());
        (storage.clone(), MockAuthBackend::new(storage))
    }

    #[tokio::test]
    async fn test_fixed_pair_logs_in() {
        let (_, mock) = backend();
        let session = mock.login(MOCK_EMAIL, MOCK_PASSWORD).await.unwrap();
        assert_eq!(session, Session::new(MOCK_USER_ID, MOCK_NAME, MOCK_EMAIL));

        assert!(matches!(
            mock.login(MOCK_EMAIL, "wrong").await,
            Err(ClientError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_returns_fixed_identity() {
        let (_, mock) = backend();
        let session = mock.register("x@y.z", "whatever", Some("Other")).await.unwrap();
        assert_eq!(session.email, MOCK_EMAIL);
        assert_eq!(session.display_name, MOCK_NAME);
    }

    #[tokio::test]
    async fn test_observe_reads_storage_once() {
        let (storage, mock) = backend();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let sub = mock
            .observe_session(Arc::new(move |s| sink.lock().push(s)))
            .await;
        assert!(!sub.is_active());

        let stored = Session::new("9", "Ana", "ana@example.com");
        storage.set_json(keys::SESSION, &stored).unwrap();
        let sink = seen.clone();
        let _sub = mock
            .observe_session(Arc::new(move |s| sink.lock().push(s)))
            .await;

        storage.set(keys::SESSION, "garbage").unwrap();
        let sink = seen.clone();
        let _sub = mock
            .observe_session(Arc::new(move |s| sink.lock().push(s)))
            .await;

        assert_eq!(*seen.lock(), vec![None, Some(stored), None]);
    }
}
