//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use nutriplan_client::{
    auth::{AuthBackend, SessionCallback, Subscription},
    config::AuthProviderKind,
    error::ClientError,
    storage::{ClientStorage, MemoryStorage},
};
use nutriplan_common::Session;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Serve `router` on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn memory_storage() -> Arc<dyn ClientStorage> {
    Arc::new(MemoryStorage::new())
}

/// Collects every path handed to a redirect callback
#[derive(Clone, Default)]
pub struct Redirects(Arc<Mutex<Vec<String>>>);

impl Redirects {
    pub fn callback(&self) -> Box<dyn Fn(&str) + Send + Sync> {
        let sink = self.0.clone();
        Box::new(move |path: &str| sink.lock().push(path.to_string()))
    }

    pub fn seen(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Wraps a backend and counts the login/register calls that reach it.
/// With a gate installed, each call parks until the gate is opened.
pub struct CountingBackend {
    inner: Arc<dyn AuthBackend>,
    calls: AtomicUsize,
    gate: Option<Gate>,
}

pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn AuthBackend>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(inner: Arc<dyn AuthBackend>) -> Self {
        Self {
            gate: Some(Gate {
                entered: Notify::new(),
                release: Notify::new(),
            }),
            ..Self::new(inner)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().unwrap()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

#[async_trait]
impl AuthBackend for CountingBackend {
    fn provider(&self) -> AuthProviderKind {
        self.inner.provider()
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        self.enter().await;
        self.inner.login(email, password).await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        self.enter().await;
        self.inner.register(email, password, display_name).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.inner.logout().await
    }

    async fn observe_session(&self, callback: SessionCallback) -> Subscription {
        self.inner.observe_session(callback).await
    }
}
