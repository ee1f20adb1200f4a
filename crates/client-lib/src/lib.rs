// ============================
// crates/client-lib/src/lib.rs
// ============================
//! Core of the `NutriPlan` client: pluggable authentication with client-side
//! throttling, the session store and the diet cache.

pub mod auth;
pub mod config;
pub mod diet;
pub mod error;
pub mod metrics;
pub mod notifications;
pub mod pagination;
pub mod providers;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{PersistentCookies, RedirectFn, SessionStore, SubmitController};
use crate::config::Settings;
use crate::diet::DietCollection;
use crate::error::ClientError;
use crate::notifications::NotificationListener;
use crate::storage::{ClientStorage, FileStorage};

/// Everything a front end needs, built once at startup
#[derive(Clone)]
pub struct ClientContext {
    /// Resolved settings
    pub settings: Arc<Settings>,
    /// Persisted client storage
    pub storage: Arc<dyn ClientStorage>,
    /// Current session
    pub sessions: SessionStore,
    /// The user's diets
    pub diets: Arc<DietCollection>,
}

impl ClientContext {
    /// Select the backends named in `settings` on top of `storage`
    pub fn new(settings: Settings, storage: Arc<dyn ClientStorage>) -> Result<Self, ClientError> {
        settings.validate()?;
        let cookies = Arc::new(PersistentCookies::open(storage.clone()));

        let auth = providers::select_auth_backend(&settings, storage.clone(), cookies.clone())?;
        let diet = providers::select_diet_backend(&settings, cookies)?;

        Ok(Self {
            sessions: SessionStore::new(auth, storage.clone()),
            diets: Arc::new(DietCollection::new(diet)),
            settings: Arc::new(settings),
            storage,
        })
    }

    /// Use file-backed storage under `settings.storage_dir`
    pub fn with_file_storage(settings: Settings) -> Result<Self, ClientError> {
        let storage = Arc::new(FileStorage::open(&settings.storage_dir)?);
        Self::new(settings, storage)
    }

    /// Load settings from the default sources and open file-backed storage
    pub fn load() -> Result<Self, ClientError> {
        Self::with_file_storage(Settings::load()?)
    }

    /// Form controller bound to this context's session and limits
    pub fn submit_controller(&self, redirect: RedirectFn) -> SubmitController {
        SubmitController::new(
            self.sessions.clone(),
            self.storage.clone(),
            &self.settings.limits,
            redirect,
        )
    }

    /// Open the live notification socket
    pub async fn listen(&self) -> Result<NotificationListener, ClientError> {
        NotificationListener::connect(&self.settings.notifications_url).await
    }
}
