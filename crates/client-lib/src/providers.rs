// ============================
// crates/client-lib/src/providers.rs
// ============================
//! Backend selection from configuration.
use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthBackend, IdentityBackend, MockAuthBackend, PersistentCookies, RestAuthBackend};
use crate::config::{AuthProviderKind, DietProviderKind, Settings};
use crate::diet::{DietBackend, MockDietBackend, RestDietBackend};
use crate::error::ClientError;
use crate::storage::ClientStorage;

/// Build the authentication backend named by `settings.auth_provider`.
///
/// The cookie-session backend stores its cookie in `cookies` so diet requests
/// made with the same jar are authenticated.
pub fn select_auth_backend(
    settings: &Settings,
    storage: Arc<dyn ClientStorage>,
    cookies: Arc<PersistentCookies>,
) -> Result<Arc<dyn AuthBackend>, ClientError> {
    let backend: Arc<dyn AuthBackend> = match settings.auth_provider {
        AuthProviderKind::Mock => Arc::new(MockAuthBackend::new(storage)),
        AuthProviderKind::Mongo => Arc::new(RestAuthBackend::session_cookie(settings, cookies)?),
        AuthProviderKind::Atlas => Arc::new(RestAuthBackend::token(settings, storage)?),
        AuthProviderKind::Firebase => {
            Arc::new(IdentityBackend::new(settings.identity.clone(), storage)?)
        },
    };
    info!(provider = %backend.provider(), "auth provider selected");
    Ok(backend)
}

/// Build the diet backend named by `settings.diet_provider`
pub fn select_diet_backend(
    settings: &Settings,
    cookies: Arc<PersistentCookies>,
) -> Result<Arc<dyn DietBackend>, ClientError> {
    let backend: Arc<dyn DietBackend> = match settings.diet_provider {
        DietProviderKind::Mock => Arc::new(MockDietBackend::new()),
        DietProviderKind::Mongo => Arc::new(RestDietBackend::new(settings, cookies)?),
    };
    info!(provider = %backend.provider(), "diet provider selected");
    Ok(backend)
}
