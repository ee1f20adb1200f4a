//! REST authentication backends.
//!
//! Both variants post credentials in a JSON body and get back
//! `{_id, email, nombre}`. They differ in how the session is restored:
//! the session-cookie variant asks the backend "who am I" on every
//! observation, the token variant reads the identity already kept in client
//! storage and saves the round-trip.
use std::sync::Arc;

use async_trait::async_trait;
use nutriplan_common::{
    wire::{AuthUser, LoginRequest, ProfileResponse, RegisterRequest},
    Session,
};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};

use super::backend::{AuthBackend, SessionCallback, Subscription};
use super::cookies::PersistentCookies;
use crate::config::{AuthProviderKind, Settings};
use crate::error::ClientError;
use crate::storage::{keys, ClientStorage};

/// Paths of one REST auth API
#[derive(Debug, Clone)]
pub struct RestEndpoints {
    pub base: String,
    pub login: &'static str,
    pub register: &'static str,
    pub logout: &'static str,
    pub logout_method: Method,
    pub profile: &'static str,
}

impl RestEndpoints {
    /// `{api_url}/auth/...`, logout via GET
    pub fn session_cookie(api_url: &str) -> Self {
        Self {
            base: format!("{}/auth", api_url.trim_end_matches('/')),
            login: "/login",
            register: "/register",
            logout: "/logout",
            logout_method: Method::GET,
            profile: "/perfil",
        }
    }

    /// `{atlas_api_url}/...`, logout via POST
    pub fn token(api_url: &str) -> Self {
        Self {
            base: api_url.trim_end_matches('/').to_string(),
            login: "/login",
            register: "/register",
            logout: "/logout",
            logout_method: Method::POST,
            profile: "/perfil",
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// Where `observe_session` gets its answer from
enum SessionSource {
    /// `GET {profile}` on every observation
    Remote,
    /// The identity persisted in client storage
    Stored(Arc<dyn ClientStorage>),
}

pub struct RestAuthBackend {
    client: reqwest::Client,
    endpoints: RestEndpoints,
    source: SessionSource,
    provider: AuthProviderKind,
    cookies: Option<Arc<PersistentCookies>>,
}

impl RestAuthBackend {
    /// Session-cookie variant. The cookie the backend sets lands in `cookies`,
    /// so other clients built on the same jar share the session, and so does
    /// the next run. Logging out empties the jar.
    pub fn session_cookie(
        settings: &Settings,
        cookies: Arc<PersistentCookies>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .build()?;
        Ok(Self {
            client,
            endpoints: RestEndpoints::session_cookie(&settings.api_url),
            source: SessionSource::Remote,
            provider: AuthProviderKind::Mongo,
            cookies: Some(cookies),
        })
    }

    /// Token/local-storage variant
    pub fn token(settings: &Settings, storage: Arc<dyn ClientStorage>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoints: RestEndpoints::token(&settings.atlas_api_url),
            source: SessionSource::Stored(storage),
            provider: AuthProviderKind::Atlas,
            cookies: None,
        })
    }

    pub fn endpoints(&self) -> &RestEndpoints {
        &self.endpoints
    }

    async fn post_user<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Result<Session, StatusCode>, ClientError> {
        let response = self
            .client
            .post(self.endpoints.url(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err(status));
        }
        let user: AuthUser = response.json().await?;
        Ok(Ok(user.into()))
    }

    async fn fetch_profile(&self) -> Option<Session> {
        let response = match self
            .client
            .get(self.endpoints.url(self.endpoints.profile))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                return None;
            },
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "no active session on the backend");
            return None;
        }

        match response.json::<ProfileResponse>().await {
            Ok(profile) => Some(profile.usuario),
            Err(e) => {
                warn!(error = %e, "unreadable session profile");
                None
            },
        }
    }
}

#[async_trait]
impl AuthBackend for RestAuthBackend {
    fn provider(&self) -> AuthProviderKind {
        self.provider
    }

    #[instrument(skip(self, password), fields(provider = %self.provider))]
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.post_user(self.endpoints.login, &body).await? {
            Ok(session) => Ok(session),
            Err(status) => {
                debug!(%status, "login rejected");
                Err(ClientError::InvalidCredentials)
            },
        }
    }

    #[instrument(skip(self, password), fields(provider = %self.provider))]
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: display_name.map(str::to_string),
        };
        match self.post_user(self.endpoints.register, &body).await? {
            Ok(session) => Ok(session),
            Err(status) => Err(ClientError::RegistrationFailed(format!(
                "backend answered {status}"
            ))),
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider))]
    async fn logout(&self) -> Result<(), ClientError> {
        let result = self.request_logout().await;
        if let Some(cookies) = &self.cookies {
            cookies.clear();
        }
        result
    }

    async fn observe_session(&self, callback: SessionCallback) -> Subscription {
        let session = match &self.source {
            SessionSource::Remote => self.fetch_profile().await,
            SessionSource::Stored(storage) => storage.get_json::<Session>(keys::SESSION).unwrap_or(None),
        };
        callback(session);
        Subscription::noop()
    }
}

impl RestAuthBackend {
    async fn request_logout(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .request(
                self.endpoints.logout_method.clone(),
                self.endpoints.url(self.endpoints.logout),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: "Could not close the session.".to_string(),
            });
        }
        Ok(())
    }
}
