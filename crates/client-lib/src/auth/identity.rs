//! Third-party identity provider backend.
//!
//! Talks to the provider's public REST API (`accounts:signInWithPassword`,
//! `accounts:signUp`, `accounts:update`). Unlike the REST backends the
//! session here is push-based: the signed-in user lives in a `watch` channel
//! and every observer is told about each change until it unsubscribes.
use std::sync::Arc;

use async_trait::async_trait;
use nutriplan_common::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::backend::{AuthBackend, SessionCallback, Subscription};
use crate::config::{AuthProviderKind, IdentitySettings};
use crate::error::ClientError;
use crate::storage::{keys, ClientStorage};

const SIGN_IN_PATH: &str = "/v1/accounts:signInWithPassword";
const SIGN_UP_PATH: &str = "/v1/accounts:signUp";
const UPDATE_PATH: &str = "/v1/accounts:update";

/// Error codes the provider uses for a rejected email/password pair
const CREDENTIAL_ERRORS: [&str; 4] = [
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "USER_DISABLED",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Provider answer classified for the caller
enum ProviderFailure {
    Rejected(String),
    Transport(ClientError),
}

pub struct IdentityBackend {
    client: reqwest::Client,
    settings: IdentitySettings,
    storage: Arc<dyn ClientStorage>,
    user: watch::Sender<Option<Session>>,
}

impl IdentityBackend {
    /// Restores the last signed-in user from storage, the way the provider SDK
    /// restores its own persisted state.
    pub fn new(settings: IdentitySettings, storage: Arc<dyn ClientStorage>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        let restored = storage.get_json::<Session>(keys::IDENTITY_USER)?;
        let (user, _) = watch::channel(restored);
        Ok(Self {
            client,
            settings,
            storage,
            user,
        })
    }

    /// Currently signed-in user as the provider sees it
    pub fn current_user(&self) -> Option<Session> {
        self.user.borrow().clone()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?key={}",
            self.settings.endpoint.trim_end_matches('/'),
            path,
            self.settings.api_key
        )
    }

    async fn call<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AccountResponse, ProviderFailure> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderFailure::Transport(e.into()))?;

        if response.status().is_success() {
            return response
                .json::<AccountResponse>()
                .await
                .map_err(|e| ProviderFailure::Transport(e.into()));
        }

        let status = response.status();
        let code = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => status.to_string(),
        };
        Err(ProviderFailure::Rejected(code))
    }

    /// Publish and persist the signed-in user
    fn publish(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(s) => self.storage.set_json(keys::IDENTITY_USER, s),
            None => self.storage.remove(keys::IDENTITY_USER),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "could not persist identity user");
        }
        self.user.send_replace(session);
    }
}

/// Codes like `WEAK_PASSWORD : Password should be at least 6 characters` carry a detail suffix
fn error_code(message: &str) -> &str {
    message.split(':').next().unwrap_or(message).trim()
}

#[async_trait]
impl AuthBackend for IdentityBackend {
    fn provider(&self) -> AuthProviderKind {
        AuthProviderKind::Firebase
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account = match self.call(SIGN_IN_PATH, &request).await {
            Ok(account) => account,
            Err(ProviderFailure::Transport(e)) => return Err(e),
            Err(ProviderFailure::Rejected(message)) => {
                let code = error_code(&message);
                debug!(code, "sign-in rejected");
                if CREDENTIAL_ERRORS.contains(&code) {
                    return Err(ClientError::InvalidCredentials);
                }
                return Err(ClientError::Backend {
                    status: 400,
                    message: code.to_string(),
                });
            },
        };

        let session = Session::from_profile(account.local_id, account.email, account.display_name);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session, ClientError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let mut account = match self.call(SIGN_UP_PATH, &request).await {
            Ok(account) => account,
            Err(ProviderFailure::Transport(e)) => return Err(e),
            Err(ProviderFailure::Rejected(message)) => {
                return Err(ClientError::RegistrationFailed(error_code(&message).to_string()))
            },
        };

        if let (Some(name), Some(token)) = (display_name, account.id_token.as_deref()) {
            let update = ProfileUpdate {
                id_token: token,
                display_name: name,
                return_secure_token: true,
            };
            match self.call(UPDATE_PATH, &update).await {
                Ok(updated) => account.display_name = updated.display_name.or(Some(name.to_string())),
                // the account exists at this point; keep it and fall back to the email as name
                Err(ProviderFailure::Rejected(message)) => {
                    warn!(code = error_code(&message), "display name update rejected")
                },
                Err(ProviderFailure::Transport(e)) => warn!(error = %e, "display name update failed"),
            }
        }

        let session = Session::from_profile(account.local_id, account.email, account.display_name);
        self.publish(Some(session.clone()));
        Ok(session)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.publish(None);
        Ok(())
    }

    async fn observe_session(&self, callback: SessionCallback) -> Subscription {
        let mut rx = self.user.subscribe();
        let task = tokio::spawn(async move {
            let current = rx.borrow_and_update().clone();
            callback(current);
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                callback(next);
            }
        });
        Subscription::from_task(task)
    }
}
