//! Login/register form submission with client-side throttling.
//!
//! `Idle -> Validating -> (CoolingDown | Authenticating) -> Idle`. Only one
//! submission can be in flight; a second one is turned away with
//! [`SubmitError::Busy`] without touching the backend.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metrics::counter;
use nutriplan_common::Session;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroize;

use super::rate_limit::{Clock, Gate, LoginThrottle, SystemClock};
use super::session::SessionStore;
use crate::config::AuthLimits;
use crate::error::ClientError;
use crate::metrics::{AUTH_FAILED, AUTH_SUCCEEDED, AUTH_THROTTLED};
use crate::storage::{keys, ClientStorage};
use crate::validation::{self, ValidationError};

/// Path handed to the redirect callback after a successful submission
pub const REDIRECT_PATH: &str = "/";

/// Called with the post-authentication path
pub type RedirectFn = Box<dyn Fn(&str) + Send + Sync>;

/// Errors reported to the form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("A submission is already in progress.")]
    Busy,

    #[error("Too many attempts. Wait a few seconds and try again.")]
    Throttled,

    #[error("{}", invalid_message(.0))]
    Invalid(ValidationError),

    /// The backend refused or could not be reached. The cause is logged, never shown.
    #[error("Incorrect email or password.")]
    Rejected,
}

fn invalid_message(error: &ValidationError) -> String {
    if error.is_credential_shape() {
        "Invalid email or password.".to_string()
    } else {
        error.to_string()
    }
}

/// `Busy` and `Throttled` both refuse the attempt locally and map to
/// [`ClientError::Throttled`]. `Rejected` stays as opaque as the form message.
impl From<SubmitError> for ClientError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Busy | SubmitError::Throttled => ClientError::Throttled,
            SubmitError::Invalid(e) => ClientError::Validation(e),
            SubmitError::Rejected => ClientError::InvalidCredentials,
        }
    }
}

/// Controller state, observable while a submission runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Validating,
    CoolingDown,
    Authenticating,
}

/// Which form the user last chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Register => "register",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw form input
#[derive(Clone, Default)]
pub struct SubmitRequest {
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub is_registering: bool,
}

impl SubmitRequest {
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            password: password.into(),
            is_registering: false,
        }
    }

    pub fn register(
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
            password: password.into(),
            is_registering: true,
        }
    }
}

impl fmt::Debug for SubmitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("is_registering", &self.is_registering)
            .finish()
    }
}

impl Drop for SubmitRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

pub struct SubmitController {
    sessions: SessionStore,
    storage: Arc<dyn ClientStorage>,
    throttle: LoginThrottle,
    min_password_length: usize,
    redirect: RedirectFn,
    in_flight: AtomicBool,
    state: Mutex<SubmitState>,
    last_error: Mutex<Option<SubmitError>>,
}

impl SubmitController {
    pub fn new(
        sessions: SessionStore,
        storage: Arc<dyn ClientStorage>,
        limits: &AuthLimits,
        redirect: RedirectFn,
    ) -> Self {
        Self::with_clock(sessions, storage, limits, Arc::new(SystemClock), redirect)
    }

    pub fn with_clock(
        sessions: SessionStore,
        storage: Arc<dyn ClientStorage>,
        limits: &AuthLimits,
        clock: Arc<dyn Clock>,
        redirect: RedirectFn,
    ) -> Self {
        Self {
            sessions,
            throttle: LoginThrottle::new(storage.clone(), clock, limits),
            storage,
            min_password_length: limits.min_password_length,
            redirect,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SubmitState::Idle),
            last_error: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SubmitState {
        *self.state.lock()
    }

    /// True while the backend call is pending
    pub fn is_loading(&self) -> bool {
        self.state() == SubmitState::Authenticating
    }

    /// Message of the most recent failed submission, cleared on the next one
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().as_ref().map(ToString::to_string)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.throttle.consecutive_failures()
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub fn remember_mode(&self, mode: AuthMode) {
        if let Err(e) = self.storage.set(keys::AUTH_MODE, mode.as_str()) {
            warn!(error = %e, "could not persist form mode");
        }
    }

    pub fn remembered_mode(&self) -> AuthMode {
        match self.storage.get(keys::AUTH_MODE) {
            Ok(Some(mode)) if mode == AuthMode::Register.as_str() => AuthMode::Register,
            _ => AuthMode::Login,
        }
    }

    /// Run one submission end to end
    pub async fn submit(&self, request: SubmitRequest) -> Result<Session, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("submission ignored, another one is in flight");
            return Err(SubmitError::Busy);
        }
        let _guard = InFlight(self);

        *self.last_error.lock() = None;
        let result = self.run(request).await;
        if let Err(e) = &result {
            *self.last_error.lock() = Some(e.clone());
        }
        result
    }

    async fn run(&self, request: SubmitRequest) -> Result<Session, SubmitError> {
        self.set_state(SubmitState::Validating);

        match self.throttle.check() {
            Gate::Open => {},
            Gate::CoolingDown { remaining } => {
                debug!(?remaining, "attempt rejected during cooldown");
                return Err(self.throttled());
            },
            Gate::Exhausted => return Err(self.throttled()),
        }

        let email = validation::sanitize(&request.email);
        let name = validation::sanitize(request.name.as_deref().unwrap_or_default());
        let mut password = validation::sanitize(&request.password);

        if let Err(e) = self.validate(&email, &name, &password, request.is_registering) {
            password.zeroize();
            return Err(SubmitError::Invalid(e));
        }

        self.set_state(SubmitState::Authenticating);
        let outcome = if request.is_registering {
            self.sessions.register(&email, &password, Some(name.as_str())).await
        } else {
            self.sessions.login(&email, &password).await
        };
        password.zeroize();

        match outcome {
            Ok(session) => {
                self.throttle.record_success();
                counter!(AUTH_SUCCEEDED).increment(1);
                (self.redirect)(REDIRECT_PATH);
                Ok(session)
            },
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "authentication failed");
                counter!(AUTH_FAILED).increment(1);
                if self.throttle.record_failure() {
                    return Err(self.throttled());
                }
                Err(SubmitError::Rejected)
            },
        }
    }

    fn validate(
        &self,
        email: &str,
        name: &str,
        password: &str,
        is_registering: bool,
    ) -> Result<(), ValidationError> {
        validation::validate_credentials(email, password, self.min_password_length)?;
        if is_registering {
            validation::validate_name(name)?;
        }
        Ok(())
    }

    fn throttled(&self) -> SubmitError {
        self.set_state(SubmitState::CoolingDown);
        counter!(AUTH_THROTTLED).increment(1);
        SubmitError::Throttled
    }

    fn set_state(&self, state: SubmitState) {
        *self.state.lock() = state;
    }
}

/// Releases the in-flight slot and returns the controller to `Idle`
struct InFlight<'a>(&'a SubmitController);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set_state(SubmitState::Idle);
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}
