// ============================
// crates/client-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod backend;
pub mod cookies;
pub mod identity;
pub mod mock;
pub mod rate_limit;
pub mod rest;
pub mod session;
pub mod submit;

pub use backend::{AuthBackend, SessionCallback, Subscription};
pub use cookies::PersistentCookies;
pub use identity::IdentityBackend;
pub use mock::MockAuthBackend;
pub use rate_limit::{Clock, Gate, LoginThrottle, ManualClock, SystemClock};
pub use rest::{RestAuthBackend, RestEndpoints};
pub use session::{SessionState, SessionStore, HOME_PATH, LOGIN_PATH};
pub use submit::{AuthMode, RedirectFn, SubmitController, SubmitError, SubmitRequest, SubmitState, REDIRECT_PATH};
