// ============================
// crates/client-lib/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "nutriplan.toml";
/// Environment variable prefix; nested keys are separated with `__`
pub const ENV_PREFIX: &str = "NUTRIPLAN_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Which authentication backend to instantiate.
///
/// Unknown or empty names fall back to [`AuthProviderKind::Mock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthProviderKind {
    #[default]
    Mock,
    /// REST backend with a server-side session cookie
    Mongo,
    /// REST backend, session restored from client storage
    Atlas,
    /// Third-party identity provider with push notifications
    Firebase,
}

impl AuthProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProviderKind::Mock => "mock",
            AuthProviderKind::Mongo => "mongo",
            AuthProviderKind::Atlas => "atlas",
            AuthProviderKind::Firebase => "firebase",
        }
    }
}

impl From<&str> for AuthProviderKind {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" => AuthProviderKind::Mongo,
            "atlas" => AuthProviderKind::Atlas,
            "firebase" => AuthProviderKind::Firebase,
            _ => AuthProviderKind::Mock,
        }
    }
}

impl From<String> for AuthProviderKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<AuthProviderKind> for String {
    fn from(kind: AuthProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AuthProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which diet backend to instantiate; unknown names fall back to `Mock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DietProviderKind {
    #[default]
    Mock,
    Mongo,
}

impl DietProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietProviderKind::Mock => "mock",
            DietProviderKind::Mongo => "mongo",
        }
    }
}

impl From<String> for DietProviderKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" => DietProviderKind::Mongo,
            _ => DietProviderKind::Mock,
        }
    }
}

impl From<DietProviderKind> for String {
    fn from(kind: DietProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DietProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login throttling and password rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthLimits {
    /// Consecutive failures that arm the cooldown
    pub max_attempts: u32,
    /// Minimum password length, in characters
    pub min_password_length: usize,
    /// Cooldown window in seconds
    pub cooldown_secs: u64,
}

impl Default for AuthLimits {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_password_length: 6,
            cooldown_secs: 30,
        }
    }
}

impl AuthLimits {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Third-party identity provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Base URL of the identity REST API
    pub endpoint: String,
    /// Public web API key
    pub api_key: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            endpoint: "https://identitytoolkit.googleapis.com".to_string(),
            api_key: String::new(),
        }
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Authentication backend
    pub auth_provider: AuthProviderKind,
    /// Diet backend
    pub diet_provider: DietProviderKind,
    /// Base URL of the REST backend
    pub api_url: String,
    /// Base URL of the token-based REST backend
    pub atlas_api_url: String,
    /// Identity provider
    pub identity: IdentitySettings,
    /// WebSocket endpoint for live notifications
    pub notifications_url: String,
    /// Directory holding persisted client storage
    pub storage_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Throttling and password rules
    pub limits: AuthLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_provider: AuthProviderKind::default(),
            diet_provider: DietProviderKind::default(),
            api_url: "http://localhost:8080".to_string(),
            atlas_api_url: "https://your-api-hostname.com/api".to_string(),
            identity: IdentitySettings::default(),
            notifications_url: "ws://localhost:8081/ws".to_string(),
            storage_dir: PathBuf::from(".nutriplan"),
            log_level: "info".to_string(),
            limits: AuthLimits::default(),
        }
    }
}

impl Settings {
    /// Load from defaults, `nutriplan.toml` and `NUTRIPLAN_*` variables
    pub fn load() -> Result<Self, ClientError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load using an explicit configuration file; a missing file is skipped
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check the settings for values the client cannot work with
    pub fn validate(&self) -> Result<(), ClientError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ClientError::Config(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        if self.limits.max_attempts == 0 {
            return Err(ClientError::Config("limits.max_attempts must be positive".into()));
        }
        if self.limits.cooldown_secs == 0 {
            return Err(ClientError::Config("limits.cooldown_secs must be positive".into()));
        }
        if self.limits.min_password_length == 0 {
            return Err(ClientError::Config(
                "limits.min_password_length must be positive".into(),
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| ClientError::Config(format!("invalid api_url '{}': {e}", self.api_url)))?;
        Ok(())
    }
}
