// crates/client-lib/src/error.rs

//! Central error type for the client library.
use thiserror::Error;

use crate::validation::ValidationError;

/// Client error types with error codes and context
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Too many attempts, cooldown active")]
    Throttled,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active session")]
    Unauthenticated,

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "VAL_001",
            ClientError::Throttled => "AUTH_003",
            ClientError::InvalidCredentials => "AUTH_001",
            ClientError::RegistrationFailed(_) => "AUTH_002",
            ClientError::Unauthenticated => "AUTH_004",
            ClientError::Connection(_) => "NET_001",
            ClientError::NotFound(_) => "NF_001",
            ClientError::Backend { .. } => "API_001",
            ClientError::Storage(_) => "IO_001",
            ClientError::Json(_) => "JSON_001",
            ClientError::Config(_) => "CFG_001",
        }
    }

    /// Get a sanitized message suitable for showing to end users
    pub fn sanitized_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.to_string(),
            ClientError::Throttled => {
                "Too many attempts. Wait a few seconds and try again.".to_string()
            },
            ClientError::InvalidCredentials => "Incorrect email or password.".to_string(),
            ClientError::RegistrationFailed(_) => "Registration failed.".to_string(),
            ClientError::Unauthenticated => "You need to sign in first.".to_string(),
            ClientError::Connection(_) => "Connection error".to_string(),
            ClientError::NotFound(_) => "Resource not found".to_string(),
            ClientError::Backend { message, .. } => message.clone(),
            ClientError::Storage(_) | ClientError::Json(_) | ClientError::Config(_) => {
                "An internal error occurred".to_string()
            },
        }
    }

    /// Whether the error originated from the network rather than from the backend's answer
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connection(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Backend {
                status: err.status().map_or(0, |s| s.as_u16()),
                message: format!("Unexpected response body: {err}"),
            };
        }
        ClientError::Connection(err.to_string())
    }
}

impl From<figment::Error> for ClientError {
    fn from(err: figment::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}
