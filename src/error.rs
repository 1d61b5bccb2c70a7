// Error handling module
// Defines the error kinds surfaced by the client

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to the OV-chipkaart API
#[derive(Error, Debug)]
pub enum ClientError {
    /// OAuth token exchange or api/authorize exchange failed
    #[error("Authorization failed: {status} - {payload}")]
    AuthError { status: i64, payload: Value },

    /// Resource call returned a non-success envelope
    #[error("OV-chipkaart API error: {code} - {payload}")]
    RequestError { code: i64, payload: Value },

    /// A required argument was missing or invalid
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Network or transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success envelope with a payload of an unexpected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// Remote status code carried by auth and request errors
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            ClientError::AuthError { status, .. } => Some(*status),
            ClientError::RequestError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Remote error payload, verbatim
    pub fn remote_payload(&self) -> Option<&Value> {
        match self {
            ClientError::AuthError { payload, .. } | ClientError::RequestError { payload, .. } => {
                Some(payload)
            }
            _ => None,
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        ClientError::ValidationError(format!("{} is required", field))
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
