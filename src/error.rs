//! Error taxonomy
//!
//! One enum per layer. Transport failures bubble up through `ServiceError`,
//! which knows how to turn itself into the message a user should see.

use thiserror::Error;

use crate::remediation::RemediationAction;
use crate::workflow::WorkflowState;

/// Failure before any HTTP status was received
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

/// Failure talking to a backend endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-success status; `message` is the server's `error` field when present
    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Failed to parse {endpoint} response: {detail}")]
    Decode { endpoint: String, detail: String },
}

impl ServiceError {
    /// Message shown to the user: the server's error field, else the raw error
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => e.to_string(),
            Self::Status { message, .. } => message.clone(),
            Self::Decode { detail, .. } => detail.clone(),
        }
    }
}

/// Scan call failed (only surfaced under `ScanErrorPolicy::FailClosed`)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Scan failed: {0}")]
pub struct ScanError(#[from] pub ServiceError);

/// Any failure along a mask / encrypt / safe-upload chain
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {}", .action.failure_prefix(), .source.user_message())]
pub struct RemediationError {
    pub action: RemediationAction,
    #[source]
    pub source: ServiceError,
}

impl RemediationError {
    pub fn new(action: RemediationAction, source: ServiceError) -> Self {
        Self { action, source }
    }
}

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("Expected a {expected} file but got {supplied}")]
    MaterialMismatch { expected: String, supplied: String },

    #[error("Could not read {}: {source}", .path.display())]
    MaterialUnreadable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decryption failed: {}", .0.user_message())]
    Service(#[from] ServiceError),

    #[error("No decrypted file returned from server (content type: {content_type})")]
    NotBinary { content_type: String },

    #[error("Failed to save decrypted file: {0}")]
    Save(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DriveError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to save downloaded file: {0}")]
    Save(#[source] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Cannot {attempted} while {state}")]
    InvalidTransition {
        state: WorkflowState,
        attempted: String,
    },

    #[error("No file is loaded")]
    NoActiveFile,

    #[error("Zone {index} does not exist ({count} zones)")]
    ZoneOutOfRange { index: usize, count: usize },

    /// A newer intake replaced the session this call belonged to
    #[error("Session was superseded by a newer file")]
    Superseded,

    #[error(transparent)]
    Remediation(#[from] RemediationError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
