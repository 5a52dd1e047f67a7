//! Domain Layer - Errors
//!
//! Validation errors are raised locally before anything reaches the remote
//! store. Remote errors come back from a single backend call.

use serde::{Deserialize, Serialize};

/// Result of a single remote-store call
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A payload was rejected by its variant's rules; the mutation is not applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} payload: {message}")]
pub struct ValidationError {
    pub kind: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Failure of one remote operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RemoteError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The backend has no such operation (e.g. batch reorder)
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
