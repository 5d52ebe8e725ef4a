use serde::Serialize;
use thiserror::Error;

use crate::common::types::now_ms;

/// Outcome of command validation. Returned synchronously to the issuing
/// participant only, never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A guest attempted a host-only command.
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    /// Join with an unknown or expired session code.
    #[error("not found: {0}")]
    NotFound(String),
    /// Seek out of range, empty chat text, malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Structurally valid but disallowed in the current state, e.g.
    /// removing the now-playing queue item.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Command from an id that is not in the participant registry.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Surfaced to the client as a reconnectable Error state.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

impl CommandError {
    /// Wire name for the error kind, camelCase like every other field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthorized(_) => "notAuthorized",
            Self::NotFound(_) => "notFound",
            Self::InvalidArgument(_) => "invalidArgument",
            Self::InvalidOperation(_) => "invalidOperation",
            Self::Unauthorized(_) => "unauthorized",
            Self::TransportFailure(_) => "transportFailure",
        }
    }
}

/// JSON error payload sent back to the issuing participant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub error: String,
    pub message: String,
}

impl From<&CommandError> for ErrorResponse {
    fn from(err: &CommandError) -> Self {
        Self {
            timestamp: now_ms(),
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
