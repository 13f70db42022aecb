//! Error types for campaign service operations
//!
//! Every failure crossing the service boundary is normalised into a
//! [`ServiceError`]: a kind naming the operation that failed plus a
//! human-readable message. Callers branch on the kind alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which remote capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Contact file unreadable, unsupported, or rejected by the parser
    Ingest,
    /// Campaign creation rejected (empty or invalid contact set)
    Confirm,
    /// Listing or status lookup failed
    Fetch,
    /// Draft update rejected (not found, invalid status)
    Update,
    /// Sequence generation failed
    Generate,
    /// Step dispatch failed (no eligible recipients, upstream transport)
    Send,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Ingest => "IngestError",
            ErrorKind::Confirm => "ConfirmError",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Update => "UpdateError",
            ErrorKind::Generate => "GenerateError",
            ErrorKind::Send => "SendError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised failure of a campaign service operation.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn ingest(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ingest, message)
    }

    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Confirm, message)
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    pub fn update(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Update, message)
    }

    pub fn generate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generate, message)
    }

    pub fn send(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Send, message)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Local input validation errors, raised before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No valid contacts")]
    EmptyContacts,

    #[error("Duplicate email {email} at row {row}")]
    DuplicateEmail { email: String, row: usize },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Attach the operation kind the validation guarded.
    pub fn into_service_error(self, kind: ErrorKind) -> ServiceError {
        ServiceError::new(kind, self.to_string())
    }
}
