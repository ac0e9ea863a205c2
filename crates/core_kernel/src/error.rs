//! Core error types used across the system
//!
//! Every crate keeps its own error enum, but each one classifies into one of
//! the stable [`ErrorKind`]s so that contract callers see the same shape no
//! matter which component failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable classification of every failure surfaced to a contract caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wrong arity, malformed or missing field, unknown enum value
    InvalidArgument,
    /// Duplicate primary key on create
    AlreadyExists,
    /// Missing primary key on read or update
    NotFound,
    /// Operation not legal for the current state of a document
    InvalidState,
    /// Claim date-window check failed
    NotEligible,
    /// The ledger itself (get/put/query/invoke) failed
    UpstreamFailure,
    /// A multi-document write was partially applied
    Inconsistent,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::NotEligible => "NotEligible",
            ErrorKind::UpstreamFailure => "UpstreamFailure",
            ErrorKind::Inconsistent => "Inconsistent",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every domain error so callers can branch on the kind
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Core error type for the kernel
///
/// Raised by the value parsers in this crate (identifiers, dates,
/// coordinates). All of them are argument problems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid date '{value}': expected dd/mm/yyyy or yyyy-mm-dd")]
    InvalidDate { value: String },

    #[error("Invalid coordinates '{value}': {reason}")]
    InvalidCoordinates { value: String, reason: String },

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

impl Classify for CoreError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}
