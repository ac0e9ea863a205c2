//! Identity registry errors

use thiserror::Error;

use core_kernel::{Classify, CoreError, ErrorKind, LedgerError, PortError};

use crate::user::UserType;

/// Errors that can occur in the identity registry
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid user type '{0}': expected farmer or insurer")]
    InvalidUserType(String),

    /// Wrong number of positional registration fields
    #[error("Incorrect number of arguments for {user_type} registration: expected {expected}, got {actual}")]
    Arity {
        user_type: String,
        expected: usize,
        actual: usize,
    },

    /// Every field problem found in one registration request
    #[error("Invalid registration: {}", .0.join("; "))]
    InvalidRegistration(Vec<String>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User {user_id} is a {actual}, expected a {expected}")]
    WrongUserType {
        user_id: String,
        expected: UserType,
        actual: UserType,
    },

    #[error("User {0} has no account")]
    NoAccount(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IdentityError {
    pub fn not_found(user_id: impl std::fmt::Display) -> Self {
        IdentityError::NotFound(user_id.to_string())
    }

    /// Converts into the error type of the user directory port
    pub fn into_port_error(self) -> PortError {
        match self {
            IdentityError::NotFound(id) => PortError::not_found("User", id),
            IdentityError::Ledger(e) => PortError::upstream(e),
            IdentityError::WrongUserType { .. } | IdentityError::NoAccount(_) => {
                PortError::Conflict {
                    message: self.to_string(),
                }
            }
            other => PortError::validation(other.to_string()),
        }
    }
}

impl Classify for IdentityError {
    fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::InvalidUserType(_)
            | IdentityError::Arity { .. }
            | IdentityError::InvalidRegistration(_)
            | IdentityError::InvalidArgument(_)
            | IdentityError::Core(_) => ErrorKind::InvalidArgument,
            IdentityError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            IdentityError::NotFound(_) => ErrorKind::NotFound,
            IdentityError::WrongUserType { .. } | IdentityError::NoAccount(_) => {
                ErrorKind::InvalidState
            }
            IdentityError::Ledger(e) => e.kind(),
        }
    }
}
