//! Policy registry errors

use thiserror::Error;

use core_kernel::{Classify, CoreError, ErrorKind, LedgerError};

/// Errors that can occur in the policy registry
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Incorrect number of arguments: expected {expected}, got {actual}")]
    Arity { expected: String, actual: usize },

    /// Every field problem found in one creation request
    #[error("Invalid policy: {}", .0.join("; "))]
    InvalidPolicy(Vec<String>),

    #[error("Invalid policy status '{0}': expected New, Active, Claimed or Expired")]
    InvalidStatus(String),

    /// No insurer argument and no default insurer configured
    #[error("No insurerId given and no default insurer is configured")]
    MissingInsurer,

    #[error("Policy already exists: {0}")]
    AlreadyExists(String),

    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PolicyError {
    pub fn not_found(policy_id: impl std::fmt::Display) -> Self {
        PolicyError::NotFound(policy_id.to_string())
    }
}

impl Classify for PolicyError {
    fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::Arity { .. }
            | PolicyError::InvalidPolicy(_)
            | PolicyError::InvalidStatus(_)
            | PolicyError::MissingInsurer
            | PolicyError::Core(_) => ErrorKind::InvalidArgument,
            PolicyError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            PolicyError::NotFound(_) => ErrorKind::NotFound,
            PolicyError::Ledger(e) => e.kind(),
        }
    }
}
