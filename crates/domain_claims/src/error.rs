//! Claims settlement errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{Classify, DateWindow, ErrorKind, LedgerError, PortError};
use domain_identity::IdentityError;
use domain_policy::{PolicyError, PolicyStatus};

/// Errors that can occur while settling a claim
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Policy {0} has already been claimed")]
    AlreadyClaimed(String),

    #[error("Policy {policy_id} is {status} and cannot be claimed")]
    NotClaimable {
        policy_id: String,
        status: PolicyStatus,
    },

    #[error("Policy {policy_id} is not eligible for a claim: {checked} is outside {window}")]
    NotEligible {
        policy_id: String,
        checked: NaiveDate,
        window: DateWindow,
    },

    #[error("Insufficient funds in account {account_number}: balance {balance}, claim {amount}")]
    InsufficientFunds {
        account_number: i64,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Balance arithmetic overflowed")]
    ArithmeticOverflow,

    /// Another transaction changed one of the settlement documents
    #[error("Settlement of policy {policy_id} conflicted with a concurrent change to {key}")]
    ConcurrentModification { policy_id: String, key: String },

    #[error("User lookup failed: {0}")]
    Directory(#[from] PortError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Classify for ClaimsError {
    fn kind(&self) -> ErrorKind {
        match self {
            ClaimsError::AlreadyClaimed(_)
            | ClaimsError::NotClaimable { .. }
            | ClaimsError::InsufficientFunds { .. } => ErrorKind::InvalidState,
            ClaimsError::NotEligible { .. } => ErrorKind::NotEligible,
            ClaimsError::InvalidAmount(_) | ClaimsError::ArithmeticOverflow => {
                ErrorKind::InvalidState
            }
            ClaimsError::ConcurrentModification { .. } => ErrorKind::UpstreamFailure,
            ClaimsError::Directory(e) => e.kind(),
            ClaimsError::Identity(e) => e.kind(),
            ClaimsError::Policy(e) => e.kind(),
            ClaimsError::Ledger(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_commit_is_inconsistent() {
        let err = ClaimsError::from(LedgerError::PartialCommit {
            applied: vec!["P1".into()],
            failed_key: "F1".into(),
            reason: "peer down".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Inconsistent);
    }

    #[test]
    fn test_missing_user_is_not_found() {
        let err = ClaimsError::from(PortError::not_found("User", "F1"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
