//! Contract dispatch errors

use thiserror::Error;

use core_kernel::{Classify, CoreError, ErrorKind, LedgerError};
use domain_claims::ClaimsError;
use domain_identity::IdentityError;
use domain_policy::PolicyError;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Contract {contract} has no function {function}")]
    UnknownFunction { contract: String, function: String },

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Claims(#[from] ClaimsError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ContractError {
    pub fn unknown_function(contract: &str, function: &str) -> Self {
        ContractError::UnknownFunction {
            contract: contract.to_string(),
            function: function.to_string(),
        }
    }
}

impl Classify for ContractError {
    fn kind(&self) -> ErrorKind {
        match self {
            ContractError::UnknownFunction { .. } | ContractError::Arity { .. } => {
                ErrorKind::InvalidArgument
            }
            ContractError::Identity(e) => e.kind(),
            ContractError::Policy(e) => e.kind(),
            ContractError::Claims(e) => e.kind(),
            ContractError::Core(e) => e.kind(),
            ContractError::Ledger(e) => e.kind(),
            ContractError::Encoding(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Checks that `args` holds exactly `expected` values
pub fn expect_args<'a, const N: usize>(
    function: &str,
    args: &'a [String],
) -> Result<&'a [String; N], ContractError> {
    args.try_into().map_err(|_| ContractError::Arity {
        function: function.to_string(),
        expected: N,
        actual: args.len(),
    })
}
