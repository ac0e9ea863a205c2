//! Contracts and cross-contract invocation
//!
//! A contract exposes named functions taking positional string arguments and
//! answers with a success payload or a structured error. Contracts hosted in
//! the same process find each other through [`ChaincodeRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;

use crate::error::{Classify, ErrorKind};
use crate::ledger::LedgerError;

/// Error half of a contract response, serialized as `{"kind","message"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct ContractFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ContractFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Captures any classified error
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Classify + fmt::Display + ?Sized,
    {
        Self::new(error.kind(), error.to_string())
    }

    /// The stable JSON error string returned to callers
    pub fn to_payload(&self) -> String {
        serde_json::json!({ "kind": self.kind, "message": self.message }).to_string()
    }

    /// Parses an error string, falling back to `UpstreamFailure` for text
    /// that is not in the structured shape
    pub fn parse(payload: &str) -> Self {
        serde_json::from_str(payload)
            .unwrap_or_else(|_| Self::new(ErrorKind::UpstreamFailure, payload))
    }
}

impl Classify for ContractFailure {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Result of a contract invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractResponse {
    Success(Vec<u8>),
    Error(ContractFailure),
}

impl ContractResponse {
    /// Serializes `value` as the success payload
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => ContractResponse::Success(bytes),
            Err(err) => ContractResponse::Error(ContractFailure::new(
                ErrorKind::UpstreamFailure,
                format!("failed to encode response: {}", err),
            )),
        }
    }

    pub fn error<E>(error: &E) -> Self
    where
        E: Classify + fmt::Display + ?Sized,
    {
        ContractResponse::Error(ContractFailure::from_error(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ContractResponse::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<u8>, ContractFailure> {
        match self {
            ContractResponse::Success(payload) => Ok(payload),
            ContractResponse::Error(failure) => Err(failure),
        }
    }
}

impl<T, E> From<Result<T, E>> for ContractResponse
where
    T: Serialize,
    E: Classify + fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ContractResponse::json(&value),
            Err(err) => ContractResponse::error(&err),
        }
    }
}

/// A named contract
#[async_trait]
pub trait Chaincode: Send + Sync {
    /// Contract name used for routing and cross-contract calls
    fn name(&self) -> &str;

    /// Function names this contract answers to
    fn functions(&self) -> &'static [&'static str];

    async fn invoke(&self, function: &str, args: &[String]) -> ContractResponse;
}

/// In-process directory of contracts reachable through `invoke`
///
/// Holds weak references: contracts own a ledger that points back at the
/// registry, and a strong reference would keep that cycle alive forever.
#[derive(Default)]
pub struct ChaincodeRegistry {
    contracts: RwLock<HashMap<String, Weak<dyn Chaincode>>>,
}

impl ChaincodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, contract: &Arc<dyn Chaincode>) -> Result<(), LedgerError> {
        let mut contracts = self
            .contracts
            .write()
            .map_err(|_| LedgerError::Unavailable("contract registry lock poisoned".into()))?;
        contracts.insert(contract.name().to_string(), Arc::downgrade(contract));
        tracing::debug!(contract = contract.name(), "Registered contract");
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Chaincode>, LedgerError> {
        let contracts = self
            .contracts
            .read()
            .map_err(|_| LedgerError::Unavailable("contract registry lock poisoned".into()))?;
        contracts
            .get(name)
            .and_then(Weak::upgrade)
            .ok_or_else(|| LedgerError::ChaincodeNotFound(name.to_string()))
    }

    /// Names of the contracts still alive
    pub fn names(&self) -> Vec<String> {
        match self.contracts.read() {
            Ok(contracts) => contracts
                .iter()
                .filter(|(_, weak)| weak.strong_count() > 0)
                .map(|(name, _)| name.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Invokes `function` on `contract`, turning an error response into
    /// [`LedgerError::Chaincode`]
    pub async fn invoke(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        let target = self.resolve(contract)?;
        target
            .invoke(function, args)
            .await
            .into_result()
            .map_err(|failure| LedgerError::Chaincode {
                contract: contract.to_string(),
                kind: failure.kind,
                message: failure.message,
            })
    }
}

impl fmt::Debug for ChaincodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaincodeRegistry")
            .field("contracts", &self.names())
            .finish()
    }
}
