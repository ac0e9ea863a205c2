//! Cross-contract user directory
//!
//! Resolves users by invoking `fetchUserDataByUserID` on the users contract.
//! The contract returns the stored document bytes unchanged, so they can
//! serve as write-set expectations just like a local read.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use core_kernel::{
    DomainPort, ErrorKind, LedgerClient, LedgerError, OperationMetadata, PortError, UserId,
};

use crate::ports::UserDirectory;

/// Function called on the users contract
pub const FETCH_USER_FUNCTION: &str = "fetchUserDataByUserID";

/// User directory backed by another contract
#[derive(Clone)]
pub struct ChaincodeUserDirectory {
    ledger: Arc<dyn LedgerClient>,
    contract: String,
}

impl ChaincodeUserDirectory {
    pub fn new(ledger: Arc<dyn LedgerClient>, contract: impl Into<String>) -> Self {
        Self {
            ledger,
            contract: contract.into(),
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }
}

impl std::fmt::Debug for ChaincodeUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaincodeUserDirectory")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

impl DomainPort for ChaincodeUserDirectory {}

#[async_trait]
impl UserDirectory for ChaincodeUserDirectory {
    async fn fetch_user_raw(
        &self,
        user_id: &UserId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<u8>, PortError> {
        debug!(
            contract = %self.contract,
            user_id = %user_id,
            transaction_id = ?metadata.as_ref().and_then(|m| m.transaction_id),
            "Resolving user through contract"
        );
        self.ledger
            .invoke_chaincode(&self.contract, FETCH_USER_FUNCTION, &[user_id.to_string()])
            .await
            .map_err(|e| match e {
                LedgerError::Chaincode {
                    kind: ErrorKind::NotFound,
                    ..
                } => PortError::not_found("User", user_id),
                other => PortError::upstream(other),
            })
    }

    fn directory_name(&self) -> &'static str {
        "chaincode"
    }
}
