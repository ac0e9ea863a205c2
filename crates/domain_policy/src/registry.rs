//! Policy Registry
//!
//! Issues policies, answers policy queries, and overwrites status on
//! request. Status transitions are not validated here; the settlement
//! engine owns the lifecycle rules.

use std::sync::Arc;
use tracing::{debug, info, warn};

use core_kernel::{
    decode_document, encode_document, Filter, LedgerClient, LedgerError, PolicyId, QueryFacade,
    UserId, WriteSet, INDEX_SENTINEL,
};

use crate::error::PolicyError;
use crate::issuance::parse_policy;
use crate::policy::{Policy, PolicyStatus};

/// Name of the secondary index written at issue
pub const POLICY_FARMER_INDEX: &str = "policyId~farmerId";

/// A policy together with the exact bytes it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPolicy {
    pub policy: Policy,
    pub raw: Vec<u8>,
}

#[derive(Clone)]
pub struct PolicyRegistry {
    ledger: Arc<dyn LedgerClient>,
    query: QueryFacade,
    default_insurer: Option<UserId>,
}

impl PolicyRegistry {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        let query = QueryFacade::new(ledger.clone());
        Self {
            ledger,
            query,
            default_insurer: None,
        }
    }

    /// Insurer assigned when `newPolicy` omits one
    pub fn with_default_insurer(mut self, insurer: Option<UserId>) -> Self {
        self.default_insurer = insurer;
        self
    }

    pub fn default_insurer(&self) -> Option<&UserId> {
        self.default_insurer.as_ref()
    }

    /// Parses positional fields and issues the policy
    pub async fn create_policy(&self, args: &[String]) -> Result<PolicyId, PolicyError> {
        let policy = parse_policy(args, self.default_insurer.as_ref())?;
        self.create(policy).await
    }

    /// Stores a new policy and its `policyId~farmerId` index entry
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the policy id has any ledger entry.
    pub async fn create(&self, policy: Policy) -> Result<PolicyId, PolicyError> {
        let policy_id = policy.policy_id.clone();
        if self.ledger.get_state(policy_id.as_str()).await?.is_some() {
            warn!(policy_id = %policy_id, "Policy rejected: id already taken");
            return Err(PolicyError::AlreadyExists(policy_id.to_string()));
        }

        let document = encode_document(&policy)?;
        let index_key = self.ledger.create_composite_key(
            POLICY_FARMER_INDEX,
            &[policy_id.as_str(), policy.farmer_id.as_str()],
        )?;
        let write_set = WriteSet::new()
            .expect_absent(policy_id.as_str())
            .put(policy_id.as_str(), document)
            .put(index_key, INDEX_SENTINEL);

        match self.ledger.commit(write_set).await {
            Ok(()) => {}
            Err(LedgerError::Conflict { .. }) => {
                warn!(policy_id = %policy_id, "Policy creation lost a race for the id");
                return Err(PolicyError::AlreadyExists(policy_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            policy_id = %policy_id,
            farmer_id = %policy.farmer_id,
            insurer_id = %policy.insurer_id,
            amount_insured = %policy.amount_insured,
            "Issued policy"
        );
        Ok(policy_id)
    }

    /// The policy and the bytes it was stored as
    pub async fn fetch_stored(&self, policy_id: &PolicyId) -> Result<StoredPolicy, PolicyError> {
        let raw = self
            .ledger
            .get_state(policy_id.as_str())
            .await?
            .ok_or_else(|| PolicyError::not_found(policy_id))?;
        let policy = decode_document::<Policy>(policy_id.as_str(), &raw)?
            .ok_or_else(|| PolicyError::not_found(policy_id))?;
        Ok(StoredPolicy { policy, raw })
    }

    pub async fn fetch_policy(&self, policy_id: &PolicyId) -> Result<Policy, PolicyError> {
        Ok(self.fetch_stored(policy_id).await?.policy)
    }

    pub async fn fetch_policy_raw(&self, policy_id: &PolicyId) -> Result<Vec<u8>, PolicyError> {
        Ok(self.fetch_stored(policy_id).await?.raw)
    }

    pub async fn fetch_policies_by_status(&self, status: PolicyStatus) -> Result<Vec<Policy>, PolicyError> {
        debug!(status = %status, "Fetching policies by status");
        Ok(self.query.documents::<Policy>(&status_filter(status)).await?)
    }

    pub async fn fetch_policies_by_status_raw(&self, status: PolicyStatus) -> Result<Vec<u8>, PolicyError> {
        Ok(self.query.raw(&status_filter(status)).await?)
    }

    pub async fn fetch_policies_by_farmer(&self, farmer_id: &UserId) -> Result<Vec<Policy>, PolicyError> {
        debug!(farmer_id = %farmer_id, "Fetching policies by farmer");
        Ok(self.query.documents::<Policy>(&farmer_filter(farmer_id)).await?)
    }

    pub async fn fetch_policies_by_farmer_raw(&self, farmer_id: &UserId) -> Result<Vec<u8>, PolicyError> {
        Ok(self.query.raw(&farmer_filter(farmer_id)).await?)
    }

    /// Every policy on the ledger
    pub async fn fetch_all_policies(&self) -> Result<Vec<Policy>, PolicyError> {
        Ok(self.query.documents::<Policy>(&Filter::documents::<Policy>()).await?)
    }

    pub async fn fetch_all_policies_raw(&self) -> Result<Vec<u8>, PolicyError> {
        Ok(self.query.raw(&Filter::documents::<Policy>()).await?)
    }

    /// Overwrites the status of an existing policy
    ///
    /// No transition check is made: any status may replace any other.
    pub async fn update_status(
        &self,
        policy_id: &PolicyId,
        status: PolicyStatus,
    ) -> Result<Policy, PolicyError> {
        let current = self.fetch_policy(policy_id).await?;
        let updated = current.with_status(status);
        self.ledger
            .put_state(policy_id.as_str(), encode_document(&updated)?)
            .await?;
        info!(
            policy_id = %policy_id,
            from = %current.status,
            to = %status,
            "Updated policy status"
        );
        Ok(updated)
    }
}

fn status_filter(status: PolicyStatus) -> Filter {
    Filter::documents::<Policy>().field("status", status.as_str())
}

fn farmer_filter(farmer_id: &UserId) -> Filter {
    Filter::documents::<Policy>().field("farmerId", farmer_id.as_str())
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("default_insurer", &self.default_insurer)
            .finish_non_exhaustive()
    }
}
