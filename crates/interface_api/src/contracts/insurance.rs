//! Insurance contract
//!
//! Issues and updates policies through the Policy Registry and settles
//! claims through the settlement engine. Every claim runs under fresh
//! operation metadata so its log lines share one transaction id.

use async_trait::async_trait;
use tracing::debug;

use core_kernel::{encode_document, Chaincode, ContractResponse, OperationMetadata, PolicyId, UserId};
use domain_claims::ClaimsSettlementEngine;
use domain_policy::{PolicyRegistry, PolicyStatus};

use super::error::{expect_args, ContractError};

pub const NEW_POLICY: &str = "newPolicy";
pub const UPDATE_STATUS: &str = "updateInsuranceStatus";
pub const FETCH_BY_STATUS: &str = "fetchInsuranceByStatus";
pub const FETCH_BY_POLICY: &str = "fetchInsuranceByPolicyID";
pub const FETCH_BY_FARMER: &str = "fetchInsuranceByFarmerID";
pub const FETCH_ALL: &str = "fetchAllInsurance";
pub const CLAIM: &str = "claimInsurance";

const FUNCTIONS: &[&str] = &[
    NEW_POLICY,
    UPDATE_STATUS,
    FETCH_BY_STATUS,
    FETCH_BY_POLICY,
    FETCH_BY_FARMER,
    FETCH_ALL,
    CLAIM,
];

pub struct InsuranceContract {
    name: String,
    policies: PolicyRegistry,
    engine: ClaimsSettlementEngine,
}

impl InsuranceContract {
    pub fn new(
        name: impl Into<String>,
        policies: PolicyRegistry,
        engine: ClaimsSettlementEngine,
    ) -> Self {
        Self {
            name: name.into(),
            policies,
            engine,
        }
    }

    async fn dispatch(&self, function: &str, args: &[String]) -> Result<Vec<u8>, ContractError> {
        match function {
            NEW_POLICY => {
                let policy_id = self.policies.create_policy(args).await?;
                Ok(serde_json::to_vec(&serde_json::json!({ "policyId": policy_id }))?)
            }
            UPDATE_STATUS => {
                let [policy_id, status] = expect_args(function, args)?;
                let status: PolicyStatus = status.parse()?;
                let policy = self
                    .policies
                    .update_status(&PolicyId::new(policy_id)?, status)
                    .await?;
                Ok(encode_document(&policy)?)
            }
            FETCH_BY_STATUS => {
                let [status] = expect_args(function, args)?;
                let status: PolicyStatus = status.parse()?;
                Ok(self.policies.fetch_policies_by_status_raw(status).await?)
            }
            FETCH_BY_POLICY => {
                let [policy_id] = expect_args(function, args)?;
                Ok(self.policies.fetch_policy_raw(&PolicyId::new(policy_id)?).await?)
            }
            FETCH_BY_FARMER => {
                let [farmer_id] = expect_args(function, args)?;
                Ok(self
                    .policies
                    .fetch_policies_by_farmer_raw(&UserId::new(farmer_id)?)
                    .await?)
            }
            FETCH_ALL => {
                let [] = expect_args(function, args)?;
                Ok(self.policies.fetch_all_policies_raw().await?)
            }
            CLAIM => {
                let [policy_id] = expect_args(function, args)?;
                let policy_id = PolicyId::new(policy_id)?;
                let today = self.engine.config().timezone.today();
                let metadata = OperationMetadata::for_contract(self.name.clone());
                let result = self
                    .engine
                    .claim_policy_on(&policy_id, today, Some(metadata))
                    .await?;
                Ok(serde_json::to_vec(&result)?)
            }
            other => Err(ContractError::unknown_function(&self.name, other)),
        }
    }
}

impl std::fmt::Debug for InsuranceContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsuranceContract")
            .field("name", &self.name)
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Chaincode for InsuranceContract {
    fn name(&self) -> &str {
        &self.name
    }

    fn functions(&self) -> &'static [&'static str] {
        FUNCTIONS
    }

    async fn invoke(&self, function: &str, args: &[String]) -> ContractResponse {
        debug!(contract = %self.name, function, args = args.len(), "Invoking insurance contract");
        match self.dispatch(function, args).await {
            Ok(payload) => ContractResponse::Success(payload),
            Err(err) => ContractResponse::error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ErrorKind;
    use domain_claims::SettlementConfig;
    use std::sync::Arc;
    use test_utils::{LedgerScenario, PolicyFixtures, TemporalFixtures, TestUserBuilder};

    fn contract(scenario: &LedgerScenario) -> InsuranceContract {
        let engine = ClaimsSettlementEngine::new(
            scenario.ledger.clone(),
            scenario.policies.clone(),
            Arc::new(scenario.identity.clone()),
            SettlementConfig::default(),
        );
        InsuranceContract::new("insuranceCC", scenario.policies.clone(), engine)
    }

    #[tokio::test]
    async fn test_new_policy_and_lookup() {
        let scenario = LedgerScenario::new()
            .with_user(TestUserBuilder::farmer("F1").build())
            .await;
        let contract = contract(&scenario);

        let args = PolicyFixtures::policy_args_with_insurer(
            "P1",
            "F1",
            "I1",
            "200",
            TemporalFixtures::start_in_window(),
            TemporalFixtures::expiry(),
        );
        let payload = contract.invoke(NEW_POLICY, &args).await.into_result().unwrap();
        assert_eq!(payload, br#"{"policyId":"P1"}"#.to_vec());

        let raw = contract
            .invoke(FETCH_BY_POLICY, &["P1".to_string()])
            .await
            .into_result()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["status"], "New");
        assert_eq!(value["startDate"], "2024-05-15");
    }

    #[tokio::test]
    async fn test_update_status_returns_document() {
        let scenario = LedgerScenario::standard().await;
        let contract = contract(&scenario);

        let raw = contract
            .invoke(UPDATE_STATUS, &["P1".to_string(), "active".to_string()])
            .await
            .into_result()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["docType"], "policy");
        assert_eq!(value["status"], "Active");
        assert_eq!(scenario.status("P1").await, PolicyStatus::Active);
    }

    #[tokio::test]
    async fn test_status_queries_use_record_shape() {
        let scenario = LedgerScenario::standard().await;
        let contract = contract(&scenario);

        let raw = contract
            .invoke(FETCH_BY_STATUS, &["New".to_string()])
            .await
            .into_result()
            .unwrap();
        let records: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(records[0]["Key"], "P1");
        assert_eq!(records[0]["Record"]["farmerId"], "F1");

        let all = contract.invoke(FETCH_ALL, &[]).await.into_result().unwrap();
        let all: serde_json::Value = serde_json::from_slice(&all).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_argument_errors() {
        let scenario = LedgerScenario::standard().await;
        let contract = contract(&scenario);

        let failure = contract
            .invoke(FETCH_ALL, &["extra".to_string()])
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::InvalidArgument);

        let failure = contract
            .invoke(UPDATE_STATUS, &["P1".to_string(), "Lapsed".to_string()])
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(failure.kind, ErrorKind::InvalidArgument);
    }
}
