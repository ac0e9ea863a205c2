//! Claims Settlement Engine
//!
//! Settling a claim pays the policy's insured amount from the insurer's
//! first account into the farmer's first account and marks the policy
//! `Claimed`. All checks run before anything is written, and the three
//! changed documents are committed as one write set whose expectations are
//! the exact bytes read during the checks.
//!
//! # Concurrency
//!
//! Two settlements of the same policy race on the policy document; the
//! loser's expectation fails and it writes nothing. This only holds on a
//! ledger whose [`LedgerClient::supports_atomic_commit`] is true. On any
//! other ledger callers must serialize `claim_policy` per policy, and a
//! commit that fails midway is reported as
//! [`LedgerError::PartialCommit`] (classified `Inconsistent`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use core_kernel::{
    encode_document, LedgerClient, LedgerError, OperationMetadata, PolicyId, Timezone, UserId,
    WriteSet,
};
use domain_identity::{IdentityError, ResolvedUser, UserDirectory, UserDirectoryExt, UserType};
use domain_policy::{PolicyRegistry, PolicyStatus, StoredPolicy};

use crate::eligibility::ClaimWindow;
use crate::error::ClaimsError;
use crate::transfer::transfer;

/// Settlement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub window: ClaimWindow,
    /// Timezone in which "today" is taken
    pub timezone: Timezone,
    /// Lets an insurer's balance go below zero
    pub allow_negative_balance: bool,
}

/// What a successful settlement changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub policy_id: PolicyId,
    pub status: PolicyStatus,
    pub farmer_id: UserId,
    pub farmer_account_number: i64,
    pub farmer_balance: Decimal,
    pub insurer_id: UserId,
    pub insurer_account_number: i64,
    pub insurer_balance: Decimal,
    pub amount_transferred: Decimal,
    pub settlement_date: NaiveDate,
}

#[derive(Clone)]
pub struct ClaimsSettlementEngine {
    ledger: Arc<dyn LedgerClient>,
    policies: PolicyRegistry,
    directory: Arc<dyn UserDirectory>,
    config: SettlementConfig,
}

impl ClaimsSettlementEngine {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        policies: PolicyRegistry,
        directory: Arc<dyn UserDirectory>,
        config: SettlementConfig,
    ) -> Self {
        if !ledger.supports_atomic_commit() {
            warn!(
                directory = directory.directory_name(),
                "Ledger commits are not atomic; claims must be serialized per policy"
            );
        }
        Self {
            ledger,
            policies,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settles a claim as of today in the configured timezone
    pub async fn claim_policy(&self, policy_id: &PolicyId) -> Result<SettlementResult, ClaimsError> {
        let today = self.config.timezone.today();
        self.claim_policy_on(policy_id, today, None).await
    }

    /// Settles a claim as of `today`
    ///
    /// # Errors
    ///
    /// - `Policy(NotFound)` if the policy does not exist
    /// - `AlreadyClaimed` / `NotClaimable` for terminal policies
    /// - `Directory` if either party cannot be resolved
    /// - `Identity` if a party has the wrong type or no account
    /// - `NotEligible` outside the claim window
    /// - `InsufficientFunds` if the insurer cannot pay
    /// - `ConcurrentModification` if a document changed since it was read
    /// - `Ledger(PartialCommit)` if a non-atomic commit stopped midway
    pub async fn claim_policy_on(
        &self,
        policy_id: &PolicyId,
        today: NaiveDate,
        metadata: Option<OperationMetadata>,
    ) -> Result<SettlementResult, ClaimsError> {
        let StoredPolicy { policy, raw: policy_raw } = self.policies.fetch_stored(policy_id).await?;

        match policy.status {
            PolicyStatus::Claimed => {
                warn!(policy_id = %policy_id, "Claim rejected: policy already claimed");
                return Err(ClaimsError::AlreadyClaimed(policy_id.to_string()));
            }
            status if status.is_terminal() => {
                warn!(policy_id = %policy_id, status = %status, "Claim rejected: policy is terminal");
                return Err(ClaimsError::NotClaimable {
                    policy_id: policy_id.to_string(),
                    status,
                });
            }
            _ => {}
        }

        let farmer = self
            .resolve(&policy.farmer_id, UserType::Farmer, metadata.clone())
            .await?;
        let insurer = self
            .resolve(&policy.insurer_id, UserType::Insurer, metadata)
            .await?;

        let eligibility = self.config.window.evaluate(&policy, today);
        if !eligibility.eligible {
            warn!(
                policy_id = %policy_id,
                rule = %self.config.window.rule,
                checked = %eligibility.checked,
                window = %eligibility.window,
                "Claim rejected: outside claim window"
            );
            return Err(ClaimsError::NotEligible {
                policy_id: policy_id.to_string(),
                checked: eligibility.checked,
                window: eligibility.window,
            });
        }

        let ResolvedUser { user: mut farmer_user, raw: farmer_raw } = farmer;
        let ResolvedUser { user: mut insurer_user, raw: insurer_raw } = insurer;
        let amount = policy.amount_insured;
        let payee = farmer_user
            .primary_account_mut()
            .ok_or_else(|| IdentityError::NoAccount(policy.farmer_id.to_string()))?;
        let payer = insurer_user
            .primary_account_mut()
            .ok_or_else(|| IdentityError::NoAccount(policy.insurer_id.to_string()))?;
        let farmer_account_number = payee.account_number;
        let insurer_account_number = payer.account_number;
        let outcome = transfer(payer, payee, amount, self.config.allow_negative_balance)?;

        let claimed = policy.with_status(PolicyStatus::Claimed);
        let write_set = WriteSet::new()
            .expect_value(policy_id.as_str(), policy_raw)
            .expect_value(farmer_user.user_id.as_str(), farmer_raw)
            .expect_value(insurer_user.user_id.as_str(), insurer_raw)
            .put(policy_id.as_str(), encode_document(&claimed)?)
            .put(farmer_user.user_id.as_str(), encode_document(&farmer_user)?)
            .put(insurer_user.user_id.as_str(), encode_document(&insurer_user)?);

        debug!(policy_id = %policy_id, keys = ?write_set.keys(), "Committing settlement");
        match self.ledger.commit(write_set).await {
            Ok(()) => {}
            Err(LedgerError::Conflict { key }) => {
                warn!(policy_id = %policy_id, key = %key, "Settlement lost a concurrent update");
                return Err(ClaimsError::ConcurrentModification {
                    policy_id: policy_id.to_string(),
                    key,
                });
            }
            Err(e) => {
                if e.is_partial_commit() {
                    error!(policy_id = %policy_id, error = %e, "Settlement left the ledger inconsistent");
                }
                return Err(e.into());
            }
        }

        let result = SettlementResult {
            policy_id: policy_id.clone(),
            status: claimed.status,
            farmer_id: farmer_user.user_id,
            farmer_account_number,
            farmer_balance: outcome.payee_balance,
            insurer_id: insurer_user.user_id,
            insurer_account_number,
            insurer_balance: outcome.payer_balance,
            amount_transferred: amount,
            settlement_date: today,
        };
        info!(
            policy_id = %policy_id,
            farmer_id = %result.farmer_id,
            insurer_id = %result.insurer_id,
            amount = %amount,
            "Claim settled"
        );
        Ok(result)
    }

    async fn resolve(
        &self,
        user_id: &UserId,
        expected: UserType,
        metadata: Option<OperationMetadata>,
    ) -> Result<ResolvedUser, ClaimsError> {
        let resolved = self.directory.fetch_user(user_id, metadata).await?;
        resolved.user.require_type(expected)?;
        if resolved.user.primary_account().is_none() {
            return Err(IdentityError::NoAccount(user_id.to_string()).into());
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for ClaimsSettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsSettlementEngine")
            .field("directory", &self.directory.directory_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
