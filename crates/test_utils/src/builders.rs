//! Test Data Builders
//!
//! Builders construct users and policies with sensible defaults, and
//! [`LedgerScenario`] seeds an in-memory ledger with them, including
//! opening balances that registration never sets.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{encode_document, FarmId, GeoCoordinates, LedgerClient, PolicyId, UserId};
use domain_identity::{Account, Crop, Farm, IdentityRegistry, User, UserType};
use domain_policy::{CropSnapshot, FarmSnapshot, Policy, PolicyRegistry, PolicyStatus};
use infra_ledger::InMemoryLedger;

use crate::fixtures::TemporalFixtures;

fn coordinates() -> GeoCoordinates {
    GeoCoordinates::new(dec!(12.7409), dec!(77.8253)).unwrap()
}

/// Builder for user documents
pub struct TestUserBuilder {
    user_id: String,
    user_type: UserType,
    full_name: String,
    accounts: Vec<Account>,
}

impl TestUserBuilder {
    pub fn farmer(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_type: UserType::Farmer,
            full_name: format!("Farmer {}", user_id),
            accounts: vec![Account::open(100_200_300, "Canara Bank")],
        }
    }

    pub fn insurer(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_type: UserType::Insurer,
            full_name: format!("Insurer {}", user_id),
            accounts: vec![Account::open(4001, "State Bank")],
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = name.into();
        self
    }

    /// Sets the balance of the first account
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        if let Some(account) = self.accounts.first_mut() {
            account.balance = balance;
        }
        self
    }

    pub fn with_account_number(mut self, number: i64) -> Self {
        if let Some(account) = self.accounts.first_mut() {
            account.account_number = number;
        }
        self
    }

    pub fn without_accounts(mut self) -> Self {
        self.accounts.clear();
        self
    }

    pub fn build(self) -> User {
        let farms = match self.user_type {
            UserType::Farmer => vec![Farm {
                farm_id: FarmId::new("FARM1").unwrap(),
                address: "Plot 7, Hosur".to_string(),
                coordinates: coordinates(),
                crops: vec![Crop {
                    name: "Ragi".to_string(),
                    crop_type: "Millet".to_string(),
                    season: "Kharif".to_string(),
                    state: "Sown".to_string(),
                }],
            }],
            UserType::Insurer => Vec::new(),
        };
        User {
            user_id: UserId::new(self.user_id).unwrap(),
            user_type: self.user_type,
            full_name: self.full_name,
            home_address: "Hosur Village".to_string(),
            phone: 9_876_543_210,
            email: "user@example.com".to_string(),
            farms,
            accounts: self.accounts,
        }
    }
}

/// Builder for policy documents
pub struct TestPolicyBuilder {
    policy_id: String,
    farmer_id: String,
    insurer_id: String,
    status: PolicyStatus,
    start_date: NaiveDate,
    expiry_date: NaiveDate,
    amount_insured: Decimal,
}

impl TestPolicyBuilder {
    pub fn new(policy_id: &str, farmer_id: &str, insurer_id: &str) -> Self {
        Self {
            policy_id: policy_id.to_string(),
            farmer_id: farmer_id.to_string(),
            insurer_id: insurer_id.to_string(),
            status: PolicyStatus::New,
            start_date: TemporalFixtures::start_in_window(),
            expiry_date: TemporalFixtures::expiry(),
            amount_insured: dec!(200),
        }
    }

    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    pub fn with_expiry_date(mut self, date: NaiveDate) -> Self {
        self.expiry_date = date;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount_insured = amount;
        self
    }

    pub fn build(self) -> Policy {
        Policy {
            policy_id: PolicyId::new(self.policy_id).unwrap(),
            farmer_id: UserId::new(self.farmer_id).unwrap(),
            insurer_id: UserId::new(self.insurer_id).unwrap(),
            status: self.status,
            start_date: self.start_date,
            expiry_date: self.expiry_date,
            farm_details: FarmSnapshot {
                address: "Plot 7, Hosur".to_string(),
                coordinates: coordinates(),
            },
            crop_details: CropSnapshot {
                name: "Ragi".to_string(),
                crop_type: "Millet".to_string(),
                season: "Kharif".to_string(),
            },
            amount_insured: self.amount_insured,
        }
    }
}

/// An in-memory ledger seeded with users and policies
pub struct LedgerScenario {
    pub ledger: Arc<InMemoryLedger>,
    pub identity: IdentityRegistry,
    pub policies: PolicyRegistry,
}

impl LedgerScenario {
    pub fn new() -> Self {
        Self::on(Arc::new(InMemoryLedger::new()))
    }

    pub fn on(ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            identity: IdentityRegistry::new(ledger.clone()),
            policies: PolicyRegistry::new(ledger.clone()),
            ledger,
        }
    }

    /// The settlement setup used across the suite: farmer `F1` at 0,
    /// insurer `I1` at 1000, and policy `P1` for 200 starting in window
    pub async fn standard() -> Self {
        Self::new()
            .with_user(TestUserBuilder::farmer("F1").build())
            .await
            .with_user(TestUserBuilder::insurer("I1").with_balance(dec!(1000)).build())
            .await
            .with_policy(TestPolicyBuilder::new("P1", "F1", "I1").build())
            .await
    }

    /// Stores `user` through the registry's administrative save, balances included
    pub async fn with_user(self, user: User) -> Self {
        self.identity.save_user(&user).await.unwrap();
        self
    }

    pub async fn with_policy(self, policy: Policy) -> Self {
        self.ledger
            .put_state(policy.policy_id.as_str(), encode_document(&policy).unwrap())
            .await
            .unwrap();
        self
    }

    /// Balance of the first account of `user_id`
    pub async fn balance(&self, user_id: &str) -> Decimal {
        let user = self
            .identity
            .fetch_user(&UserId::new(user_id).unwrap())
            .await
            .unwrap();
        user.accounts[0].balance
    }

    pub async fn status(&self, policy_id: &str) -> PolicyStatus {
        self.policies
            .fetch_policy(&PolicyId::new(policy_id).unwrap())
            .await
            .unwrap()
            .status
    }
}

impl Default for LedgerScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_standard_scenario() {
        let scenario = LedgerScenario::standard().await;
        assert_eq!(scenario.balance("F1").await, Decimal::ZERO);
        assert_eq!(scenario.balance("I1").await, dec!(1000));
        assert_eq!(scenario.status("P1").await, PolicyStatus::New);
    }

    #[tokio::test]
    async fn test_seeded_user_keeps_opening_balance() {
        let scenario = LedgerScenario::new()
            .with_user(TestUserBuilder::insurer("I9").with_balance(dec!(250.50)).build())
            .await;
        let accounts = scenario
            .identity
            .fetch_accounts_by_user(&UserId::new("I9").unwrap())
            .await
            .unwrap();
        assert_eq!(accounts[0].balance, dec!(250.50));
        assert!(scenario.ledger.get_state("I9").await.unwrap().is_some());
    }

    #[test]
    fn test_user_builder_types() {
        assert!(TestUserBuilder::farmer("F1").build().is_farmer());
        let insurer = TestUserBuilder::insurer("I1").build();
        assert!(insurer.is_insurer());
        assert!(insurer.farms.is_empty());
        assert!(TestUserBuilder::insurer("I2").without_accounts().build().accounts.is_empty());
    }
}
