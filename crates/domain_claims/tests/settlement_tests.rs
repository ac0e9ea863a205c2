//! Claims settlement tests
//!
//! Run against the in-memory ledger, with [`FlakyLedger`] for concurrent
//! writes and partial commits.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{encode_document, Classify, ErrorKind, LedgerClient, PolicyId};
use domain_claims::{
    ClaimWindow, ClaimsError, ClaimsSettlementEngine, EligibilityRule, SettlementConfig,
};
use domain_identity::ports::mock::MockUserDirectory;
use domain_identity::{IdentityRegistry, UserDirectory};
use domain_policy::{PolicyRegistry, PolicyStatus};
use test_utils::{
    assert_error_kind, assert_world_state_unchanged, FlakyLedger, LedgerScenario,
    TemporalFixtures, TestPolicyBuilder, TestUserBuilder,
};

fn engine_on(ledger: Arc<dyn LedgerClient>, config: SettlementConfig) -> ClaimsSettlementEngine {
    let policies = PolicyRegistry::new(ledger.clone());
    let directory: Arc<dyn UserDirectory> = Arc::new(IdentityRegistry::new(ledger.clone()));
    ClaimsSettlementEngine::new(ledger, policies, directory, config)
}

fn engine(scenario: &LedgerScenario) -> ClaimsSettlementEngine {
    engine_on(scenario.ledger.clone(), SettlementConfig::default())
}

fn p1() -> PolicyId {
    PolicyId::new("P1").unwrap()
}

mod settlement {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_claim_moves_funds() {
        let scenario = LedgerScenario::standard().await;
        let today = TemporalFixtures::today();

        let result = engine(&scenario).claim_policy_on(&p1(), today, None).await.unwrap();

        assert_eq!(result.status, PolicyStatus::Claimed);
        assert_eq!(result.farmer_balance, dec!(200));
        assert_eq!(result.insurer_balance, dec!(800));
        assert_eq!(result.amount_transferred, dec!(200));
        assert_eq!(result.farmer_account_number, 100_200_300);
        assert_eq!(result.insurer_account_number, 4001);
        assert_eq!(result.settlement_date, today);

        assert_eq!(scenario.status("P1").await, PolicyStatus::Claimed);
        assert_eq!(scenario.balance("F1").await, dec!(200));
        assert_eq!(scenario.balance("I1").await, dec!(800));
    }

    #[tokio::test]
    async fn test_active_policy_is_claimable() {
        let scenario = LedgerScenario::new()
            .with_user(TestUserBuilder::farmer("F1").build())
            .await
            .with_user(TestUserBuilder::insurer("I1").with_balance(dec!(500)).build())
            .await
            .with_policy(
                TestPolicyBuilder::new("P1", "F1", "I1")
                    .with_status(PolicyStatus::Active)
                    .build(),
            )
            .await;
        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await
            .unwrap();
        assert_eq!(result.insurer_balance, dec!(300));
    }

    #[tokio::test]
    async fn test_result_serializes_camel_case() {
        let scenario = LedgerScenario::standard().await;
        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["policyId"], "P1");
        assert_eq!(json["status"], "Claimed");
        assert_eq!(json["farmerBalance"], "200");
    }
}

mod rejections {
    use super::*;

    #[tokio::test]
    async fn test_second_claim_is_invalid_state() {
        let scenario = LedgerScenario::standard().await;
        let engine = engine(&scenario);
        let today = TemporalFixtures::today();
        engine.claim_policy_on(&p1(), today, None).await.unwrap();
        let before = scenario.ledger.snapshot().await;

        let second = engine.claim_policy_on(&p1(), today, None).await;
        assert!(matches!(second, Err(ClaimsError::AlreadyClaimed(_))));
        assert_error_kind(&second, ErrorKind::InvalidState);
        assert_world_state_unchanged(&before, &scenario.ledger.snapshot().await);
    }

    #[tokio::test]
    async fn test_expired_policy_is_terminal() {
        let scenario = LedgerScenario::standard()
            .await
            .with_policy(
                TestPolicyBuilder::new("P1", "F1", "I1")
                    .with_status(PolicyStatus::Expired)
                    .build(),
            )
            .await;
        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert!(matches!(result, Err(ClaimsError::NotClaimable { .. })));
        assert_error_kind(&result, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_outside_window_writes_nothing() {
        let scenario = LedgerScenario::standard()
            .await
            .with_policy(
                TestPolicyBuilder::new("P1", "F1", "I1")
                    .with_start_date(TemporalFixtures::start_after_window())
                    .build(),
            )
            .await;
        let before = scenario.ledger.snapshot().await;

        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert_error_kind(&result, ErrorKind::NotEligible);
        assert_world_state_unchanged(&before, &scenario.ledger.snapshot().await);
    }

    #[tokio::test]
    async fn test_policy_term_rule_uses_expiry() {
        let scenario = LedgerScenario::standard()
            .await
            .with_policy(
                TestPolicyBuilder::new("P1", "F1", "I1")
                    .with_start_date(TemporalFixtures::start_after_window())
                    .with_expiry_date(TemporalFixtures::expiry())
                    .build(),
            )
            .await;
        let config = SettlementConfig {
            window: ClaimWindow::new(EligibilityRule::PolicyTerm, 2),
            ..SettlementConfig::default()
        };
        let engine = engine_on(scenario.ledger.clone(), config);

        // today precedes the term's start
        let early = engine.claim_policy_on(&p1(), TemporalFixtures::today(), None).await;
        assert_error_kind(&early, ErrorKind::NotEligible);

        let inside = TemporalFixtures::start_after_window() + chrono::Duration::days(1);
        assert!(engine.claim_policy_on(&p1(), inside, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let scenario = LedgerScenario::standard()
            .await
            .with_user(TestUserBuilder::insurer("I1").with_balance(dec!(150)).build())
            .await;
        let before = scenario.ledger.snapshot().await;

        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert!(matches!(result, Err(ClaimsError::InsufficientFunds { .. })));
        assert_error_kind(&result, ErrorKind::InvalidState);
        assert_world_state_unchanged(&before, &scenario.ledger.snapshot().await);
    }

    #[tokio::test]
    async fn test_negative_balance_when_allowed() {
        let scenario = LedgerScenario::standard()
            .await
            .with_user(TestUserBuilder::insurer("I1").with_balance(dec!(150)).build())
            .await;
        let config = SettlementConfig {
            allow_negative_balance: true,
            ..SettlementConfig::default()
        };
        let result = engine_on(scenario.ledger.clone(), config)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await
            .unwrap();
        assert_eq!(result.insurer_balance, dec!(-50));
    }

    #[tokio::test]
    async fn test_insurer_must_be_an_insurer() {
        let scenario = LedgerScenario::standard()
            .await
            .with_user(TestUserBuilder::farmer("F2").with_balance(dec!(1000)).build())
            .await
            .with_policy(TestPolicyBuilder::new("P1", "F1", "F2").build())
            .await;
        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert!(matches!(result, Err(ClaimsError::Identity(_))));
        assert_error_kind(&result, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_party_without_account() {
        let scenario = LedgerScenario::standard()
            .await
            .with_user(TestUserBuilder::farmer("F1").without_accounts().build())
            .await;
        let result = engine(&scenario)
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert_error_kind(&result, ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_missing_policy_and_missing_farmer() {
        let scenario = LedgerScenario::standard().await;
        let engine = engine(&scenario);
        let today = TemporalFixtures::today();

        let missing = engine
            .claim_policy_on(&PolicyId::new("P9").unwrap(), today, None)
            .await;
        assert_error_kind(&missing, ErrorKind::NotFound);

        scenario
            .policies
            .create(TestPolicyBuilder::new("P2", "F9", "I1").build())
            .await
            .unwrap();
        let orphan = engine
            .claim_policy_on(&PolicyId::new("P2").unwrap(), today, None)
            .await;
        assert!(matches!(orphan, Err(ClaimsError::Directory(_))));
        assert_error_kind(&orphan, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_terminal_policy_skips_user_lookups() {
        let scenario = LedgerScenario::standard()
            .await
            .with_policy(
                TestPolicyBuilder::new("P1", "F1", "I1")
                    .with_status(PolicyStatus::Claimed)
                    .build(),
            )
            .await;
        let directory = Arc::new(MockUserDirectory::new());
        let ledger: Arc<dyn LedgerClient> = scenario.ledger.clone();
        let engine = ClaimsSettlementEngine::new(
            ledger.clone(),
            PolicyRegistry::new(ledger),
            directory.clone(),
            SettlementConfig::default(),
        );
        let _ = engine.claim_policy_on(&p1(), TemporalFixtures::today(), None).await;
        assert_eq!(directory.lookups(), 0);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_change_to_insurer_aborts_settlement() {
        let scenario = LedgerScenario::standard().await;
        let flaky = Arc::new(FlakyLedger::atomic(scenario.ledger.clone()));
        let topped_up = TestUserBuilder::insurer("I1").with_balance(dec!(5000)).build();
        flaky.interleave_write("I1", encode_document(&topped_up).unwrap());

        let result = engine_on(flaky.clone(), SettlementConfig::default())
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert!(matches!(
            result,
            Err(ClaimsError::ConcurrentModification { ref key, .. }) if key == "I1"
        ));
        assert_error_kind(&result, ErrorKind::UpstreamFailure);

        assert_eq!(scenario.status("P1").await, PolicyStatus::New);
        assert_eq!(scenario.balance("F1").await, Decimal::ZERO);
        assert_eq!(scenario.balance("I1").await, dec!(5000));
    }

    #[tokio::test]
    async fn test_parallel_claims_settle_once() {
        let scenario = LedgerScenario::standard().await;
        let engine = engine(&scenario);
        let today = TemporalFixtures::today();

        let (first, second) = (p1(), p1());
        let (a, b) = tokio::join!(
            engine.claim_policy_on(&first, today, None),
            engine.claim_policy_on(&second, today, None)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        let kind = loser.unwrap_err().kind();
        assert!(kind == ErrorKind::InvalidState || kind == ErrorKind::UpstreamFailure);

        assert_eq!(scenario.balance("F1").await, dec!(200));
        assert_eq!(scenario.balance("I1").await, dec!(800));
    }

    #[tokio::test]
    async fn test_non_atomic_ledger_reports_inconsistency() {
        let scenario = LedgerScenario::standard().await;
        let flaky = Arc::new(FlakyLedger::sequential(scenario.ledger.clone()));
        flaky.fail_puts_on("I1");

        let result = engine_on(flaky.clone(), SettlementConfig::default())
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await;
        assert_error_kind(&result, ErrorKind::Inconsistent);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("I1"), "{message}");

        // policy and farmer landed before the insurer write failed
        assert_eq!(scenario.status("P1").await, PolicyStatus::Claimed);
        assert_eq!(scenario.balance("F1").await, dec!(200));
        assert_eq!(scenario.balance("I1").await, dec!(1000));
    }

    #[tokio::test]
    async fn test_non_atomic_ledger_without_faults_settles() {
        let scenario = LedgerScenario::standard().await;
        let flaky = Arc::new(FlakyLedger::sequential(scenario.ledger.clone()));
        let result = engine_on(flaky, SettlementConfig::default())
            .claim_policy_on(&p1(), TemporalFixtures::today(), None)
            .await
            .unwrap();
        assert_eq!(result.insurer_balance, dec!(800));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_settlement_conserves_funds(
        insurer_cents in 0i64..10_000_000,
        farmer_cents in 0i64..10_000_000,
        amount_cents in 0i64..10_000_000,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let insurer_balance = Decimal::new(insurer_cents, 2);
            let farmer_balance = Decimal::new(farmer_cents, 2);
            let scenario = LedgerScenario::new()
                .with_user(TestUserBuilder::farmer("F1").with_balance(farmer_balance).build())
                .await
                .with_user(TestUserBuilder::insurer("I1").with_balance(insurer_balance).build())
                .await
                .with_policy(
                    TestPolicyBuilder::new("P1", "F1", "I1")
                        .with_amount(Decimal::new(amount_cents, 2))
                        .build(),
                )
                .await;

            let result = engine(&scenario)
                .claim_policy_on(&p1(), TemporalFixtures::today(), None)
                .await;
            let total = scenario.balance("F1").await + scenario.balance("I1").await;
            prop_assert_eq!(total, insurer_balance + farmer_balance);
            prop_assert_eq!(result.is_ok(), amount_cents <= insurer_cents);
            Ok(())
        })?;
    }
}
