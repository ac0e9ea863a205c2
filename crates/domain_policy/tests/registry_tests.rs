//! Policy registry tests against the in-memory ledger

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{
    composite_key, encode_document, Classify, ErrorKind, GeoCoordinates, LedgerClient, PolicyId,
    UserId, INDEX_SENTINEL,
};
use domain_policy::{
    CropSnapshot, FarmSnapshot, Policy, PolicyError, PolicyRegistry, PolicyStatus,
    POLICY_FARMER_INDEX,
};
use infra_ledger::InMemoryLedger;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn policy_args(policy_id: &str, farmer_id: &str, amount: &str) -> Vec<String> {
    args(&[
        farmer_id, policy_id, amount, "01/06/2024", "31/12/2024", "Plot 7, Hosur",
        "12.7409,77.8253", "Ragi", "Millet", "Kharif",
    ])
}

fn setup() -> (Arc<InMemoryLedger>, PolicyRegistry) {
    let ledger = Arc::new(InMemoryLedger::new());
    let registry = PolicyRegistry::new(ledger.clone())
        .with_default_insurer(Some(UserId::new("I1").unwrap()));
    (ledger, registry)
}

fn pid(value: &str) -> PolicyId {
    PolicyId::new(value).unwrap()
}

mod creation {
    use super::*;

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (ledger, registry) = setup();
        let id = registry.create_policy(&policy_args("P1", "F1", "200")).await.unwrap();
        assert_eq!(id, pid("P1"));

        let policy = registry.fetch_policy(&id).await.unwrap();
        assert_eq!(policy.status, PolicyStatus::New);
        assert_eq!(policy.amount_insured, dec!(200));
        assert_eq!(policy.farmer_id.as_str(), "F1");
        assert_eq!(policy.insurer_id.as_str(), "I1");
        assert_eq!(policy.farm_details.address, "Plot 7, Hosur");

        let index = composite_key(POLICY_FARMER_INDEX, &["P1", "F1"]).unwrap();
        assert_eq!(ledger.get_state(&index).await.unwrap(), Some(INDEX_SENTINEL.to_vec()));
    }

    #[tokio::test]
    async fn test_duplicate_policy_is_rejected() {
        let (ledger, registry) = setup();
        registry.create_policy(&policy_args("P1", "F1", "200")).await.unwrap();
        let before = ledger.snapshot().await;

        let err = registry
            .create_policy(&policy_args("P1", "F2", "999"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(ledger.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_no_default_insurer() {
        let ledger = Arc::new(InMemoryLedger::new());
        let registry = PolicyRegistry::new(ledger.clone());
        let err = registry
            .create_policy(&policy_args("P1", "F1", "200"))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::MissingInsurer));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_policy_writes_nothing() {
        let (ledger, registry) = setup();
        let err = registry
            .create_policy(&policy_args("P1", "F1", "two hundred"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(ledger.is_empty().await);
    }
}

mod queries {
    use super::*;

    async fn seeded() -> PolicyRegistry {
        let (_ledger, registry) = setup();
        registry.create_policy(&policy_args("P1", "F1", "200")).await.unwrap();
        registry.create_policy(&policy_args("P2", "F2", "300")).await.unwrap();
        registry.create_policy(&policy_args("P3", "F1", "400")).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_by_farmer() {
        let registry = seeded().await;
        let farmer = UserId::new("F1").unwrap();
        let ids: Vec<String> = registry
            .fetch_policies_by_farmer(&farmer)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.policy_id.to_string())
            .collect();
        assert_eq!(ids, vec!["P1", "P3"]);
    }

    #[tokio::test]
    async fn test_by_status_follows_updates() {
        let registry = seeded().await;
        registry.update_status(&pid("P2"), PolicyStatus::Active).await.unwrap();

        let new = registry.fetch_policies_by_status(PolicyStatus::New).await.unwrap();
        assert_eq!(new.len(), 2);
        let active = registry.fetch_policies_by_status(PolicyStatus::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].policy_id, pid("P2"));
        assert!(registry
            .fetch_policies_by_status(PolicyStatus::Claimed)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_all_policies_raw_shape() {
        let registry = seeded().await;
        let raw = registry.fetch_all_policies_raw().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        let hits = parsed.as_array().unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0]["Key"], "P1");
        assert_eq!(hits[0]["Record"]["docType"], "policy");
        assert_eq!(hits[0]["Record"]["status"], "New");
    }

    #[tokio::test]
    async fn test_users_are_not_policies() {
        let (ledger, registry) = setup();
        ledger
            .put_state("F1", br#"{"docType":"user","userId":"F1"}"#.to_vec())
            .await
            .unwrap();
        assert!(registry.fetch_all_policies().await.unwrap().is_empty());
        let err = registry.fetch_policy(&pid("F1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod status_updates {
    use super::*;

    #[tokio::test]
    async fn test_update_is_unconditional() {
        let (_ledger, registry) = setup();
        registry.create_policy(&policy_args("P1", "F1", "200")).await.unwrap();

        registry.update_status(&pid("P1"), PolicyStatus::Claimed).await.unwrap();
        let reopened = registry.update_status(&pid("P1"), PolicyStatus::New).await.unwrap();
        assert_eq!(reopened.status, PolicyStatus::New);
        assert_eq!(registry.fetch_policy(&pid("P1")).await.unwrap(), reopened);
    }

    #[tokio::test]
    async fn test_update_missing_policy() {
        let (ledger, registry) = setup();
        let err = registry
            .update_status(&pid("P9"), PolicyStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::NotFound(_)));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_stored_bytes_match_raw_fetch() {
        let (ledger, registry) = setup();
        registry.create_policy(&policy_args("P1", "F1", "200")).await.unwrap();
        let stored = registry.fetch_stored(&pid("P1")).await.unwrap();
        assert_eq!(Some(stored.raw.clone()), ledger.get_state("P1").await.unwrap());
        assert_eq!(registry.fetch_policy_raw(&pid("P1")).await.unwrap(), stored.raw);
    }
}

fn arb_policy() -> impl Strategy<Value = Policy> {
    (
        "[A-Z][A-Z0-9]{1,8}",
        0i64..10_000_000,
        0u32..4,
        0i64..400,
        0i64..400,
    )
        .prop_map(|(id, cents, status, start_offset, term)| {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(start_offset);
            Policy {
                policy_id: PolicyId::new(format!("P{}", id)).unwrap(),
                farmer_id: UserId::new("F1").unwrap(),
                insurer_id: UserId::new("I1").unwrap(),
                status: PolicyStatus::ALL[status as usize],
                start_date: start,
                expiry_date: start + chrono::Duration::days(term),
                farm_details: FarmSnapshot {
                    address: "Plot 7".into(),
                    coordinates: "12.7409,77.8253".parse::<GeoCoordinates>().unwrap(),
                },
                crop_details: CropSnapshot {
                    name: "Ragi".into(),
                    crop_type: "Millet".into(),
                    season: "Kharif".into(),
                },
                amount_insured: Decimal::new(cents, 2),
            }
        })
}

proptest! {
    #[test]
    fn prop_stored_policy_fetches_back_equal(policy in arb_policy()) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (ledger, registry) = setup();
            ledger
                .put_state(policy.policy_id.as_str(), encode_document(&policy).unwrap())
                .await
                .unwrap();
            let fetched = registry.fetch_policy(&policy.policy_id).await.unwrap();
            prop_assert_eq!(fetched, policy);
            Ok(())
        })?;
    }
}
