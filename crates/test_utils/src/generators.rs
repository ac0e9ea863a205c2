//! Property-Based Test Generators
//!
//! Proptest strategies for ledger identifiers, balances and dates, plus
//! `fake`-backed registration arguments with realistic names and emails.

use chrono::{Duration, NaiveDate};
use fake::faker::address::en::StreetName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{PolicyId, UserId};

/// Strategy for caller-supplied ledger keys
pub fn key_part_strategy() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9]{1,9}"
}

pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
    key_part_strategy().prop_map(|s| UserId::new(s).unwrap())
}

pub fn policy_id_strategy() -> impl Strategy<Value = PolicyId> {
    key_part_strategy().prop_map(|s| PolicyId::new(format!("P{}", s)).unwrap())
}

/// Strategy for non-negative balances with two decimal places
pub fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for insured amounts, zero included
pub fn amount_insured_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000i64, 0u32..3u32).prop_map(|(m, s)| Decimal::new(m, s))
}

/// Strategy for calendar dates in 2023 through 2025
pub fn ledger_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..1096i64).prop_map(|days| NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(days))
}

/// Strategy for `(start, expiry)` with expiry on or after start
pub fn policy_term_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (ledger_date_strategy(), 0i64..730i64).prop_map(|(start, length)| (start, start + Duration::days(length)))
}

/// A realistic full name
pub fn fake_full_name() -> String {
    Name().fake()
}

pub fn fake_email() -> String {
    SafeEmail().fake()
}

/// Fifteen farmer registration fields with generated personal details
pub fn fake_farmer_args(user_id: &str) -> Vec<String> {
    let street: String = StreetName().fake();
    let account_number: i64 = (100_000..999_999_999i64).fake();
    let phone: i64 = (6_000_000_000..9_999_999_999i64).fake();
    vec![
        user_id.to_string(),
        "farmer".to_string(),
        fake_full_name(),
        format!("FARM-{}", user_id),
        street.clone(),
        "12.7409,77.8253".to_string(),
        "Ragi".to_string(),
        "Millet".to_string(),
        "Kharif".to_string(),
        "Sown".to_string(),
        account_number.to_string(),
        "Canara Bank".to_string(),
        street,
        phone.to_string(),
        fake_email(),
    ]
}

/// Eight insurer registration fields with generated details
pub fn fake_insurer_args(user_id: &str) -> Vec<String> {
    let account_number: i64 = (1_000..99_999i64).fake();
    let phone: i64 = (6_000_000_000..9_999_999_999i64).fake();
    vec![
        user_id.to_string(),
        "insurer".to_string(),
        format!("{} Mutual", fake_full_name()),
        account_number.to_string(),
        "State Bank".to_string(),
        StreetName().fake(),
        phone.to_string(),
        fake_email(),
    ]
}
