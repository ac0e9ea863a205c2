//! Pre-built Test Fixtures
//!
//! Positional argument lists for the contract functions, and the calendar
//! the settlement tests are run against.

use chrono::{Months, NaiveDate};
use core_kernel::format_ledger_date;

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Fixture for registration arguments
pub struct UserFixtures;

impl UserFixtures {
    /// Fifteen `registerUser` fields for a farmer with one ragi crop
    pub fn farmer_args(user_id: &str, full_name: &str) -> Vec<String> {
        owned(&[
            user_id,
            "farmer",
            full_name,
            "FARM1",
            "Plot 7, Hosur",
            "12.7409,77.8253",
            "Ragi",
            "Millet",
            "Kharif",
            "Sown",
            "100200300",
            "Canara Bank",
            "Hosur Village",
            "9876543210",
            "farmer@example.com",
        ])
    }

    /// Eight `registerUser` fields for an insurer
    pub fn insurer_args(user_id: &str, full_name: &str) -> Vec<String> {
        owned(&[
            user_id,
            "insurer",
            full_name,
            "4001",
            "State Bank",
            "12 MG Road",
            "8012345678",
            "claims@insurer.example",
        ])
    }
}

/// Fixture for `newPolicy` arguments
pub struct PolicyFixtures;

impl PolicyFixtures {
    /// Ten `newPolicy` fields; the insurer comes from the registry default
    pub fn policy_args(
        policy_id: &str,
        farmer_id: &str,
        amount: &str,
        start: NaiveDate,
        expiry: NaiveDate,
    ) -> Vec<String> {
        let start = format_ledger_date(start);
        let expiry = format_ledger_date(expiry);
        owned(&[
            farmer_id,
            policy_id,
            amount,
            &start,
            &expiry,
            "Plot 7, Hosur",
            "12.7409,77.8253",
            "Ragi",
            "Millet",
            "Kharif",
        ])
    }

    /// Eleven `newPolicy` fields naming the insurer
    pub fn policy_args_with_insurer(
        policy_id: &str,
        farmer_id: &str,
        insurer_id: &str,
        amount: &str,
        start: NaiveDate,
        expiry: NaiveDate,
    ) -> Vec<String> {
        let mut args = Self::policy_args(policy_id, farmer_id, amount, start, expiry);
        args.push(insurer_id.to_string());
        args
    }
}

/// Fixture for the settlement calendar
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The "today" settlement tests are evaluated on (15 June 2024)
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// A start date inside the default two-month window
    pub fn start_in_window() -> NaiveDate {
        Self::today() - Months::new(1)
    }

    /// A start date one day past the default window
    pub fn start_after_window() -> NaiveDate {
        (Self::today() + Months::new(2)).succ_opt().unwrap()
    }

    pub fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }
}
