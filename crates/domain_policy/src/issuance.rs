//! Policy issuance parsing
//!
//! `newPolicy` receives positional string fields:
//!
//! ```text
//! farmerId, policyId, amountInsured, startDate, expiryDate, farmAddress,
//! farmCoordinates, cropName, cropType, cropSeason[, insurerId]
//! ```
//!
//! When the trailing insurer is omitted the registry's default insurer is
//! used. A new policy always starts in `New`.

use rust_decimal::Decimal;
use std::str::FromStr;
use validator::{Validate, ValidationErrors};

use core_kernel::{parse_ledger_date, GeoCoordinates, PolicyId, UserId};

use crate::error::PolicyError;
use crate::policy::{CropSnapshot, FarmSnapshot, Policy, PolicyStatus};

/// Fields without an insurer
pub const POLICY_FIELDS: usize = 10;

/// Fields when the insurer is passed explicitly
pub const POLICY_FIELDS_WITH_INSURER: usize = 11;

#[derive(Debug, Clone, Default, Validate)]
pub struct PolicyForm {
    #[validate(length(min = 1, message = "farmerId must not be empty"))]
    pub farmer_id: String,
    #[validate(length(min = 1, message = "policyId must not be empty"))]
    pub policy_id: String,
    #[validate(length(min = 1, message = "amountInsured must not be empty"))]
    pub amount_insured: String,
    #[validate(length(min = 1, message = "startDate must not be empty"))]
    pub start_date: String,
    #[validate(length(min = 1, message = "expiryDate must not be empty"))]
    pub expiry_date: String,
    #[validate(length(min = 1, message = "farmAddress must not be empty"))]
    pub farm_address: String,
    #[validate(length(min = 1, message = "farmCoordinates must not be empty"))]
    pub farm_coordinates: String,
    #[validate(length(min = 1, message = "cropName must not be empty"))]
    pub crop_name: String,
    #[validate(length(min = 1, message = "cropType must not be empty"))]
    pub crop_type: String,
    #[validate(length(min = 1, message = "cropSeason must not be empty"))]
    pub crop_season: String,
    #[validate(length(min = 1, message = "insurerId must not be empty"))]
    pub insurer_id: Option<String>,
}

impl PolicyForm {
    pub fn from_args(args: &[String]) -> Result<Self, PolicyError> {
        if args.len() != POLICY_FIELDS && args.len() != POLICY_FIELDS_WITH_INSURER {
            return Err(PolicyError::Arity {
                expected: format!("{} or {}", POLICY_FIELDS, POLICY_FIELDS_WITH_INSURER),
                actual: args.len(),
            });
        }
        let field = |i: usize| args[i].trim().to_string();
        Ok(Self {
            farmer_id: field(0),
            policy_id: field(1),
            amount_insured: field(2),
            start_date: field(3),
            expiry_date: field(4),
            farm_address: field(5),
            farm_coordinates: field(6),
            crop_name: field(7),
            crop_type: field(8),
            crop_season: field(9),
            insurer_id: args.get(10).map(|s| s.trim().to_string()),
        })
    }

    /// Converts the form into a `New` policy
    ///
    /// Every field problem is collected before failing. A missing insurer
    /// is only reported once the fields themselves are valid.
    pub fn into_policy(self, default_insurer: Option<&UserId>) -> Result<Policy, PolicyError> {
        let mut problems = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => messages(&errors),
        };

        let farmer_id = check(&mut problems, non_empty(&self.farmer_id).map(UserId::new));
        let policy_id = check(&mut problems, non_empty(&self.policy_id).map(PolicyId::new));
        let insurer_id = check(
            &mut problems,
            self.insurer_id.as_deref().and_then(non_empty).map(UserId::new),
        );
        let amount_insured = check(&mut problems, parse_amount(&self.amount_insured));
        let start_date = check(&mut problems, non_empty(&self.start_date).map(parse_ledger_date));
        let expiry_date = check(&mut problems, non_empty(&self.expiry_date).map(parse_ledger_date));
        let coordinates = check(
            &mut problems,
            non_empty(&self.farm_coordinates).map(GeoCoordinates::from_str),
        );

        if let (Some(start), Some(expiry)) = (start_date, expiry_date) {
            if expiry < start {
                problems.push(format!(
                    "expiryDate {} precedes startDate {}",
                    expiry, start
                ));
            }
        }

        if !problems.is_empty() {
            return Err(PolicyError::InvalidPolicy(problems));
        }

        let insurer_id = match insurer_id {
            Some(explicit) => explicit,
            None => default_insurer.cloned().ok_or(PolicyError::MissingInsurer)?,
        };

        match (farmer_id, policy_id, amount_insured, start_date, expiry_date, coordinates) {
            (
                Some(farmer_id),
                Some(policy_id),
                Some(amount_insured),
                Some(start_date),
                Some(expiry_date),
                Some(coordinates),
            ) => Ok(Policy {
                policy_id,
                farmer_id,
                insurer_id,
                status: PolicyStatus::New,
                start_date,
                expiry_date,
                farm_details: FarmSnapshot {
                    address: self.farm_address,
                    coordinates,
                },
                crop_details: CropSnapshot {
                    name: self.crop_name,
                    crop_type: self.crop_type,
                    season: self.crop_season,
                },
                amount_insured,
            }),
            _ => Err(PolicyError::InvalidPolicy(vec![
                "policy is incomplete".to_string(),
            ])),
        }
    }
}

/// Parses a full `newPolicy` request
pub fn parse_policy(args: &[String], default_insurer: Option<&UserId>) -> Result<Policy, PolicyError> {
    PolicyForm::from_args(args)?.into_policy(default_insurer)
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_amount(value: &str) -> Option<Result<Decimal, String>> {
    non_empty(value).map(|v| match Decimal::from_str(v) {
        Ok(amount) if amount.is_sign_negative() && !amount.is_zero() => {
            Err(format!("amountInsured must not be negative, got '{}'", v))
        }
        Ok(amount) => Ok(amount.normalize()),
        Err(_) => Err(format!("amountInsured must be a decimal number, got '{}'", v)),
    })
}

fn check<T, E: ToString>(problems: &mut Vec<String>, parsed: Option<Result<T, E>>) -> Option<T> {
    match parsed? {
        Ok(value) => Some(value),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    }
}

fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut found: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn policy_args() -> Vec<String> {
        args(&[
            "F1", "P1", "200", "01/06/2024", "31/12/2024", "Plot 7, Hosur", "12.7409,77.8253",
            "Ragi", "Millet", "Kharif",
        ])
    }

    fn insurer() -> UserId {
        UserId::new("I1").unwrap()
    }

    #[test]
    fn test_new_policy_uses_default_insurer() {
        let policy = parse_policy(&policy_args(), Some(&insurer())).unwrap();
        assert_eq!(policy.status, PolicyStatus::New);
        assert_eq!(policy.insurer_id, insurer());
        assert_eq!(policy.amount_insured, dec!(200));
        assert_eq!(policy.start_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(policy.crop_details.crop_type, "Millet");
    }

    #[test]
    fn test_explicit_insurer_wins() {
        let mut a = policy_args();
        a.push("I2".into());
        let policy = parse_policy(&a, Some(&insurer())).unwrap();
        assert_eq!(policy.insurer_id.as_str(), "I2");
    }

    #[test]
    fn test_missing_insurer() {
        assert!(matches!(
            parse_policy(&policy_args(), None),
            Err(PolicyError::MissingInsurer)
        ));
    }

    #[test]
    fn test_arity() {
        assert!(matches!(
            parse_policy(&policy_args()[..9], Some(&insurer())),
            Err(PolicyError::Arity { actual: 9, .. })
        ));
    }

    #[test]
    fn test_iso_dates_are_accepted() {
        let mut a = policy_args();
        a[3] = "2024-06-01".into();
        a[4] = "2024-06-01".into();
        let policy = parse_policy(&a, Some(&insurer())).unwrap();
        assert_eq!(policy.start_date, policy.expiry_date);
    }

    #[test]
    fn test_field_problems_reported_together() {
        let mut a = policy_args();
        a[2] = "-5".into();
        a[3] = "01/07/2024".into();
        a[4] = "01/06/2024".into();
        a[7] = " ".into();

        let problems = match parse_policy(&a, Some(&insurer())) {
            Err(PolicyError::InvalidPolicy(problems)) => problems,
            other => panic!("expected InvalidPolicy, got {other:?}"),
        };
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("must not be negative")));
        assert!(problems.iter().any(|p| p.contains("precedes")));
        assert!(problems.iter().any(|p| p == "cropName must not be empty"));
    }

    #[test]
    fn test_bad_amount_and_date() {
        let mut a = policy_args();
        a[2] = "lots".into();
        a[4] = "31/02/2024".into();
        let err = parse_policy(&a, Some(&insurer())).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPolicy(ref p) if p.len() == 2));
    }
}
