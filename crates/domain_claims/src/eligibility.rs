//! Claim eligibility
//!
//! The default rule accepts a claim while the policy's start date lies
//! within a window of whole months around today:
//!
//! ```text
//! today - N months <= startDate <= today + N months
//! ```
//!
//! `PolicyTerm` instead requires today to fall inside the policy's own
//! start and expiry dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, DateWindow};
use domain_policy::Policy;

/// Months either side of today in the default window
pub const DEFAULT_WINDOW_MONTHS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityRule {
    /// Start date within `today ± window`
    #[default]
    StartDateWindow,
    /// Today within `[startDate, expiryDate]`
    PolicyTerm,
}

impl EligibilityRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityRule::StartDateWindow => "start_date_window",
            EligibilityRule::PolicyTerm => "policy_term",
        }
    }
}

impl FromStr for EligibilityRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "start_date_window" => Ok(EligibilityRule::StartDateWindow),
            "policy_term" => Ok(EligibilityRule::PolicyTerm),
            _ => Err(CoreError::Configuration(format!(
                "Unknown eligibility rule: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for EligibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    /// The dates the checked date had to fall in
    pub window: DateWindow,
    /// The date that was checked against the window
    pub checked: NaiveDate,
}

/// The claim window a settlement is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimWindow {
    pub rule: EligibilityRule,
    pub months: u32,
}

impl Default for ClaimWindow {
    fn default() -> Self {
        Self {
            rule: EligibilityRule::default(),
            months: DEFAULT_WINDOW_MONTHS,
        }
    }
}

impl ClaimWindow {
    pub fn new(rule: EligibilityRule, months: u32) -> Self {
        Self { rule, months }
    }

    pub fn evaluate(&self, policy: &Policy, today: NaiveDate) -> Eligibility {
        match self.rule {
            EligibilityRule::StartDateWindow => {
                let window = DateWindow::around(today, self.months);
                Eligibility {
                    eligible: window.contains(policy.start_date),
                    window,
                    checked: policy.start_date,
                }
            }
            EligibilityRule::PolicyTerm => {
                // An inverted term is never eligible
                let window = DateWindow {
                    start: policy.start_date,
                    end: policy.expiry_date,
                };
                Eligibility {
                    eligible: policy.start_date <= policy.expiry_date && window.contains(today),
                    window,
                    checked: today,
                }
            }
        }
    }

    pub fn within_claim_window(&self, policy: &Policy, today: NaiveDate) -> bool {
        self.evaluate(policy, today).eligible
    }
}
