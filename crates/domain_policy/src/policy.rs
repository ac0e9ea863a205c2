//! Policy documents
//!
//! A policy insures one crop on one farm for a fixed amount. The farm and
//! crop details are snapshots taken at issue time; later changes to the
//! farmer's registration do not flow into existing policies.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Document, GeoCoordinates, PolicyId, UserId};

use crate::error::PolicyError;

/// Policy lifecycle states
///
/// ```text
/// New ──► Active ──► Claimed
///  │        │
///  └────────┴──────► Expired
/// ```
///
/// `Claimed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyStatus {
    New,
    Active,
    Claimed,
    Expired,
}

impl PolicyStatus {
    pub const ALL: [PolicyStatus; 4] = [
        PolicyStatus::New,
        PolicyStatus::Active,
        PolicyStatus::Claimed,
        PolicyStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::New => "New",
            PolicyStatus::Active => "Active",
            PolicyStatus::Claimed => "Claimed",
            PolicyStatus::Expired => "Expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PolicyStatus::Claimed | PolicyStatus::Expired)
    }

    /// Policies that have not reached a terminal state can be settled
    pub fn is_claimable(&self) -> bool {
        !self.is_terminal()
    }
}

impl FromStr for PolicyStatus {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PolicyError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Farm details captured when the policy was issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSnapshot {
    pub address: String,
    pub coordinates: GeoCoordinates,
}

/// Crop details captured when the policy was issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub crop_type: String,
    pub season: String,
}

/// A crop insurance policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub policy_id: PolicyId,
    pub farmer_id: UserId,
    pub insurer_id: UserId,
    pub status: PolicyStatus,
    pub start_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub farm_details: FarmSnapshot,
    pub crop_details: CropSnapshot,
    /// Fixed at issue
    pub amount_insured: Decimal,
}

impl Policy {
    /// Returns a copy carrying `status`
    pub fn with_status(&self, status: PolicyStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

impl Document for Policy {
    const DOC_TYPE: &'static str = "policy";

    fn key(&self) -> &str {
        self.policy_id.as_str()
    }
}
