//! User documents
//!
//! A user is a farmer or an insurer. Farmers own farms with crops; both kinds
//! hold at least one bank account whose balance moves during settlement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Document, FarmId, GeoCoordinates, UserId};

use crate::error::IdentityError;

/// Kind of participant, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Farmer,
    Insurer,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Farmer => "farmer",
            UserType::Insurer => "insurer",
        }
    }
}

impl FromStr for UserType {
    type Err = IdentityError;

    /// Case-insensitive: `"Farmer"` and `"FARMER"` both parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "farmer" => Ok(UserType::Farmer),
            "insurer" => Ok(UserType::Insurer),
            _ => Err(IdentityError::InvalidUserType(s.to_string())),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crop grown on a farm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    #[serde(rename = "type")]
    pub crop_type: String,
    pub season: String,
    pub state: String,
}

/// A farm and the crops on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub farm_id: FarmId,
    pub address: String,
    pub coordinates: GeoCoordinates,
    pub crops: Vec<Crop>,
}

/// A bank account held by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_number: i64,
    pub balance: Decimal,
    pub bank_name: String,
}

impl Account {
    /// A fresh account; balances always start at zero
    pub fn open(account_number: i64, bank_name: impl Into<String>) -> Self {
        Self {
            account_number,
            balance: Decimal::ZERO,
            bank_name: bank_name.into(),
        }
    }
}

/// A registered participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub user_type: UserType,
    pub full_name: String,
    pub home_address: String,
    pub phone: i64,
    pub email: String,
    /// Always empty for insurers
    #[serde(default)]
    pub farms: Vec<Farm>,
    pub accounts: Vec<Account>,
}

impl User {
    pub fn is_farmer(&self) -> bool {
        self.user_type == UserType::Farmer
    }

    pub fn is_insurer(&self) -> bool {
        self.user_type == UserType::Insurer
    }

    /// The account settlements credit and debit
    pub fn primary_account(&self) -> Option<&Account> {
        self.accounts.first()
    }

    pub fn primary_account_mut(&mut self) -> Option<&mut Account> {
        self.accounts.first_mut()
    }

    /// Fails unless this user has the expected type
    pub fn require_type(&self, expected: UserType) -> Result<(), IdentityError> {
        if self.user_type != expected {
            return Err(IdentityError::WrongUserType {
                user_id: self.user_id.to_string(),
                expected,
                actual: self.user_type,
            });
        }
        Ok(())
    }
}

impl Document for User {
    const DOC_TYPE: &'static str = "user";

    fn key(&self) -> &str {
        self.user_id.as_str()
    }
}
