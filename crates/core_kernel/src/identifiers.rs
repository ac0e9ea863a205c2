//! Strongly-typed identifiers for ledger documents
//!
//! Identifiers are chosen by the caller (`"F1"`, `"P-2017-004"`) and double
//! as ledger keys, so they wrap a validated `String` rather than a UUID.
//! Newtypes keep a farmer id from being passed where a policy id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ledger::{COMPOSITE_KEY_NAMESPACE, MAX_UNICODE_RUNE};

macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting blank values and characters
            /// reserved by the composite-key encoding
            pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
                let value = value.into();
                validate_key_part(&value, $label)?;
                Ok(Self(value))
            }

            /// Returns the identifier as a ledger key
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the label used in error messages
            pub fn label() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId, "userId");
define_id!(PolicyId, "policyId");
define_id!(FarmId, "farmId");

/// Checks that a value can be used as a key or composite-key attribute
pub(crate) fn validate_key_part(value: &str, label: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidIdentifier {
            value: value.to_string(),
            reason: format!("{} must not be blank", label),
        });
    }
    if value.chars().any(|c| c == COMPOSITE_KEY_NAMESPACE || c == MAX_UNICODE_RUNE) {
        return Err(CoreError::InvalidIdentifier {
            value: value.escape_default().to_string(),
            reason: format!("{} contains a reserved character", label),
        });
    }
    Ok(())
}

/// Identifier of a single contract invocation, used for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new time-ordered transaction identifier
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TXN-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_round_trips_through_json() {
        let id = UserId::new("F1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"F1\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_blank_id_rejected() {
        assert!(PolicyId::new("   ").is_err());
        assert!(serde_json::from_str::<PolicyId>("\"\"").is_err());
    }

    #[test]
    fn test_reserved_character_rejected() {
        let err = UserId::new("F\u{0}1").unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_transaction_id_display() {
        assert!(TransactionId::new().to_string().starts_with("TXN-"));
    }
}
