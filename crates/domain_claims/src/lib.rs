//! Claims Settlement Domain
//!
//! Settles crop insurance claims: checks that a policy can still be
//! claimed, judges it against the claim window, moves the insured amount
//! from insurer to farmer and marks the policy `Claimed`, committing all
//! three documents together.
//!
//! # Settlement
//!
//! ```text
//! fetch policy -> check status -> resolve farmer + insurer
//!     -> check window -> transfer -> commit write set
//! ```

pub mod eligibility;
pub mod error;
pub mod settlement;
pub mod transfer;

pub use eligibility::{ClaimWindow, Eligibility, EligibilityRule, DEFAULT_WINDOW_MONTHS};
pub use error::ClaimsError;
pub use settlement::{ClaimsSettlementEngine, SettlementConfig, SettlementResult};
pub use transfer::{transfer, TransferOutcome};
