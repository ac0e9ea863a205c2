//! Policy Registry Domain
//!
//! Insurers issue crop policies against a farmer. Each policy snapshots the
//! farm and crop it covers and carries a fixed insured amount.
//!
//! # Policy Lifecycle
//!
//! ```text
//! New -> Active -> Claimed
//!    \-> Expired
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_policy::{PolicyRegistry, PolicyStatus};
//!
//! let registry = PolicyRegistry::new(ledger).with_default_insurer(Some(insurer_id));
//! let policy_id = registry.create_policy(&args).await?;
//! let open = registry.fetch_policies_by_status(PolicyStatus::New).await?;
//! ```

pub mod error;
pub mod issuance;
pub mod policy;
pub mod registry;

pub use error::PolicyError;
pub use issuance::{parse_policy, PolicyForm, POLICY_FIELDS, POLICY_FIELDS_WITH_INSURER};
pub use policy::{CropSnapshot, FarmSnapshot, Policy, PolicyStatus};
pub use registry::{PolicyRegistry, StoredPolicy, POLICY_FARMER_INDEX};
