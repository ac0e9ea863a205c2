//! Test Utilities Crate
//!
//! Shared test infrastructure for the crop insurance ledger.
//!
//! # Modules
//!
//! - `fixtures`: Positional arguments for the contract functions and a fixed calendar
//! - `builders`: User and policy builders and a seeded in-memory ledger
//! - `faults`: A ledger wrapper that injects failures and concurrent writes
//! - `database`: PostgreSQL container management
//! - `assertions`: Error-kind and world-state assertions
//! - `generators`: Property-based strategies and `fake` data

pub mod assertions;
pub mod builders;
pub mod database;
pub mod faults;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use faults::*;
pub use fixtures::*;
pub use generators::*;
