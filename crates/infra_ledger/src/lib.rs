//! Ledger Infrastructure Layer
//!
//! Adapters implementing [`core_kernel::LedgerClient`]:
//!
//! - [`InMemoryLedger`]: a sorted map behind an async lock. Used by tests and
//!   single-node development. Commits write sets atomically.
//! - [`PostgresLedger`]: a `world_state` table with a JSONB copy of every
//!   document for selector queries. Commits write sets in one transaction.
//!
//! Both evaluate the same selector subset (see [`selector`]), so a query that
//! works against one backend returns the same documents from the other.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_ledger::{create_pool, DatabaseConfig, PostgresLedger};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ledger")).await?;
//! let ledger = PostgresLedger::new(pool, registry);
//! ledger.migrate().await?;
//! ```

pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod selector;

pub use error::map_sqlx_error;
pub use memory::InMemoryLedger;
pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use postgres::PostgresLedger;
pub use selector::Selector;
