//! Identity Registry Domain
//!
//! Farmers and insurers register with positional fields; farmers bring one
//! farm with one crop, and every user gets one zero-balance account.
//!
//! # Examples
//!
//! ```rust,ignore
//! use domain_identity::{IdentityRegistry, UserType};
//!
//! let registry = IdentityRegistry::new(ledger);
//! let id = registry.register_user(&args).await?;
//! let farmers = registry.fetch_users_by_type(UserType::Farmer).await?;
//! ```

pub mod adapters;
pub mod error;
pub mod ports;
pub mod registration;
pub mod registry;
pub mod user;

pub use adapters::ChaincodeUserDirectory;
pub use error::IdentityError;
pub use ports::{ResolvedUser, UserDirectory, UserDirectoryExt};
pub use registration::{parse_registration, RegistrationForm};
pub use registry::{IdentityRegistry, USER_NAME_INDEX};
pub use user::{Account, Crop, Farm, User, UserType};
