//! Ledger contracts
//!
//! Each contract routes a function name and positional string arguments to
//! a domain registry and answers with a [`core_kernel::ContractResponse`].

pub mod error;
pub mod insurance;
pub mod users;

pub use error::ContractError;
pub use insurance::InsuranceContract;
pub use users::UsersContract;
