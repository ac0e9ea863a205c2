//! Adapters for the identity ports
//!
//! - **ChaincodeUserDirectory**: resolves users through the users contract
//! - **MockUserDirectory**: in-memory mock for testing (re-exported from the
//!   ports module)

pub mod chaincode;

pub use chaincode::{ChaincodeUserDirectory, FETCH_USER_FUNCTION};
