//! Core Kernel - Foundational types for the crop insurance ledger
//!
//! This crate provides the building blocks every contract shares:
//! - Caller-chosen identifiers and the stable error kinds
//! - Ledger dates and the timezone that defines "today"
//! - The ledger client contract, write sets and composite keys
//! - The Query Façade and the document envelope

pub mod chaincode;
pub mod document;
pub mod error;
pub mod geo;
pub mod identifiers;
pub mod ledger;
pub mod ports;
pub mod query;
pub mod temporal;

pub use chaincode::{Chaincode, ChaincodeRegistry, ContractFailure, ContractResponse};
pub use document::{decode_document, encode_document, Document};
pub use error::{Classify, CoreError, ErrorKind};
pub use geo::GeoCoordinates;
pub use identifiers::{FarmId, PolicyId, TransactionId, UserId};
pub use ledger::{
    composite_key, KeyValue, LedgerClient, LedgerError, StateQueryIterator, WriteSet,
    INDEX_SENTINEL,
};
pub use ports::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, PortError,
};
pub use query::{Filter, QueryFacade, QueryRecord};
pub use temporal::{format_ledger_date, parse_ledger_date, DateWindow, Timezone};
