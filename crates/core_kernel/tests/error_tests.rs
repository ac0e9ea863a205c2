//! Tests for core_kernel error types

use core_kernel::{Classify, ContractFailure, CoreError, ErrorKind, LedgerError, PortError};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match &error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_core_error_display() {
    let error = CoreError::InvalidCoordinates {
        value: "12.7".to_string(),
        reason: "expected \"latitude,longitude\"".to_string(),
    };
    assert!(error.to_string().starts_with("Invalid coordinates '12.7'"));
}

#[test]
fn test_ledger_error_kinds() {
    assert_eq!(
        LedgerError::Unavailable("peer down".into()).kind(),
        ErrorKind::UpstreamFailure
    );
    assert_eq!(
        LedgerError::Conflict { key: "P1".into() }.kind(),
        ErrorKind::UpstreamFailure
    );
    assert_eq!(
        LedgerError::InvalidKey("empty".into()).kind(),
        ErrorKind::InvalidArgument
    );

    let partial = LedgerError::PartialCommit {
        applied: vec!["P1".into()],
        failed_key: "F1".into(),
        reason: "disk full".into(),
    };
    assert!(partial.is_partial_commit());
    assert_eq!(partial.kind(), ErrorKind::Inconsistent);
}

#[test]
fn test_chaincode_error_keeps_remote_kind() {
    let error = LedgerError::Chaincode {
        contract: "userCC".into(),
        kind: ErrorKind::NotFound,
        message: "User F9 not found".into(),
    };
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn test_port_error_kinds() {
    assert_eq!(PortError::not_found("User", "F9").kind(), ErrorKind::NotFound);
    assert!(PortError::not_found("User", "F9").is_not_found());
    assert_eq!(PortError::validation("bad").kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_contract_failure_from_error() {
    let failure = ContractFailure::from_error(&CoreError::InvalidDate {
        value: "31/02/2024".into(),
    });
    assert_eq!(failure.kind, ErrorKind::InvalidArgument);

    let payload: serde_json::Value = serde_json::from_str(&failure.to_payload()).unwrap();
    assert_eq!(payload["kind"], "InvalidArgument");
    assert!(payload["message"].as_str().unwrap().contains("31/02/2024"));
}
