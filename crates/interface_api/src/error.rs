//! API error handling
//!
//! Contract failures keep their `{"kind","message"}` body; the HTTP status
//! is derived from the kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use core_kernel::{ContractFailure, ErrorKind};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown contract: {0}")]
    UnknownContract(String),

    #[error(transparent)]
    Contract(#[from] ContractFailure),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    /// The failure reported in the response body
    pub fn failure(&self) -> ContractFailure {
        match self {
            ApiError::Contract(failure) => failure.clone(),
            ApiError::UnknownContract(_) => ContractFailure::new(ErrorKind::NotFound, self.to_string()),
            ApiError::Unavailable(_) => {
                ContractFailure::new(ErrorKind::UpstreamFailure, self.to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownContract(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Contract(failure) => status_for(failure.kind),
        }
    }
}

/// HTTP status reported for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidState | ErrorKind::NotEligible => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Inconsistent => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.failure())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::NotEligible), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Inconsistent), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_contract_is_not_found() {
        let err = ApiError::UnknownContract("billingCC".to_string());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.failure().kind, ErrorKind::NotFound);
        assert_eq!(err.failure().message, "Unknown contract: billingCC");
    }

    proptest! {
        #[test]
        fn prop_only_ledger_faults_are_server_errors(
            kind in prop::sample::select(vec![
                ErrorKind::InvalidArgument,
                ErrorKind::AlreadyExists,
                ErrorKind::NotFound,
                ErrorKind::InvalidState,
                ErrorKind::NotEligible,
                ErrorKind::UpstreamFailure,
                ErrorKind::Inconsistent,
            ]),
            message in "[a-zA-Z0-9 ]{0,40}",
        ) {
            let err = ApiError::Contract(ContractFailure::new(kind, message.clone()));
            let server_side = matches!(kind, ErrorKind::UpstreamFailure | ErrorKind::Inconsistent);
            prop_assert_eq!(err.status().is_server_error(), server_side);
            prop_assert_eq!(err.failure().message, message);
        }
    }
}
