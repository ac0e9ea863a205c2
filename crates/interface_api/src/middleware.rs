//! API middleware

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::AppState;

/// Audit logging middleware
///
/// Logs every contract invocation with the contract it targeted.
pub async fn audit_middleware(
    State(_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let contract = params.get("contract").cloned().unwrap_or_default();

    let start = Utc::now();
    let response = next.run(request).await;
    let duration = Utc::now() - start;
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            uri = %uri,
            contract = %contract,
            status = status.as_u16(),
            duration_ms = duration.num_milliseconds(),
            "Contract invocation failed"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            contract = %contract,
            status = status.as_u16(),
            duration_ms = duration.num_milliseconds(),
            "Contract invocation"
        );
    }

    response
}
