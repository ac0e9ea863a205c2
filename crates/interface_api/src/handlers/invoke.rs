//! Contract invocation handler

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::{error::ApiError, AppState};

/// Body of `POST /api/v1/contracts/:contract/invoke`
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Invokes a function on a hosted contract and returns its payload as is
pub async fn invoke_contract(
    State(state): State<AppState>,
    Path(contract): Path<String>,
    Json(request): Json<InvokeRequest>,
) -> Result<Response, ApiError> {
    let target = state
        .contracts
        .get(&contract)
        .ok_or_else(|| ApiError::UnknownContract(contract.clone()))?;

    debug!(contract = %contract, function = %request.function, "Dispatching invocation");
    let payload = target
        .invoke(&request.function, &request.args)
        .await
        .into_result()?;

    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}
