//! HTTP API Layer
//!
//! Hosts the users and insurance contracts in-process and exposes them over
//! HTTP using Axum.
//!
//! # Architecture
//!
//! - **Contracts**: function-name dispatch onto the domain registries
//! - **Handlers**: contract invocation and health probes
//! - **Middleware**: tracing, request ids, audit logging
//! - **Error Handling**: contract failures mapped to HTTP statuses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::in_memory(config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod contracts;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use core_kernel::{Chaincode, ChaincodeRegistry, LedgerClient, LedgerError};
use domain_claims::ClaimsSettlementEngine;
use domain_identity::{ChaincodeUserDirectory, IdentityRegistry, UserDirectory};
use domain_policy::PolicyRegistry;
use infra_ledger::InMemoryLedger;

use crate::config::{ApiConfig, DirectoryMode};
use crate::contracts::{InsuranceContract, UsersContract};
use crate::handlers::{health, invoke};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
///
/// Owns the hosted contracts; the [`ChaincodeRegistry`] only holds weak
/// references to them.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerClient>,
    pub contracts: Arc<HashMap<String, Arc<dyn Chaincode>>>,
    pub config: ApiConfig,
}

impl AppState {
    /// Builds both contracts on `ledger` and registers them with `registry`
    ///
    /// `registry` must be the one `ledger` routes `invoke_chaincode` through
    /// for the chaincode user directory to reach the users contract.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        registry: &ChaincodeRegistry,
        config: ApiConfig,
    ) -> Result<Self, LedgerError> {
        let identity = IdentityRegistry::new(ledger.clone());
        let policies = PolicyRegistry::new(ledger.clone())
            .with_default_insurer(config.default_insurer_id.clone());

        let directory: Arc<dyn UserDirectory> = match config.user_directory {
            DirectoryMode::Local => Arc::new(identity.clone()),
            DirectoryMode::Chaincode => Arc::new(ChaincodeUserDirectory::new(
                ledger.clone(),
                config.users_contract.clone(),
            )),
        };
        let engine = ClaimsSettlementEngine::new(
            ledger.clone(),
            policies.clone(),
            directory,
            config.settlement(),
        );

        let hosted: [Arc<dyn Chaincode>; 2] = [
            Arc::new(UsersContract::new(config.users_contract.clone(), identity)),
            Arc::new(InsuranceContract::new(
                config.insurance_contract.clone(),
                policies,
                engine,
            )),
        ];

        let mut contracts = HashMap::new();
        for contract in hosted {
            registry.register(&contract)?;
            contracts.insert(contract.name().to_string(), contract);
        }

        info!(
            contracts = ?contracts.keys().collect::<Vec<_>>(),
            directory = ?config.user_directory,
            "Contracts ready"
        );

        Ok(Self {
            ledger,
            contracts: Arc::new(contracts),
            config,
        })
    }

    /// State over a fresh in-memory ledger
    pub fn in_memory(config: ApiConfig) -> Result<Self, LedgerError> {
        let registry = Arc::new(ChaincodeRegistry::new());
        let ledger = Arc::new(InMemoryLedger::with_registry(registry.clone()));
        Self::new(ledger, &registry, config)
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let api_routes = Router::new()
        .route("/contracts/:contract/invoke", post(invoke::invoke_contract))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
