//! Crop Ledger - API Server Binary
//!
//! Starts the HTTP gateway in front of the users and insurance contracts.
//!
//! # Usage
//!
//! ```bash
//! # In-memory world state
//! cargo run --bin ledger-api
//!
//! # PostgreSQL world state, claims resolving users through the users contract
//! LEDGER_LEDGER_BACKEND=postgres LEDGER_DATABASE_URL=postgres://... \
//!     LEDGER_USER_DIRECTORY=chaincode cargo run --bin ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_HOST` / `LEDGER_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `LEDGER_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LEDGER_LOG_FORMAT` - plain or json (default: plain)
//! * `LEDGER_LEDGER_BACKEND` - memory or postgres (default: memory)
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_USERS_CONTRACT` / `LEDGER_INSURANCE_CONTRACT` - Contract names
//! * `LEDGER_USER_DIRECTORY` - local or chaincode (default: local)
//! * `LEDGER_DEFAULT_INSURER_ID` - Insurer for policies issued without one
//! * `LEDGER_ELIGIBILITY_RULE` - start_date_window or policy_term
//! * `LEDGER_CLAIM_WINDOW_MONTHS` - Window width in months (default: 2)
//! * `LEDGER_TIMEZONE` - IANA timezone "today" is taken in (default: UTC)
//! * `LEDGER_ALLOW_NEGATIVE_BALANCE` - Let insurers pay below zero

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::ChaincodeRegistry;
use infra_ledger::{create_pool, InMemoryLedger, PostgresLedger};
use interface_api::config::{ApiConfig, LedgerBackend, LogFormat};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid LEDGER_* configuration")?;
    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.ledger_backend,
        "Starting Crop Ledger API Server"
    );

    let state = build_state(config.clone()).await?;
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("invalid bind address")?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Opens the configured ledger and hosts the contracts on it
async fn build_state(config: ApiConfig) -> anyhow::Result<AppState> {
    let registry = Arc::new(ChaincodeRegistry::new());
    let state = match config.ledger_backend {
        LedgerBackend::Memory => {
            tracing::warn!("Using the in-memory ledger; state is lost on shutdown");
            let ledger = Arc::new(InMemoryLedger::with_registry(registry.clone()));
            AppState::new(ledger, &registry, config)?
        }
        LedgerBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(config.database())
                .await
                .context("failed to connect to the database")?;
            let ledger = PostgresLedger::new(pool, registry.clone());
            ledger.migrate().await.context("failed to migrate world state")?;
            tracing::info!("Database ready");
            AppState::new(Arc::new(ledger), &registry, config)?
        }
    };
    Ok(state)
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
