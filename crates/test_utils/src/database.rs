//! Database Test Utilities
//!
//! Starts a PostgreSQL container and hands back a migrated
//! [`PostgresLedger`]. Tests using it need Docker and are marked
//! `#[ignore]`.

use std::sync::Arc;
use std::time::Duration;

use core_kernel::ChaincodeRegistry;
use infra_ledger::{create_pool, DatabaseConfig, PostgresLedger};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// Credentials of the stock postgres module image
const POSTGRES_USER: &str = "postgres";
const POSTGRES_PASSWORD: &str = "postgres";
const POSTGRES_DB: &str = "postgres";

#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "127.0.0.1".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A PostgreSQL container with a migrated ledger on top
///
/// The container stops when this value is dropped.
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub ledger: Arc<PostgresLedger>,
}

impl TestDatabase {
    /// Starts a container and migrates the world-state schema
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails to migrate
    pub async fn start(
        contracts: Arc<ChaincodeRegistry>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let container = Postgres::default().start().await?;
        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = create_pool(
            DatabaseConfig::new(config.connection_url())
                .max_connections(5)
                .connect_timeout(Duration::from_secs(30)),
        )
        .await?;
        let ledger = PostgresLedger::new(pool, contracts);
        ledger.migrate().await?;

        Ok(Self {
            _container: container,
            config,
            ledger: Arc::new(ledger),
        })
    }

    /// Removes every key from the world state
    pub async fn clear_data(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ledger.truncate().await?;
        Ok(())
    }
}
