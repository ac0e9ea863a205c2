//! Gateway configuration
//!
//! Read from `LEDGER_`-prefixed environment variables; anything unset keeps
//! its default.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::{Timezone, UserId};
use domain_claims::{ClaimWindow, EligibilityRule, SettlementConfig, DEFAULT_WINDOW_MONTHS};
use infra_ledger::DatabaseConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// World-state backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Postgres,
}

/// How the settlement engine looks users up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMode {
    /// Read user documents straight from the ledger
    #[default]
    Local,
    /// Call `fetchUserDataByUserID` on the users contract
    Chaincode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,

    pub ledger_backend: LedgerBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connect_timeout_secs: u64,

    /// Name the users contract is registered under
    pub users_contract: String,
    /// Name the insurance contract is registered under
    pub insurance_contract: String,
    pub user_directory: DirectoryMode,

    /// Insurer assigned to policies issued without one
    pub default_insurer_id: Option<UserId>,
    pub eligibility_rule: EligibilityRule,
    pub claim_window_months: u32,
    pub timezone: Timezone,
    pub allow_negative_balance: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            ledger_backend: LedgerBackend::default(),
            database_url: "postgres://localhost/crop_ledger".to_string(),
            database_max_connections: 10,
            database_min_connections: 2,
            database_connect_timeout_secs: 30,
            users_contract: "userCC".to_string(),
            insurance_contract: "insuranceCC".to_string(),
            user_directory: DirectoryMode::default(),
            default_insurer_id: None,
            eligibility_rule: EligibilityRule::default(),
            claim_window_months: DEFAULT_WINDOW_MONTHS,
            timezone: Timezone::default(),
            allow_negative_balance: false,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(Self::environment())
    }

    /// Loads configuration from `LEDGER_*` variables in `vars` instead of the process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, config::ConfigError> {
        Self::load(Self::environment().source(Some(vars)))
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("LEDGER").try_parsing(true)
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.database_max_connections)
            .min_connections(self.database_min_connections)
            .connect_timeout(Duration::from_secs(self.database_connect_timeout_secs))
    }

    pub fn settlement(&self) -> SettlementConfig {
        SettlementConfig {
            window: ClaimWindow::new(self.eligibility_rule, self.claim_window_months),
            timezone: self.timezone,
            allow_negative_balance: self.allow_negative_balance,
        }
    }
}
