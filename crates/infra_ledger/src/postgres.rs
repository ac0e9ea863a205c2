//! PostgreSQL ledger
//!
//! Every key is a row of `world_state`. Keys are stored as UTF-8 bytes
//! because composite keys contain U+0000, which `TEXT` cannot hold. When a
//! value parses as JSON it is mirrored into the `doc` JSONB column, which
//! selector queries evaluate with containment (`doc @> $1`).
//!
//! Write sets run in one transaction: rows under expectation are locked
//! with `SELECT ... FOR UPDATE`, and keys expected to be absent are created
//! with `ON CONFLICT DO NOTHING` so a concurrent insert is detected rather
//! than overwritten.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use core_kernel::ledger::is_composite_key;
use core_kernel::{
    AdapterHealth, ChaincodeRegistry, DomainPort, HealthCheckResult, HealthCheckable, KeyValue,
    LedgerClient, LedgerError, StateQueryIterator, WriteSet,
};

use crate::error::map_sqlx_error;
use crate::selector::Selector;

const UPSERT: &str = r#"
    INSERT INTO world_state (key, value, doc, updated_at)
    VALUES ($1, $2, $3, now())
    ON CONFLICT (key) DO UPDATE
    SET value = EXCLUDED.value, doc = EXCLUDED.doc, updated_at = now()
"#;

const INSERT_NEW: &str = r#"
    INSERT INTO world_state (key, value, doc, updated_at)
    VALUES ($1, $2, $3, now())
    ON CONFLICT (key) DO NOTHING
"#;

/// Ledger backed by a PostgreSQL `world_state` table
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
    contracts: Arc<ChaincodeRegistry>,
}

impl PostgresLedger {
    pub fn new(pool: PgPool, contracts: Arc<ChaincodeRegistry>) -> Self {
        Self { pool, contracts }
    }

    /// Applies the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(sqlx::Error::Migrate(Box::new(e))))?;
        info!("World state schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Deletes every key, index entries included
    pub async fn truncate(&self) -> Result<(), LedgerError> {
        sqlx::query("TRUNCATE TABLE world_state")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        warn!("World state truncated");
        Ok(())
    }

    pub fn registry(&self) -> &Arc<ChaincodeRegistry> {
        &self.contracts
    }
}

/// JSON mirror of a value; index sentinels and opaque bytes have none
fn json_mirror(key: &str, value: &[u8]) -> Option<Json<Value>> {
    if is_composite_key(key) {
        return None;
    }
    serde_json::from_slice::<Value>(value).ok().map(Json)
}

async fn lock_current(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> Result<Option<Vec<u8>>, LedgerError> {
    let row = sqlx::query("SELECT value FROM world_state WHERE key = $1 FOR UPDATE")
        .bind(key.as_bytes())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    row.map(|r| r.try_get::<Vec<u8>, _>("value"))
        .transpose()
        .map_err(map_sqlx_error)
}

impl DomainPort for PostgresLedger {}

#[async_trait]
impl HealthCheckable for PostgresLedger {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let probe = sqlx::query("SELECT 1").execute(&self.pool).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (status, message) = match probe {
            Ok(_) if latency_ms > 1_000 => (
                AdapterHealth::Degraded,
                Some(format!("slow response: {}ms", latency_ms)),
            ),
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(e.to_string())),
        };
        HealthCheckResult {
            adapter_id: "postgres_ledger".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerClient for PostgresLedger {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let row = sqlx::query("SELECT value FROM world_state WHERE key = $1")
            .bind(key.as_bytes())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(|r| r.try_get::<Vec<u8>, _>("value"))
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("empty key".to_string()));
        }
        let doc = json_mirror(key, &value);
        sqlx::query(UPSERT)
            .bind(key.as_bytes())
            .bind(value)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_query_result(&self, query: &str) -> Result<StateQueryIterator, LedgerError> {
        let selector = Selector::parse(query)?;
        let rows = sqlx::query(
            "SELECT key, value FROM world_state WHERE doc IS NOT NULL AND doc @> $1 ORDER BY key",
        )
        .bind(Json(selector.containment()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(hits = rows.len(), "Postgres selector query");
        let items = rows
            .into_iter()
            .map(|row| {
                let raw_key: Vec<u8> = row.try_get("key").map_err(map_sqlx_error)?;
                let value: Vec<u8> = row.try_get("value").map_err(map_sqlx_error)?;
                let key = String::from_utf8(raw_key)
                    .map_err(|e| LedgerError::serialization("<non-utf8 key>", e))?;
                Ok(KeyValue::new(key, value))
            })
            .collect();
        Ok(StateQueryIterator::new(items))
    }

    async fn invoke_chaincode(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        self.contracts.invoke(contract, function, args).await
    }

    fn supports_atomic_commit(&self) -> bool {
        true
    }

    async fn commit(&self, write_set: WriteSet) -> Result<(), LedgerError> {
        let (expectations, writes) = write_set.into_parts();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut must_be_new = HashSet::new();
        for expectation in &expectations {
            let current = lock_current(&mut tx, &expectation.key).await?;
            if current != expectation.value {
                warn!(key = %expectation.key, "Write set expectation failed");
                return Err(LedgerError::Conflict {
                    key: expectation.key.clone(),
                });
            }
            if expectation.value.is_none() {
                must_be_new.insert(expectation.key.clone());
            }
        }

        let count = writes.len();
        for KeyValue { key, value } in writes {
            let doc = json_mirror(&key, &value);
            let statement = if must_be_new.contains(&key) { INSERT_NEW } else { UPSERT };
            let result = sqlx::query(statement)
                .bind(key.as_bytes())
                .bind(value)
                .bind(doc)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            if result.rows_affected() == 0 {
                warn!(key = %key, "Key created concurrently");
                return Err(LedgerError::Conflict { key });
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        info!(writes = count, "Committed write set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_keys_have_no_json_mirror() {
        let key = core_kernel::composite_key("policyId~farmerId", &["P1", "F1"]).unwrap();
        assert!(json_mirror(&key, b"{}").is_none());
        assert!(json_mirror("P1", b"\x00").is_none());
        assert!(json_mirror("P1", br#"{"docType":"policy"}"#).is_some());
    }
}
