//! In-memory ledger
//!
//! World state is a `BTreeMap` behind a tokio `RwLock`, so query results come
//! back in key order. Write sets are checked and applied under a single write
//! lock, which makes [`InMemoryLedger::commit`] atomic.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use core_kernel::ledger::is_composite_key;
use core_kernel::{
    AdapterHealth, ChaincodeRegistry, DomainPort, HealthCheckResult, HealthCheckable, KeyValue,
    LedgerClient, LedgerError, StateQueryIterator, WriteSet,
};

use crate::selector::Selector;

/// Ledger kept entirely in process memory
#[derive(Debug)]
pub struct InMemoryLedger {
    state: RwLock<BTreeMap<String, Vec<u8>>>,
    contracts: Arc<ChaincodeRegistry>,
    open_cursors: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    /// Creates an empty ledger with its own contract registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ChaincodeRegistry::new()))
    }

    /// Creates an empty ledger that routes `invoke` through `contracts`
    pub fn with_registry(contracts: Arc<ChaincodeRegistry>) -> Self {
        Self {
            state: RwLock::new(BTreeMap::new()),
            contracts,
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn registry(&self) -> &Arc<ChaincodeRegistry> {
        &self.contracts
    }

    /// Number of query cursors handed out and not yet released
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of keys in the world state, index keys included
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Copy of the whole world state
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.read().await.clone()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainPort for InMemoryLedger {}

#[async_trait]
impl HealthCheckable for InMemoryLedger {
    async fn health_check(&self) -> HealthCheckResult {
        let keys = self.len().await;
        HealthCheckResult {
            adapter_id: "in_memory_ledger".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some(format!("{} keys", keys)),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("empty key".to_string()));
        }
        self.state.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_query_result(&self, query: &str) -> Result<StateQueryIterator, LedgerError> {
        let selector = Selector::parse(query)?;
        let state = self.state.read().await;

        let hits: Vec<KeyValue> = state
            .iter()
            .filter(|(key, _)| !is_composite_key(key))
            .filter(|(_, value)| {
                serde_json::from_slice::<Value>(value)
                    .map(|doc| selector.matches(&doc))
                    .unwrap_or(false)
            })
            .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
            .collect();
        debug!(hits = hits.len(), "In-memory selector query");

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        let open_cursors = self.open_cursors.clone();
        Ok(StateQueryIterator::from_key_values(hits).with_release(move || {
            open_cursors.fetch_sub(1, Ordering::SeqCst);
        }))
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
        let mut state = self.state.write().await;

        for expectation in &expectations {
            if state.get(&expectation.key) != expectation.value.as_ref() {
                return Err(LedgerError::Conflict {
                    key: expectation.key.clone(),
                });
            }
        }
        if writes.iter().any(|kv| kv.key.is_empty()) {
            return Err(LedgerError::InvalidKey("empty key in write set".to_string()));
        }

        let count = writes.len();
        for KeyValue { key, value } in writes {
            state.insert(key, value);
        }
        info!(writes = count, "Committed write set");
        Ok(())
    }
}
