//! Fault Injection
//!
//! [`FlakyLedger`] wraps an [`InMemoryLedger`] and can fail individual
//! puts, break query cursors midway, slip a concurrent write in ahead of a
//! commit, or fall back to the non-atomic sequential commit.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use core_kernel::ledger::commit_sequentially;
use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, LedgerClient, LedgerError, StateQueryIterator,
    WriteSet,
};
use infra_ledger::InMemoryLedger;

#[derive(Debug)]
pub struct FlakyLedger {
    inner: Arc<InMemoryLedger>,
    atomic: bool,
    failing_keys: Mutex<HashSet<String>>,
    failing_queries: AtomicBool,
    interleaved: Mutex<Vec<(String, Vec<u8>)>>,
    open_cursors: Arc<AtomicUsize>,
}

impl FlakyLedger {
    /// A ledger that commits through the inner ledger's atomic commit
    pub fn atomic(inner: Arc<InMemoryLedger>) -> Self {
        Self::build(inner, true)
    }

    /// A ledger that commits key by key through `put_state`
    pub fn sequential(inner: Arc<InMemoryLedger>) -> Self {
        Self::build(inner, false)
    }

    fn build(inner: Arc<InMemoryLedger>, atomic: bool) -> Self {
        Self {
            inner,
            atomic,
            failing_keys: Mutex::new(HashSet::new()),
            failing_queries: AtomicBool::new(false),
            interleaved: Mutex::new(Vec::new()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryLedger> {
        &self.inner
    }

    /// Every later `put_state` on `key` fails
    pub fn fail_puts_on(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Query cursors yield an error after their first hit
    pub fn fail_queries(&self) {
        self.failing_queries.store(true, Ordering::SeqCst);
    }

    /// Writes `value` under `key` just before the next commit runs
    pub fn interleave_write(&self, key: &str, value: Vec<u8>) {
        self.interleaved.lock().unwrap().push((key.to_string(), value));
    }

    /// Cursors handed out by this wrapper and not yet released
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

impl DomainPort for FlakyLedger {}

#[async_trait]
impl HealthCheckable for FlakyLedger {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl LedgerClient for FlakyLedger {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.get_state(key).await
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(LedgerError::Unavailable(format!("injected failure writing {}", key)));
        }
        self.inner.put_state(key, value).await
    }

    async fn get_query_result(&self, query: &str) -> Result<StateQueryIterator, LedgerError> {
        let mut items: Vec<_> = self.inner.get_query_result(query).await?.collect();
        if self.failing_queries.load(Ordering::SeqCst) {
            items.truncate(1);
            items.push(Err(LedgerError::Query("injected cursor failure".to_string())));
        }

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        let open_cursors = self.open_cursors.clone();
        Ok(StateQueryIterator::new(items).with_release(move || {
            open_cursors.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    async fn invoke_chaincode(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError> {
        self.inner.invoke_chaincode(contract, function, args).await
    }

    fn supports_atomic_commit(&self) -> bool {
        self.atomic
    }

    async fn commit(&self, write_set: WriteSet) -> Result<(), LedgerError> {
        let interleaved: Vec<_> = self.interleaved.lock().unwrap().drain(..).collect();
        for (key, value) in interleaved {
            self.inner.put_state(&key, value).await?;
        }
        if self.atomic {
            self.inner.commit(write_set).await
        } else {
            commit_sequentially(self, write_set).await
        }
    }
}
