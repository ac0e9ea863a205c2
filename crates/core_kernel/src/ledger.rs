//! Ledger client contract
//!
//! Every durable byte in the system lives behind [`LedgerClient`]: get and
//! put by key, selector queries, composite-key construction and calls into
//! other contracts. Registries and the settlement engine never see which
//! backend they run on.
//!
//! Multi-document writes go through [`WriteSet`]. A write set carries
//! compare-and-set expectations on the exact bytes previously read, so two
//! concurrent settlements of the same policy cannot both commit.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::error::{Classify, ErrorKind};
use crate::ports::{DomainPort, HealthCheckable};

/// Leading character and separator of composite keys
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0000}';

/// Highest Unicode scalar, reserved as the upper bound of composite-key scans
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Value stored under secondary-index keys; the key itself carries the data
pub const INDEX_SENTINEL: &[u8] = &[0x00];

/// Errors raised by ledger adapters
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid ledger key: {0}")]
    InvalidKey(String),

    #[error("Stored document under '{key}' is malformed: {reason}")]
    Serialization { key: String, reason: String },

    /// A write-set expectation did not hold at commit time
    #[error("Concurrent modification of '{key}', nothing was written")]
    Conflict { key: String },

    /// A non-atomic commit stopped after some writes had landed
    #[error(
        "Write set partially applied: wrote {applied:?}, failed on '{failed_key}': {reason}"
    )]
    PartialCommit {
        applied: Vec<String>,
        failed_key: String,
        reason: String,
    },

    #[error("Contract '{0}' is not registered")]
    ChaincodeNotFound(String),

    /// The invoked contract answered with an error of its own
    #[error("Contract '{contract}' failed with {kind}: {message}")]
    Chaincode {
        contract: String,
        kind: ErrorKind,
        message: String,
    },
}

impl LedgerError {
    pub fn serialization(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        LedgerError::Serialization {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the failure left some writes applied
    pub fn is_partial_commit(&self) -> bool {
        matches!(self, LedgerError::PartialCommit { .. })
    }
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidKey(_) => ErrorKind::InvalidArgument,
            LedgerError::PartialCommit { .. } => ErrorKind::Inconsistent,
            LedgerError::Chaincode { kind, .. } => *kind,
            LedgerError::Unavailable(_)
            | LedgerError::Storage(_)
            | LedgerError::Query(_)
            | LedgerError::Serialization { .. }
            | LedgerError::Conflict { .. }
            | LedgerError::ChaincodeNotFound(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Builds a composite key: `U+0000 objectType U+0000 attr U+0000 ...`
pub fn composite_key(object_type: &str, attributes: &[&str]) -> Result<String, LedgerError> {
    check_key_part(object_type)?;
    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for attribute in attributes {
        check_key_part(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

/// Splits a composite key back into its object type and attributes
pub fn split_composite_key(key: &str) -> Option<(String, Vec<String>)> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)?
        .strip_suffix(COMPOSITE_KEY_NAMESPACE)?;
    let mut parts = body.split(COMPOSITE_KEY_NAMESPACE);
    let object_type = parts.next()?.to_string();
    Some((object_type, parts.map(str::to_string).collect()))
}

/// Returns true for keys in the composite-key namespace
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_NAMESPACE)
}

fn check_key_part(part: &str) -> Result<(), LedgerError> {
    if part.is_empty() {
        return Err(LedgerError::InvalidKey("empty composite-key part".to_string()));
    }
    if part.contains(COMPOSITE_KEY_NAMESPACE) || part.contains(MAX_UNICODE_RUNE) {
        return Err(LedgerError::InvalidKey(format!(
            "'{}' contains a reserved character",
            part.escape_default()
        )));
    }
    Ok(())
}

/// A key and its raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// Cursor over the results of a selector query
///
/// Adapters attach a release hook that frees whatever backs the cursor. The
/// hook runs exactly once, on [`close`](Self::close) or on drop.
pub struct StateQueryIterator {
    items: std::vec::IntoIter<Result<KeyValue, LedgerError>>,
    on_release: Option<ReleaseHook>,
}

impl StateQueryIterator {
    pub fn new(items: Vec<Result<KeyValue, LedgerError>>) -> Self {
        Self {
            items: items.into_iter(),
            on_release: None,
        }
    }

    pub fn from_key_values(items: Vec<KeyValue>) -> Self {
        Self::new(items.into_iter().map(Ok).collect())
    }

    /// Attaches the hook run when the cursor is released
    pub fn with_release(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Releases the cursor
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl Iterator for StateQueryIterator {
    type Item = Result<KeyValue, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

impl Drop for StateQueryIterator {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for StateQueryIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateQueryIterator")
            .field("remaining", &self.items.len())
            .field("released", &self.on_release.is_none())
            .finish()
    }
}

/// What a key must hold for a write set to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub key: String,
    /// Exact bytes expected, or `None` if the key must be absent
    pub value: Option<Vec<u8>>,
}

/// A group of puts committed as one unit, guarded by expectations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    expectations: Vec<Expectation>,
    writes: Vec<KeyValue>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `key` to still hold `value` at commit time
    pub fn expect_value(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.expectations.push(Expectation {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Requires `key` to have no entry at commit time
    pub fn expect_absent(mut self, key: impl Into<String>) -> Self {
        self.expectations.push(Expectation {
            key: key.into(),
            value: None,
        });
        self
    }

    pub fn put(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.writes.push(KeyValue::new(key, value));
        self
    }

    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    pub fn writes(&self) -> &[KeyValue] {
        &self.writes
    }

    pub fn into_parts(self) -> (Vec<Expectation>, Vec<KeyValue>) {
        (self.expectations, self.writes)
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Keys written by this set, in write order
    pub fn keys(&self) -> Vec<&str> {
        self.writes.iter().map(|kv| kv.key.as_str()).collect()
    }
}

/// Port to the key-value ledger
#[async_trait]
pub trait LedgerClient: DomainPort + HealthCheckable {
    /// Reads the value under `key`, `None` if the key has no entry
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Writes `value` under `key`, replacing any previous value
    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Runs a selector query (`{"selector": {...}}`) over JSON documents
    async fn get_query_result(&self, query: &str) -> Result<StateQueryIterator, LedgerError>;

    /// Calls `function` on another contract and returns its success payload
    async fn invoke_chaincode(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, LedgerError>;

    fn create_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<String, LedgerError> {
        composite_key(object_type, attributes)
    }

    /// True if [`commit`](Self::commit) applies all writes or none
    fn supports_atomic_commit(&self) -> bool {
        false
    }

    /// Commits a write set
    ///
    /// The default checks the expectations, then writes key by key. It is
    /// not atomic: if a put fails after others landed the result is
    /// [`LedgerError::PartialCommit`].
    async fn commit(&self, write_set: WriteSet) -> Result<(), LedgerError> {
        commit_sequentially(self, write_set).await
    }
}

/// Sequential, non-atomic commit over plain get/put
pub async fn commit_sequentially<L>(ledger: &L, write_set: WriteSet) -> Result<(), LedgerError>
where
    L: LedgerClient + ?Sized,
{
    let (expectations, writes) = write_set.into_parts();
    for expectation in &expectations {
        let current = ledger.get_state(&expectation.key).await?;
        if current != expectation.value {
            return Err(LedgerError::Conflict {
                key: expectation.key.clone(),
            });
        }
    }

    let mut applied: Vec<String> = Vec::with_capacity(writes.len());
    for KeyValue { key, value } in writes {
        if let Err(err) = ledger.put_state(&key, value).await {
            if applied.is_empty() {
                return Err(err);
            }
            tracing::error!(
                applied = ?applied,
                failed_key = %key.escape_default(),
                error = %err,
                "Write set partially applied"
            );
            return Err(LedgerError::PartialCommit {
                applied,
                failed_key: key,
                reason: err.to_string(),
            });
        }
        applied.push(key);
    }
    Ok(())
}
