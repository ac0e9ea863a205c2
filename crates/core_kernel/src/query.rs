//! Query Façade
//!
//! Turns a structured filter into a ledger selector and reassembles the
//! matching documents. Selectors are built as JSON values, never by string
//! interpolation, so a caller-supplied value cannot change the query shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::document::{decode_value, doc_type_of, Document, DOC_TYPE_FIELD};
use crate::ledger::{LedgerClient, LedgerError};

/// Conjunction of field equalities scoped to one document type
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    doc_type: String,
    fields: Map<String, Value>,
}

impl Filter {
    /// Matches every document of type `T`
    pub fn documents<T: Document>() -> Self {
        Self::doc_type(T::DOC_TYPE)
    }

    pub fn doc_type(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            fields: Map::new(),
        }
    }

    /// Adds `name == value` to the conjunction
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn target_doc_type(&self) -> &str {
        &self.doc_type
    }

    /// The selector object: `{"selector": {"docType": .., field: value, ..}}`
    pub fn selector(&self) -> Value {
        let mut selector = self.fields.clone();
        selector.insert(DOC_TYPE_FIELD.to_string(), Value::from(self.doc_type.clone()));
        json!({ "selector": selector })
    }

    pub fn to_query_string(&self) -> String {
        self.selector().to_string()
    }
}

/// One query hit in the `{"Key": .., "Record": ..}` shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord<T> {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: T,
}

/// Read-side access to the ledger through structured filters
#[derive(Clone)]
pub struct QueryFacade {
    ledger: Arc<dyn LedgerClient>,
}

impl QueryFacade {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Matching documents as parsed JSON, in ledger iteration order
    ///
    /// Hits whose `docType` differs from the filter's are dropped. The
    /// cursor is closed on success and released by drop on every error.
    pub async fn raw_records(&self, filter: &Filter) -> Result<Vec<QueryRecord<Value>>, LedgerError> {
        let query = filter.to_query_string();
        debug!(query = %query, "Running selector query");

        let mut cursor = self.ledger.get_query_result(&query).await?;
        let mut records = Vec::new();
        for item in cursor.by_ref() {
            let hit = item?;
            let record: Value = serde_json::from_slice(&hit.value)
                .map_err(|e| LedgerError::serialization(&hit.key, e))?;
            if doc_type_of(&record) == Some(filter.target_doc_type()) {
                records.push(QueryRecord {
                    key: hit.key,
                    record,
                });
            }
        }
        cursor.close();

        debug!(hits = records.len(), "Selector query complete");
        Ok(records)
    }

    /// Matching documents serialized as `[{"Key": .., "Record": ..}]`
    pub async fn raw(&self, filter: &Filter) -> Result<Vec<u8>, LedgerError> {
        let records = self.raw_records(filter).await?;
        serde_json::to_vec(&records)
            .map_err(|e| LedgerError::Query(format!("failed to encode query result: {}", e)))
    }

    /// Matching documents decoded as `T`, keyed
    pub async fn records<T: Document>(
        &self,
        filter: &Filter,
    ) -> Result<Vec<QueryRecord<T>>, LedgerError> {
        let mut typed = Vec::new();
        for QueryRecord { key, record } in self.raw_records(filter).await? {
            if let Some(doc) = decode_value::<T>(&key, record)? {
                typed.push(QueryRecord { key, record: doc });
            }
        }
        Ok(typed)
    }

    /// Matching documents decoded as `T`
    pub async fn documents<T: Document>(&self, filter: &Filter) -> Result<Vec<T>, LedgerError> {
        Ok(self
            .records::<T>(filter)
            .await?
            .into_iter()
            .map(|hit| hit.record)
            .collect())
    }
}

impl std::fmt::Debug for QueryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFacade").finish_non_exhaustive()
    }
}
