//! Document envelope for ledger values
//!
//! Documents are stored as camelCase JSON objects carrying a `docType`
//! discriminator. A key holding a document of another type reads as absent.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::ledger::LedgerError;

/// Name of the discriminator field
pub const DOC_TYPE_FIELD: &str = "docType";

/// A typed document stored under its own primary key
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Value of the `docType` field
    const DOC_TYPE: &'static str;

    /// Primary ledger key of this document
    fn key(&self) -> &str;
}

/// Serializes a document with its `docType`
pub fn encode_document<T: Document>(doc: &T) -> Result<Vec<u8>, LedgerError> {
    let mut value =
        serde_json::to_value(doc).map_err(|e| LedgerError::serialization(doc.key(), e))?;
    match value.as_object_mut() {
        Some(object) => {
            object.insert(DOC_TYPE_FIELD.to_string(), Value::from(T::DOC_TYPE));
        }
        None => {
            return Err(LedgerError::serialization(
                doc.key(),
                "document must serialize to a JSON object",
            ))
        }
    }
    serde_json::to_vec(&value).map_err(|e| LedgerError::serialization(doc.key(), e))
}

/// Decodes the bytes under `key`
///
/// Returns `Ok(None)` when the value is a document of another type, and a
/// serialization error when it is not a document at all.
pub fn decode_document<T: Document>(key: &str, bytes: &[u8]) -> Result<Option<T>, LedgerError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::serialization(key, e))?;
    decode_value(key, value)
}

/// Same as [`decode_document`] for an already parsed value
pub fn decode_value<T: Document>(key: &str, value: Value) -> Result<Option<T>, LedgerError> {
    if doc_type_of(&value) != Some(T::DOC_TYPE) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| LedgerError::serialization(key, e))
}

/// Reads the `docType` of a parsed value
pub fn doc_type_of(value: &Value) -> Option<&str> {
    value.get(DOC_TYPE_FIELD).and_then(Value::as_str)
}
