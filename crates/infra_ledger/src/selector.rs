//! Selector evaluation
//!
//! Both adapters accept the same subset of the rich-query language: a
//! `{"selector": {...}}` object whose leaves are equality conditions. Nested
//! objects and dotted field names address nested document fields, and
//! `{"$eq": v}` is accepted as an explicit equality. Any other operator is
//! rejected rather than silently ignored.

use core_kernel::LedgerError;
use serde_json::{Map, Value};

/// A parsed selector: a conjunction of path equalities
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    conditions: Vec<(Vec<String>, Value)>,
}

impl Selector {
    /// Parses a query string of the form `{"selector": {...}}`
    pub fn parse(query: &str) -> Result<Self, LedgerError> {
        let value: Value = serde_json::from_str(query)
            .map_err(|e| LedgerError::Query(format!("query is not valid JSON: {}", e)))?;
        let selector = value
            .get("selector")
            .and_then(Value::as_object)
            .ok_or_else(|| LedgerError::Query("query has no \"selector\" object".to_string()))?;

        let mut conditions = Vec::new();
        collect(&mut conditions, Vec::new(), selector)?;
        Ok(Self { conditions })
    }

    /// Returns true if the document satisfies every condition
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|(path, expected)| {
            path.iter()
                .try_fold(document, |current, field| current.get(field))
                .is_some_and(|actual| actual == expected)
        })
    }

    /// The selector as a nested object for JSONB containment (`doc @> $1`)
    pub fn containment(&self) -> Value {
        let mut root = Map::new();
        for (path, expected) in &self.conditions {
            insert_path(&mut root, path, expected.clone());
        }
        Value::Object(root)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

fn insert_path(target: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            target.insert(leaf.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

fn collect(
    conditions: &mut Vec<(Vec<String>, Value)>,
    prefix: Vec<String>,
    object: &Map<String, Value>,
) -> Result<(), LedgerError> {
    for (field, value) in object {
        if field.starts_with('$') {
            return Err(LedgerError::Query(format!("unsupported operator '{}'", field)));
        }
        let mut path = prefix.clone();
        path.extend(field.split('.').map(str::to_string));

        match value {
            Value::Object(inner) if inner.len() == 1 && inner.contains_key("$eq") => {
                conditions.push((path, inner["$eq"].clone()));
            }
            Value::Object(inner) if inner.keys().any(|k| k.starts_with('$')) => {
                let operator = inner.keys().find(|k| k.starts_with('$')).cloned();
                return Err(LedgerError::Query(format!(
                    "unsupported operator '{}'",
                    operator.unwrap_or_default()
                )));
            }
            Value::Object(inner) if !inner.is_empty() => collect(conditions, path, inner)?,
            other => conditions.push((path, other.clone())),
        }
    }
    Ok(())
}
