//! Document model
//!
//! A document is a JSON object. Its identity inside a collection is an
//! opaque string key, and its `updatedAt` field drives last-write-wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::timestamp::parse_timestamp;

/// A single JSON document
pub type Document = Map<String, Value>;

/// A declarative schema attached to a collection
pub type Schema = Map<String, Value>;

/// Snapshot of a collection, keyed by document key
pub type Collection = BTreeMap<String, Document>;

/// Snapshot of the schema registry, keyed by collection name
pub type SchemaRegistry = BTreeMap<String, Schema>;

/// Field holding the last-modified timestamp
pub const UPDATED_AT: &str = "updatedAt";

/// Fields checked, in order, to find a document's key during sync.
///
/// `dateKey` comes first for clients still using the legacy notes endpoint.
pub const IDENTITY_FIELDS: [&str; 3] = ["dateKey", "key", "id"];

/// Resolve the key of a sync candidate
///
/// Returns the first non-empty string among [`IDENTITY_FIELDS`].
pub fn document_key(doc: &Document) -> Option<&str> {
    IDENTITY_FIELDS
        .iter()
        .filter_map(|field| doc.get(*field).and_then(Value::as_str))
        .find(|key| !key.is_empty())
}

/// Parsed `updatedAt` of a document, if present and well-formed
pub fn updated_at(doc: &Document) -> Option<DateTime<Utc>> {
    doc.get(UPDATED_AT)
        .and_then(Value::as_str)
        .and_then(|raw| parse_timestamp(raw).ok())
}

/// Check whether `doc` was modified strictly after `since`
///
/// Documents without a usable timestamp never qualify.
pub fn is_newer_than(doc: &Document, since: DateTime<Utc>) -> bool {
    updated_at(doc).is_some_and(|ts| ts > since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_key_priority() {
        let d = doc(json!({"id": "c", "key": "b", "dateKey": "a"}));
        assert_eq!(document_key(&d), Some("a"));

        let d = doc(json!({"id": "c", "key": "b"}));
        assert_eq!(document_key(&d), Some("b"));

        let d = doc(json!({"id": "c"}));
        assert_eq!(document_key(&d), Some("c"));
    }

    #[test]
    fn test_key_skips_empty_and_non_string() {
        let d = doc(json!({"dateKey": "", "key": 42, "id": "fallback"}));
        assert_eq!(document_key(&d), Some("fallback"));

        let d = doc(json!({"dateKey": "", "title": "orphan"}));
        assert_eq!(document_key(&d), None);
    }

    #[test]
    fn test_updated_at() {
        let d = doc(json!({"updatedAt": "2024-06-01T12:00:00Z"}));
        assert!(updated_at(&d).is_some());

        let d = doc(json!({"updatedAt": "yesterday"}));
        assert!(updated_at(&d).is_none());

        let d = doc(json!({"updatedAt": 1717243200}));
        assert!(updated_at(&d).is_none());

        assert!(updated_at(&Document::new()).is_none());
    }

    #[test]
    fn test_is_newer_than() {
        let since = parse_timestamp("2024-03-01T00:00:00Z").unwrap();

        assert!(is_newer_than(&doc(json!({"updatedAt": "2024-06-01"})), since));
        assert!(!is_newer_than(&doc(json!({"updatedAt": "2024-01-01"})), since));
        assert!(!is_newer_than(&doc(json!({"updatedAt": "2024-03-01T00:00:00Z"})), since));
        assert!(!is_newer_than(&doc(json!({"title": "no timestamp"})), since));
    }
}
