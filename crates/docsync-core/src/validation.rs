//! Schema validation for collection documents
//!
//! Implements a structural subset of JSON Schema (draft-07 keywords):
//!
//! - `type` (object, array, string, number, integer, boolean, null)
//! - `properties`, `required`, `additionalProperties: false`
//! - `items`, `minItems`, `maxItems`
//! - `minLength`, `maxLength`
//! - `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`
//! - `enum`
//!
//! Validation is fail-fast: the first violation found is returned, with
//! a path rooted at `$` (`$.tags[2]`). Keywords whose value has the wrong
//! JSON shape are ignored rather than treated as schema errors.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::document::{Document, Schema};

/// The first constraint a document broke
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    /// Location of the offending value, e.g. `$.items[0].name`
    pub path: String,
    /// Human-readable description of the broken constraint
    pub message: String,
}

impl SchemaViolation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

pub type Validation = Result<(), SchemaViolation>;

/// Validate a document against an optional schema
///
/// An absent schema always passes.
pub fn validate(schema: Option<&Schema>, doc: &Document) -> Validation {
    match schema {
        Some(schema) => validate_object_root(schema, doc),
        None => Ok(()),
    }
}

/// Root of a document is always an object; checked without wrapping it in a `Value`.
fn validate_object_root(schema: &Schema, doc: &Document) -> Validation {
    check_type_keyword(schema, JsonKind::Object, "$")?;
    check_enum_keyword(
        schema,
        |candidate| matches!(candidate, Value::Object(map) if maps_equal(map, doc)),
        "$",
    )?;
    validate_object(schema, doc, "$")
}

fn validate_value(schema: &Schema, value: &Value, path: &str) -> Validation {
    check_type_keyword(schema, JsonKind::of(value), path)?;
    check_enum_keyword(schema, |candidate| values_equal(candidate, value), path)?;

    match value {
        Value::Object(obj) => validate_object(schema, obj, path),
        Value::Array(arr) => validate_array(schema, arr, path),
        Value::String(s) => validate_string(schema, s, path),
        Value::Number(n) => match n.as_f64() {
            Some(f) => validate_number(schema, f, path),
            None => Ok(()),
        },
        Value::Bool(_) | Value::Null => Ok(()),
    }
}

/// JSON type of a value as named by schema `type` keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    Object,
    Array,
    String,
    Integer,
    Number { whole: bool },
    Boolean,
    Null,
}

impl JsonKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => JsonKind::Object,
            Value::Array(_) => JsonKind::Array,
            Value::String(_) => JsonKind::String,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Null => JsonKind::Null,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonKind::Integer,
            Value::Number(n) => JsonKind::Number {
                whole: n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
            },
        }
    }

    fn name(self) -> &'static str {
        match self {
            JsonKind::Object => "object",
            JsonKind::Array => "array",
            JsonKind::String => "string",
            JsonKind::Integer => "integer",
            JsonKind::Number { .. } => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Null => "null",
        }
    }

    fn satisfies(self, expected: &str) -> bool {
        match (expected, self) {
            ("integer", JsonKind::Integer) => true,
            ("integer", JsonKind::Number { whole }) => whole,
            ("number", JsonKind::Integer | JsonKind::Number { .. }) => true,
            (expected, actual) => expected == actual.name(),
        }
    }
}

fn check_type_keyword(schema: &Schema, actual: JsonKind, path: &str) -> Validation {
    let Some(expected) = schema.get("type").and_then(Value::as_str) else {
        return Ok(());
    };
    if actual.satisfies(expected) {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("expected type {:?}, got {:?}", expected, actual.name()),
        ))
    }
}

fn check_enum_keyword(
    schema: &Schema,
    matches: impl Fn(&Value) -> bool,
    path: &str,
) -> Validation {
    let Some(allowed) = schema.get("enum").and_then(Value::as_array) else {
        return Ok(());
    };
    if allowed.iter().any(matches) {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("value not in enum {}", Value::Array(allowed.clone())),
        ))
    }
}

fn validate_object(schema: &Schema, obj: &Map<String, Value>, path: &str) -> Validation {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(field) {
                return Err(SchemaViolation::new(
                    path,
                    format!("missing required field {:?}", field),
                ));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(properties) = properties {
        for (field, prop_schema) in properties {
            let (Some(value), Some(prop_schema)) = (obj.get(field), prop_schema.as_object())
            else {
                continue;
            };
            validate_value(prop_schema, value, &format!("{}.{}", path, field))?;
        }
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        let extra: Vec<&str> = obj
            .keys()
            .filter(|field| !properties.is_some_and(|p| p.contains_key(*field)))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            return Err(SchemaViolation::new(
                path,
                format!("additional properties not allowed: {}", extra.join(", ")),
            ));
        }
    }

    Ok(())
}

fn validate_array(schema: &Schema, arr: &[Value], path: &str) -> Validation {
    let len = arr.len() as f64;

    if let Some(min) = bound(schema, "minItems") {
        if len < min {
            return Err(SchemaViolation::new(
                path,
                format!("array length {} is less than minItems {}", arr.len(), min),
            ));
        }
    }
    if let Some(max) = bound(schema, "maxItems") {
        if len > max {
            return Err(SchemaViolation::new(
                path,
                format!("array length {} is greater than maxItems {}", arr.len(), max),
            ));
        }
    }

    if let Some(item_schema) = schema.get("items").and_then(Value::as_object) {
        for (i, elem) in arr.iter().enumerate() {
            validate_value(item_schema, elem, &format!("{}[{}]", path, i))?;
        }
    }

    Ok(())
}

fn validate_string(schema: &Schema, s: &str, path: &str) -> Validation {
    let chars = s.chars().count();
    let len = chars as f64;

    if let Some(min) = bound(schema, "minLength") {
        if len < min {
            return Err(SchemaViolation::new(
                path,
                format!("string length {} is less than minLength {}", chars, min),
            ));
        }
    }
    if let Some(max) = bound(schema, "maxLength") {
        if len > max {
            return Err(SchemaViolation::new(
                path,
                format!("string length {} is greater than maxLength {}", chars, max),
            ));
        }
    }

    Ok(())
}

fn validate_number(schema: &Schema, n: f64, path: &str) -> Validation {
    if let Some(min) = bound(schema, "minimum") {
        if n < min {
            return Err(SchemaViolation::new(
                path,
                format!("{} is less than minimum {}", n, min),
            ));
        }
    }
    if let Some(max) = bound(schema, "maximum") {
        if n > max {
            return Err(SchemaViolation::new(
                path,
                format!("{} is greater than maximum {}", n, max),
            ));
        }
    }
    if let Some(min) = bound(schema, "exclusiveMinimum") {
        if n <= min {
            return Err(SchemaViolation::new(
                path,
                format!("{} is not greater than exclusiveMinimum {}", n, min),
            ));
        }
    }
    if let Some(max) = bound(schema, "exclusiveMaximum") {
        if n >= max {
            return Err(SchemaViolation::new(
                path,
                format!("{} is not less than exclusiveMaximum {}", n, max),
            ));
        }
    }

    Ok(())
}

/// Numeric keyword value, if the keyword is present and numeric
fn bound(schema: &Schema, keyword: &str) -> Option<f64> {
    schema.get(keyword).and_then(Value::as_f64)
}

/// Deep equality where numbers compare by value (`5 == 5.0`)
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => maps_equal(x, y),
        _ => a == b,
    }
}

fn maps_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_u64(), b.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn check(schema: Value, doc: Value) -> Validation {
        validate(Some(&obj(schema)), &obj(doc))
    }

    #[test]
    fn test_no_schema_passes() {
        assert!(validate(None, &obj(json!({"anything": [1, "two", null]}))).is_ok());
        assert!(validate(None, &Document::new()).is_ok());
    }

    #[test]
    fn test_empty_schema_passes() {
        assert!(check(json!({}), json!({"a": 1})).is_ok());
    }

    #[test]
    fn test_required_field() {
        let schema = json!({"type": "object", "required": ["name"]});

        let err = check(schema.clone(), json!({})).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.contains("missing required field \"name\""));

        assert!(check(schema.clone(), json!({"name": "x"})).is_ok());
        // null still counts as present
        assert!(check(schema, json!({"name": null})).is_ok());
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        let schema = json!({"properties": {"n": {"type": "integer"}}});

        assert!(check(schema.clone(), json!({"n": 5})).is_ok());
        assert!(check(schema.clone(), json!({"n": 5.0})).is_ok());

        let err = check(schema, json!({"n": 5.5})).unwrap_err();
        assert_eq!(err.path, "$.n");
        assert_eq!(err.message, "expected type \"integer\", got \"number\"");
    }

    #[test]
    fn test_number_accepts_integers() {
        let schema = json!({"properties": {"n": {"type": "number"}}});
        assert!(check(schema.clone(), json!({"n": 3})).is_ok());
        assert!(check(schema.clone(), json!({"n": 3.25})).is_ok());
        assert!(check(schema, json!({"n": "3"})).is_err());
    }

    #[test]
    fn test_type_names() {
        let cases = [
            ("string", json!("s"), json!(1)),
            ("boolean", json!(true), json!("true")),
            ("null", json!(null), json!(0)),
            ("array", json!([]), json!({})),
            ("object", json!({}), json!([])),
        ];
        for (ty, good, bad) in cases {
            let schema = json!({"properties": {"v": {"type": ty}}});
            assert!(check(schema.clone(), json!({"v": good})).is_ok(), "{ty} good");
            assert!(check(schema, json!({"v": bad})).is_err(), "{ty} bad");
        }
    }

    #[test]
    fn test_root_must_match_type() {
        let err = check(json!({"type": "array"}), json!({})).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.contains("\"array\""));
    }

    #[test]
    fn test_type_mismatch_skips_other_checks() {
        // minLength would also fail on a number, but only the type is reported
        let schema = json!({"properties": {"v": {"type": "string", "minLength": 10}}});
        let err = check(schema, json!({"v": 7})).unwrap_err();
        assert!(err.message.starts_with("expected type"));
    }

    #[test]
    fn test_absent_optional_properties_are_not_validated() {
        let schema = json!({"properties": {"age": {"type": "integer", "minimum": 0}}});
        assert!(check(schema, json!({"name": "no age"})).is_ok());
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "properties": {"a": {}, "b": {}},
            "additionalProperties": false
        });
        assert!(check(schema.clone(), json!({"a": 1})).is_ok());

        let err = check(schema, json!({"a": 1, "c": 2, "d": 3})).unwrap_err();
        assert_eq!(err.message, "additional properties not allowed: c, d");

        // without properties every field is extra
        let err = check(json!({"additionalProperties": false}), json!({"x": 1})).unwrap_err();
        assert!(err.message.contains("x"));
    }

    #[test]
    fn test_additional_properties_true_is_ignored() {
        let schema = json!({"properties": {}, "additionalProperties": true});
        assert!(check(schema, json!({"anything": 1})).is_ok());
    }

    #[test]
    fn test_array_bounds_and_items() {
        let schema = json!({
            "properties": {
                "tags": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 3,
                    "items": {"type": "string", "minLength": 2}
                }
            }
        });

        assert!(check(schema.clone(), json!({"tags": ["ab", "cd"]})).is_ok());

        let err = check(schema.clone(), json!({"tags": []})).unwrap_err();
        assert!(err.message.contains("minItems"));

        let err = check(schema.clone(), json!({"tags": ["aa", "bb", "cc", "dd"]})).unwrap_err();
        assert!(err.message.contains("maxItems"));

        let err = check(schema, json!({"tags": ["ok", "x"]})).unwrap_err();
        assert_eq!(err.path, "$.tags[1]");
        assert!(err.message.contains("minLength"));
    }

    #[test]
    fn test_string_length_counts_characters() {
        let schema = json!({"properties": {"s": {"maxLength": 3}}});
        assert!(check(schema.clone(), json!({"s": "äöü"})).is_ok());
        assert!(check(schema, json!({"s": "abcd"})).is_err());

        let schema = json!({"properties": {"s": {"minLength": 2, "maxLength": 2}}});
        assert!(check(schema, json!({"s": "ab"})).is_ok());
    }

    #[test]
    fn test_numeric_bounds() {
        let inclusive = json!({"properties": {"n": {"minimum": 0, "maximum": 10}}});
        assert!(check(inclusive.clone(), json!({"n": 0})).is_ok());
        assert!(check(inclusive.clone(), json!({"n": 10})).is_ok());
        assert!(check(inclusive.clone(), json!({"n": -1})).is_err());
        assert!(check(inclusive, json!({"n": 10.5})).is_err());

        let exclusive = json!({"properties": {"n": {"exclusiveMinimum": 0, "exclusiveMaximum": 10}}});
        assert!(check(exclusive.clone(), json!({"n": 5})).is_ok());

        let err = check(exclusive.clone(), json!({"n": 0})).unwrap_err();
        assert!(err.message.contains("exclusiveMinimum"));

        let err = check(exclusive, json!({"n": 10})).unwrap_err();
        assert!(err.message.contains("exclusiveMaximum"));
    }

    #[test]
    fn test_enum() {
        let schema = json!({"properties": {"status": {"enum": ["open", "closed", 1, {"a": [1]}]}}});

        assert!(check(schema.clone(), json!({"status": "open"})).is_ok());
        assert!(check(schema.clone(), json!({"status": 1.0})).is_ok());
        assert!(check(schema.clone(), json!({"status": {"a": [1.0]}})).is_ok());

        let err = check(schema.clone(), json!({"status": "pending"})).unwrap_err();
        assert_eq!(err.path, "$.status");
        assert!(err.message.starts_with("value not in enum"));

        assert!(check(schema, json!({"status": {"a": [1, 2]}})).is_err());
    }

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "chatMessages": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["role"],
                        "properties": {"role": {"enum": ["user", "assistant"]}}
                    }
                }
            }
        });

        let doc = json!({"chatMessages": [
            {"role": "user"},
            {"role": "assistant"},
            {"role": "system"}
        ]});
        let err = check(schema.clone(), doc).unwrap_err();
        assert_eq!(err.path, "$.chatMessages[2].role");

        let err = check(schema, json!({"chatMessages": [{"content": "hi"}]})).unwrap_err();
        assert_eq!(err.path, "$.chatMessages[0]");
        assert_eq!(err.to_string(), "$.chatMessages[0]: missing required field \"role\"");
    }

    #[test]
    fn test_malformed_keywords_are_ignored() {
        let schema = json!({
            "type": ["object", "null"],
            "required": "name",
            "properties": {"n": "not a schema"},
            "minLength": "five"
        });
        assert!(check(schema, json!({"n": 1})).is_ok());
    }

    #[test]
    fn test_fail_fast_reports_first_violation() {
        let schema = json!({
            "required": ["a"],
            "properties": {"b": {"type": "string"}}
        });
        let err = check(schema, json!({"b": 1})).unwrap_err();
        assert!(err.message.contains("missing required field"));
    }
}
