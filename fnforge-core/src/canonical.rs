//! Canonical serialization
//!
//! Structurally equal values serialize to the same text regardless of the
//! order their object fields were inserted in. Cache keys are derived from
//! this text so equal requests always collide.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Render a JSON value with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // serializing a plain string cannot fail
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Derive the stable cache key for any serializable request
pub fn canonical_key<T: Serialize + ?Sized>(request: &T) -> Result<String> {
    let value = serde_json::to_value(request)?;
    let digest = Sha256::digest(canonical_json(&value).as_bytes());
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorted_keys() {
        let value = json!({"b": 1, "a": {"d": [3, {"z": null, "y": true}], "c": "s"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"s","d":[3,{"y":true,"z":null}]},"b":1}"#
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(
            canonical_key(&json!([1, 2])).unwrap(),
            canonical_key(&json!([2, 1])).unwrap()
        );
    }

    #[test]
    fn test_key_is_hex_digest() {
        let key = canonical_key(&json!({"model": "gpt-4"})).unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
