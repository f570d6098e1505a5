//! Conversion between runtime values and JSON, and structural equality

use indexmap::IndexMap;
use std::rc::Rc;

use crate::error::{InterpreterError, InterpreterResult};
use crate::value::Value;

/// Values nested deeper than this cannot leave the interpreter
pub const MAX_JSON_DEPTH: usize = 512;

/// Build a runtime value from JSON
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s.as_str()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}

/// Convert a result value to JSON.
///
/// `undefined`, non-finite numbers and functions become `null`; integral
/// numbers become JSON integers; sets become arrays and maps objects.
pub fn to_json(value: &Value) -> InterpreterResult<serde_json::Value> {
    let mut visiting = Vec::new();
    to_json_inner(value, &mut visiting)
}

fn to_json_inner(
    value: &Value,
    visiting: &mut Vec<*const ()>,
) -> InterpreterResult<serde_json::Value> {
    Ok(match value {
        Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) => {
            enter(Rc::as_ptr(items) as *const (), visiting)?;
            let items = items.borrow().clone();
            let converted = items
                .iter()
                .map(|item| to_json_inner(item, visiting))
                .collect::<InterpreterResult<Vec<_>>>()?;
            visiting.pop();
            serde_json::Value::Array(converted)
        }
        Value::Set(items) => {
            enter(Rc::as_ptr(items) as *const (), visiting)?;
            let items = items.borrow().clone();
            let converted = items
                .iter()
                .map(|item| to_json_inner(item, visiting))
                .collect::<InterpreterResult<Vec<_>>>()?;
            visiting.pop();
            serde_json::Value::Array(converted)
        }
        Value::Object(obj) => {
            enter(Rc::as_ptr(obj) as *const (), visiting)?;
            let properties = obj.borrow().properties.clone();
            let mut map = serde_json::Map::new();
            for (key, item) in &properties {
                map.insert(key.clone(), to_json_inner(item, visiting)?);
            }
            visiting.pop();
            serde_json::Value::Object(map)
        }
        Value::Map(entries) => {
            enter(Rc::as_ptr(entries) as *const (), visiting)?;
            let entries = entries.borrow().clone();
            let mut map = serde_json::Map::new();
            for (key, item) in &entries {
                map.insert(key.to_property_key(), to_json_inner(item, visiting)?);
            }
            visiting.pop();
            serde_json::Value::Object(map)
        }
    })
}

fn enter(ptr: *const (), visiting: &mut Vec<*const ()>) -> InterpreterResult<()> {
    if visiting.contains(&ptr) {
        return Err(InterpreterError::Conversion(
            "cyclic structure cannot be converted to JSON".to_string(),
        ));
    }
    if visiting.len() >= MAX_JSON_DEPTH {
        return Err(InterpreterError::Conversion(format!(
            "value nested deeper than {} levels",
            MAX_JSON_DEPTH
        )));
    }
    visiting.push(ptr);
    Ok(())
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= crate::builtins::number::MAX_SAFE_INTEGER {
        // -0 becomes 0
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Structural equality used to compare outputs with expectations.
///
/// NaN equals NaN and 0 equals -0; `undefined` and `null` differ; arrays
/// compare in order, objects by key set, sets and maps by membership.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_inner(a, b, 0)
}

fn deep_equal_inner(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_JSON_DEPTH {
        return false;
    }
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(a, b)| deep_equal_inner(a, b, depth + 1))
        }
        (Value::Object(x), Value::Object(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.properties.len() == y.properties.len()
                && x.properties.iter().all(|(key, a)| {
                    y.properties
                        .get(key)
                        .is_some_and(|b| deep_equal_inner(a, b, depth + 1))
                })
        }
        (Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter()
                    .all(|a| y.iter().any(|b| deep_equal_inner(a, b, depth + 1)))
        }
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(ka, va)| {
                    y.iter().any(|(kb, vb)| {
                        deep_equal_inner(ka, kb, depth + 1) && deep_equal_inner(va, vb, depth + 1)
                    })
                })
        }
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_preserves_key_order() {
        let input = json!({"zeta": 1, "alpha": [true, null, "s"], "mid": {"x": 1.5}});
        let value = from_json(&input);
        let output = to_json(&value).unwrap();
        assert_eq!(output.to_string(), input.to_string());
    }

    #[test]
    fn test_to_json_special_values() {
        let value = Value::array(vec![
            Value::Undefined,
            Value::Number(f64::NAN),
            Value::Number(-0.0),
            Value::Number(3.0),
            Value::Number(0.5),
        ]);
        assert_eq!(to_json(&value).unwrap(), json!([null, null, 0, 3, 0.5]));
    }

    #[test]
    fn test_to_json_rejects_cycles() {
        let array = Value::array(vec![]);
        if let Value::Array(items) = &array {
            items.borrow_mut().push(array.clone());
        }
        assert!(matches!(
            to_json(&array),
            Err(InterpreterError::Conversion(_))
        ));
        if let Value::Array(items) = &array {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_deep_equal() {
        assert!(deep_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(deep_equal(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!deep_equal(&Value::Undefined, &Value::Null));

        let a = from_json(&json!({"a": 1, "b": [1, 2]}));
        let b = from_json(&json!({"b": [1, 2], "a": 1}));
        assert!(deep_equal(&a, &b));

        let c = from_json(&json!({"a": 1, "b": [2, 1]}));
        assert!(!deep_equal(&a, &c));
        assert!(!deep_equal(&from_json(&json!([1])), &from_json(&json!({"0": 1}))));
    }
}
