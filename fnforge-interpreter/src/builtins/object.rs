//! Object constructor and methods shared by all objects

use indexmap::IndexMap;

use super::{arg, find, with_statics, Builtin};
use crate::error::{type_error, EvalResult};
use crate::interpreter::{array_index, Interpreter};
use crate::value::Value;

const STATICS: &[Builtin] = &[
    ("assign", assign),
    ("create", create),
    ("entries", entries),
    ("freeze", identity),
    ("fromEntries", from_entries),
    ("keys", keys),
    ("values", values),
];

const METHODS: &[Builtin] = &[
    ("hasOwnProperty", has_own_property),
    ("toString", to_string),
    ("valueOf", value_of),
];

/// Methods every object-like value answers to
pub fn method(name: &str) -> Option<Builtin> {
    find(METHODS, name)
}

/// The global `Object` function
pub fn constructor() -> Value {
    with_statics("Object", object, STATICS)
}

/// Own enumerable keys in iteration order
pub fn own_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(obj) => obj.borrow().properties.keys().cloned().collect(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        Value::Function(function) => function.properties.borrow().keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn require_object(value: &Value) -> EvalResult<()> {
    if value.is_nullish() {
        return type_error("Cannot convert undefined or null to object");
    }
    Ok(())
}

fn object(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match arg(args, 0) {
        Value::Undefined | Value::Null => Ok(Value::object(IndexMap::new())),
        other => Ok(other),
    }
}

fn create(_interp: &mut Interpreter, _this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::object(IndexMap::new()))
}

fn identity(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(arg(args, 0))
}

fn keys(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object(&target)?;
    Ok(Value::array(
        own_keys(&target).into_iter().map(Value::from).collect(),
    ))
}

fn values(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object(&target)?;
    let mut values = Vec::new();
    for key in own_keys(&target) {
        values.push(interp.get_property(&target, &key)?);
    }
    Ok(Value::array(values))
}

fn entries(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object(&target)?;
    let mut entries = Vec::new();
    for key in own_keys(&target) {
        let value = interp.get_property(&target, &key)?;
        entries.push(Value::array(vec![Value::from(key), value]));
    }
    Ok(Value::array(entries))
}

fn assign(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object(&target)?;
    for source in args.iter().skip(1) {
        for key in own_keys(source) {
            let value = interp.get_property(source, &key)?;
            interp.set_property(&target, &key, value)?;
        }
    }
    Ok(target)
}

fn from_entries(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut properties = IndexMap::new();
    for entry in interp.iterate(&arg(args, 0))? {
        let key = interp.get_indexed(&entry, &Value::Number(0.0))?;
        let value = interp.get_indexed(&entry, &Value::Number(1.0))?;
        properties.insert(key.to_property_key(), value);
    }
    Ok(Value::object(properties))
}

fn has_own_property(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = arg(args, 0).to_property_key();
    let found = match this {
        Value::Object(obj) => obj.borrow().properties.contains_key(&key),
        Value::Array(items) => array_index(&key).is_some_and(|i| i < items.borrow().len()),
        Value::Function(function) => function.properties.borrow().contains_key(&key),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

fn to_string(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(this.to_js_string()))
}

fn value_of(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(this.clone())
}
