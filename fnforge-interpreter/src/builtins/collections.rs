//! `Set` and `Map`. Membership uses SameValueZero; iteration follows
//! insertion order. `keys()`, `values()` and `entries()` return arrays.

use std::cell::RefCell;
use std::rc::Rc;

use super::{arg, call_back, find, require_callable, Builtin};
use crate::error::{type_error, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

const SET_METHODS: &[Builtin] = &[
    ("add", set_add),
    ("clear", set_clear),
    ("delete", set_delete),
    ("entries", set_entries),
    ("forEach", set_for_each),
    ("has", set_has),
    ("keys", set_values),
    ("values", set_values),
];

const MAP_METHODS: &[Builtin] = &[
    ("clear", map_clear),
    ("delete", map_delete),
    ("entries", map_entries),
    ("forEach", map_for_each),
    ("get", map_get),
    ("has", map_has),
    ("keys", map_keys),
    ("set", map_set),
    ("values", map_values),
];

pub fn set_method(name: &str) -> Option<Builtin> {
    find(SET_METHODS, name)
}

pub fn map_method(name: &str) -> Option<Builtin> {
    find(MAP_METHODS, name)
}

type SetItems = Rc<RefCell<Vec<Value>>>;
type MapEntries = Rc<RefCell<Vec<(Value, Value)>>>;

fn set_of(this: &Value) -> EvalResult<SetItems> {
    match this {
        Value::Set(items) => Ok(items.clone()),
        other => type_error(format!("{} is not a Set", other.inspect())),
    }
}

fn map_of(this: &Value) -> EvalResult<MapEntries> {
    match this {
        Value::Map(entries) => Ok(entries.clone()),
        other => type_error(format!("{} is not a Map", other.inspect())),
    }
}

fn insert_unique(items: &mut Vec<Value>, value: Value) {
    if !items.iter().any(|item| item.same_value_zero(&value)) {
        items.push(value);
    }
}

pub fn set_constructor(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut items = Vec::new();
    let source = arg(args, 0);
    if !source.is_nullish() {
        for value in interp.iterate(&source)? {
            insert_unique(&mut items, value);
        }
    }
    Ok(Value::Set(Rc::new(RefCell::new(items))))
}

fn set_add(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = set_of(this)?;
    let mut items = items.borrow_mut();
    interp.check_array_length(items.len() + 1)?;
    insert_unique(&mut items, arg(args, 0));
    Ok(this.clone())
}

fn set_has(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let value = arg(args, 0);
    let found = set_of(this)?.borrow().iter().any(|item| item.same_value_zero(&value));
    Ok(Value::Boolean(found))
}

fn set_delete(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let value = arg(args, 0);
    let items = set_of(this)?;
    let mut items = items.borrow_mut();
    match items.iter().position(|item| item.same_value_zero(&value)) {
        Some(index) => {
            items.remove(index);
            Ok(Value::Boolean(true))
        }
        None => Ok(Value::Boolean(false)),
    }
}

fn set_clear(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    set_of(this)?.borrow_mut().clear();
    Ok(Value::Undefined)
}

fn set_values(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::array(set_of(this)?.borrow().clone()))
}

fn set_entries(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let items = set_of(this)?.borrow().clone();
    Ok(Value::array(
        items
            .into_iter()
            .map(|item| Value::array(vec![item.clone(), item]))
            .collect(),
    ))
}

fn set_for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = arg(args, 0);
    require_callable(&callback)?;
    let items = set_of(this)?.borrow().clone();
    for item in items {
        call_back(interp, &callback, &[item.clone(), item, this.clone()])?;
    }
    Ok(Value::Undefined)
}

pub fn map_constructor(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut entries: Vec<(Value, Value)> = Vec::new();
    let source = arg(args, 0);
    if !source.is_nullish() {
        for entry in interp.iterate(&source)? {
            if !matches!(entry, Value::Array(_)) {
                return type_error(format!(
                    "Iterator value {} is not an entry object",
                    entry.inspect()
                ));
            }
            let key = interp.get_indexed(&entry, &Value::Number(0.0))?;
            let value = interp.get_indexed(&entry, &Value::Number(1.0))?;
            put(&mut entries, key, value);
        }
    }
    Ok(Value::Map(Rc::new(RefCell::new(entries))))
}

fn put(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

fn map_get(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = arg(args, 0);
    let entries = map_of(this)?;
    let found = entries
        .borrow()
        .iter()
        .find(|(k, _)| k.same_value_zero(&key))
        .map(|(_, v)| v.clone());
    Ok(found.unwrap_or(Value::Undefined))
}

fn map_set(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let entries = map_of(this)?;
    let mut entries = entries.borrow_mut();
    interp.check_array_length(entries.len() + 1)?;
    put(&mut entries, arg(args, 0), arg(args, 1));
    Ok(this.clone())
}

fn map_has(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = arg(args, 0);
    let found = map_of(this)?.borrow().iter().any(|(k, _)| k.same_value_zero(&key));
    Ok(Value::Boolean(found))
}

fn map_delete(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = arg(args, 0);
    let entries = map_of(this)?;
    let mut entries = entries.borrow_mut();
    match entries.iter().position(|(k, _)| k.same_value_zero(&key)) {
        Some(index) => {
            entries.remove(index);
            Ok(Value::Boolean(true))
        }
        None => Ok(Value::Boolean(false)),
    }
}

fn map_clear(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    map_of(this)?.borrow_mut().clear();
    Ok(Value::Undefined)
}

fn map_keys(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let keys = map_of(this)?.borrow().iter().map(|(k, _)| k.clone()).collect();
    Ok(Value::array(keys))
}

fn map_values(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let values = map_of(this)?.borrow().iter().map(|(_, v)| v.clone()).collect();
    Ok(Value::array(values))
}

fn map_entries(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let entries = map_of(this)?
        .borrow()
        .iter()
        .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
        .collect();
    Ok(Value::array(entries))
}

fn map_for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let callback = arg(args, 0);
    require_callable(&callback)?;
    let entries = map_of(this)?.borrow().clone();
    for (key, value) in entries {
        call_back(interp, &callback, &[value, key, this.clone()])?;
    }
    Ok(Value::Undefined)
}
