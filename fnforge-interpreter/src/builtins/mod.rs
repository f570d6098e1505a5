//! Builtin library available to candidate programs
//!
//! Only pure functionality is exposed: no timers, randomness, I/O or
//! module loading.

pub mod array;
pub mod collections;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use indexmap::IndexMap;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{FunctionKind, FunctionValue, NativeFn, Value};

/// Longest array a candidate may build
pub const MAX_ARRAY_LENGTH: usize = 1 << 22;

/// Longest string (in bytes) a candidate may build
pub const MAX_STRING_LENGTH: usize = 1 << 25;

/// A named builtin function
pub type Builtin = (&'static str, NativeFn);

/// Install all globals into the root environment
pub fn install(env: &Environment) {
    env.define("undefined", Value::Undefined);
    env.define("NaN", Value::Number(f64::NAN));
    env.define("Infinity", Value::Number(f64::INFINITY));

    for (name, func) in number::GLOBALS {
        env.define(name, Value::native(*name, *func));
    }

    env.define("Math", math::namespace());
    env.define("JSON", json::namespace());
    env.define("Object", object::constructor());
    env.define("Array", array::constructor());
    env.define("Number", number::constructor());
    env.define("String", string::constructor());
    env.define("Boolean", Value::native("Boolean", boolean));
    env.define("Set", Value::native("Set", collections::set_constructor));
    env.define("Map", Value::native("Map", collections::map_constructor));

    for (name, func) in ERROR_CONSTRUCTORS {
        env.define(name, Value::native(*name, *func));
    }
}

/// Lookup in a method table
pub fn find(table: &[Builtin], name: &str) -> Option<Builtin> {
    table.iter().find(|(method, _)| *method == name).copied()
}

/// Native function carrying static members
pub fn with_statics(name: &'static str, func: NativeFn, statics: &[Builtin]) -> Value {
    let value = Value::native(name, func);
    if let Value::Function(function) = &value {
        let mut properties = function.properties.borrow_mut();
        for (static_name, static_func) in statics {
            properties.insert(
                static_name.to_string(),
                Value::native(*static_name, *static_func),
            );
        }
    }
    value
}

/// Plain object of builtin functions
pub fn namespace(functions: &[Builtin]) -> IndexMap<String, Value> {
    functions
        .iter()
        .map(|(name, func)| (name.to_string(), Value::native(*name, *func)))
        .collect()
}

/// Argument `index`, `undefined` when missing
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// ToIntegerOrInfinity
pub fn to_integer(value: &Value) -> f64 {
    let n = value.to_number();
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolve a possibly negative relative index against `len`
pub fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = to_integer(value);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Call a candidate-supplied callback
pub fn call_back(interp: &mut Interpreter, callback: &Value, args: &[Value]) -> EvalResult<Value> {
    interp.call_function(callback, Value::Undefined, args)
}

/// Fail unless `callback` is callable
pub fn require_callable(callback: &Value) -> EvalResult<()> {
    if matches!(callback, Value::Function(_)) {
        Ok(())
    } else {
        crate::error::type_error(format!("{} is not a function", callback.inspect()))
    }
}

fn boolean(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(arg(args, 0).is_truthy()))
}

const ERROR_CONSTRUCTORS: &[Builtin] = &[
    ("Error", error),
    ("TypeError", type_error),
    ("RangeError", range_error),
    ("SyntaxError", syntax_error),
    ("ReferenceError", reference_error),
];

fn make_error(name: &str, args: &[Value]) -> EvalResult<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        other => other.to_js_string(),
    };
    Ok(Value::error(name, &message))
}

fn error(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error("Error", args)
}

fn type_error(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error("TypeError", args)
}

fn range_error(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error("RangeError", args)
}

fn syntax_error(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error("SyntaxError", args)
}

fn reference_error(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    make_error("ReferenceError", args)
}

/// `value instanceof constructor`
pub fn instance_of(value: &Value, constructor: &Rc<FunctionValue>) -> bool {
    let FunctionKind::Native(native) = &constructor.kind else {
        return false;
    };
    if native.receiver.is_some() {
        return false;
    }

    match (native.name, value) {
        ("Array", Value::Array(_)) => true,
        ("Set", Value::Set(_)) => true,
        ("Map", Value::Map(_)) => true,
        (
            "Object",
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Set(_) | Value::Map(_),
        ) => true,
        ("Error", Value::Object(obj)) => obj.borrow().is_error,
        (name, Value::Object(obj)) if ERROR_CONSTRUCTORS.iter().any(|(n, _)| *n == name) => {
            let obj = obj.borrow();
            obj.is_error
                && obj
                    .properties
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|class| class == name)
        }
        _ => false,
    }
}
