//! Runtime value representation for the interpreter

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use fnforge_core::ast::{Function, Literal};

use crate::environment::Environment;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;

/// Signature of builtin functions. The second argument is the receiver
/// (`this`), `Undefined` for plain calls.
pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>;

/// Runtime value representation
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<FunctionValue>),
    Set(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
}

/// A plain object; error objects are flagged so `instanceof` and string
/// conversion can recognise them
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub properties: IndexMap<String, Value>,
    pub is_error: bool,
}

pub struct FunctionValue {
    pub kind: FunctionKind,
    /// Static members such as `Array.isArray`
    pub properties: RefCell<IndexMap<String, Value>>,
}

pub enum FunctionKind {
    Closure(Closure),
    Native(NativeFunction),
}

/// Function closure
pub struct Closure {
    pub function: Arc<Function>,
    /// Captured environment
    pub env: Environment,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
    /// Receiver bound when the function was read off a value as a method
    pub receiver: Option<Value>,
}

impl FunctionValue {
    pub fn name(&self) -> String {
        match &self.kind {
            FunctionKind::Closure(closure) => closure.function.name.clone().unwrap_or_default(),
            FunctionKind::Native(native) => native.name.to_string(),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            properties,
            is_error: false,
        })))
    }

    pub fn closure(function: Arc<Function>, env: Environment) -> Self {
        Value::Function(Rc::new(FunctionValue {
            kind: FunctionKind::Closure(Closure { function, env }),
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Value::Function(Rc::new(FunctionValue {
            kind: FunctionKind::Native(NativeFunction {
                name,
                func,
                receiver: None,
            }),
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    /// A builtin method bound to `receiver`
    pub fn method(name: &'static str, func: NativeFn, receiver: &Value) -> Self {
        Value::Function(Rc::new(FunctionValue {
            kind: FunctionKind::Native(NativeFunction {
                name,
                func,
                receiver: Some(receiver.clone()),
            }),
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    /// An error object with the given constructor name
    pub fn error(name: &str, message: &str) -> Self {
        let mut properties = IndexMap::new();
        properties.insert("name".to_string(), Value::string(name));
        properties.insert("message".to_string(), Value::string(message));
        Value::Object(Rc::new(RefCell::new(Object {
            properties,
            is_error: true,
        })))
    }

    pub fn from_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::string(s.as_str()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Null => Value::Null,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Array(_) | Value::Object(_) | Value::Set(_) | Value::Map(_) => "object",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric conversion with JavaScript rules
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// ToInt32 conversion used by bitwise operators
    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
        wrapped as u32 as i32
    }

    pub fn to_uint32(&self) -> u32 {
        self.to_int32() as u32
    }

    /// String conversion with JavaScript rules
    pub fn to_js_string(&self) -> String {
        let mut visiting = Vec::new();
        self.js_string_inner(&mut visiting)
    }

    fn js_string_inner(&self, visiting: &mut Vec<*const ()>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if visiting.contains(&ptr) {
                    return String::new();
                }
                visiting.push(ptr);
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.js_string_inner(visiting)
                        }
                    })
                    .collect();
                visiting.pop();
                parts.join(",")
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                if obj.is_error {
                    let name = obj
                        .properties
                        .get("name")
                        .map(|v| v.to_js_string())
                        .unwrap_or_else(|| "Error".to_string());
                    let message = obj
                        .properties
                        .get("message")
                        .map(|v| v.to_js_string())
                        .unwrap_or_default();
                    if message.is_empty() {
                        name
                    } else {
                        format!("{}: {}", name, message)
                    }
                } else {
                    "[object Object]".to_string()
                }
            }
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Value::Set(_) => "[object Set]".to_string(),
            Value::Map(_) => "[object Map]".to_string(),
        }
    }

    /// Property key conversion
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.same_reference(other),
        }
    }

    /// Equality used by `includes`, `Set` and `Map`: like `===` but NaN
    /// equals itself
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (a, b) if a.is_primitive() != b.is_primitive() => {
                let (object, primitive) = if a.is_primitive() { (b, a) } else { (a, b) };
                Value::string(object.to_js_string()).loose_equals(primitive)
            }
            _ => self.strict_equals(other),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_)
        )
    }

    fn same_reference(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Human-readable rendering used in diagnostics: JSON-like, but keeps
    /// `undefined`, `NaN` and functions visible
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        let mut visiting = Vec::new();
        self.inspect_inner(&mut out, &mut visiting);
        out
    }

    fn inspect_inner(&self, out: &mut String, visiting: &mut Vec<*const ()>) {
        let ptr = match self {
            Value::Array(rc) | Value::Set(rc) => Some(Rc::as_ptr(rc) as *const ()),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const ()),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const ()),
            _ => None,
        };
        if let Some(ptr) = ptr {
            if visiting.contains(&ptr) {
                out.push_str("[Circular]");
                return;
            }
            visiting.push(ptr);
        }

        match self {
            Value::String(s) => out.push_str(&quote_string(s)),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.inspect_inner(out, visiting);
                }
                out.push(']');
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                if obj.is_error {
                    out.push_str(&self.to_js_string());
                } else {
                    out.push('{');
                    for (i, (key, value)) in obj.properties.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        out.push_str(&quote_string(key));
                        out.push(':');
                        value.inspect_inner(out, visiting);
                    }
                    out.push('}');
                }
            }
            Value::Set(items) => {
                let items = items.borrow();
                out.push_str(&format!("Set({}) {{", items.len()));
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.inspect_inner(out, visiting);
                }
                out.push('}');
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                out.push_str(&format!("Map({}) {{", entries.len()));
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    key.inspect_inner(out, visiting);
                    out.push_str(" => ");
                    value.inspect_inner(out, visiting);
                }
                out.push('}');
            }
            Value::Function(f) => {
                let name = f.name();
                if name.is_empty() {
                    out.push_str("[Function (anonymous)]");
                } else {
                    out.push_str(&format!("[Function: {}]", name));
                }
            }
            scalar => out.push_str(&scalar.to_js_string()),
        }

        if ptr.is_some() {
            visiting.pop();
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inspect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

/// Quote a string the way JSON does
pub fn quote_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// JavaScript Number-to-String
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    // exponent form: 1e+21, 1.5e-7
    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

/// JavaScript String-to-Number
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    if sign > 0.0 && trimmed.len() > 2 {
        let radix = match trimmed.get(..2) {
            Some("0x") | Some("0X") => Some(16),
            Some("0o") | Some("0O") => Some(8),
            Some("0b") | Some("0B") => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return u64::from_str_radix(&trimmed[2..], radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }

    let valid = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map(|v| sign * v).unwrap_or(f64::NAN)
}
