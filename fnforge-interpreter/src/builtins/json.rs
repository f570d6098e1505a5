//! The `JSON` namespace

use super::{arg, Builtin};
use crate::convert::from_json;
use crate::error::{throw, type_error, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, quote_string, Value};

const FUNCTIONS: &[Builtin] = &[("stringify", stringify), ("parse", parse)];

pub fn namespace() -> Value {
    Value::object(super::namespace(FUNCTIONS))
}

fn stringify(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let indent = match arg(args, 2) {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    match stringify_value(&arg(args, 0), &indent)? {
        Some(text) => {
            interp.check_string_length(text.len())?;
            Ok(Value::from(text))
        }
        None => Ok(Value::Undefined),
    }
}

fn parse(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = arg(args, 0).to_js_string();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(from_json(&json)),
        Err(err) => throw("SyntaxError", format!("Unexpected token in JSON: {}", err)),
    }
}

/// Render a value the way `JSON.stringify` does
pub fn stringify_value(value: &Value, indent: &str) -> EvalResult<Option<String>> {
    let mut writer = JsonWriter {
        indent: indent.to_string(),
        out: String::new(),
        visiting: Vec::new(),
    };
    Ok(writer.write(value, "")?.then_some(writer.out))
}

struct JsonWriter {
    indent: String,
    out: String,
    visiting: Vec<*const ()>,
}

impl JsonWriter {
    /// Append `value`; false when it has no JSON form (undefined, functions)
    fn write(&mut self, value: &Value, current: &str) -> EvalResult<bool> {
        match value {
            Value::Undefined | Value::Function(_) => return Ok(false),
            Value::Null => self.out.push_str("null"),
            Value::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => self.out.push_str(&number_to_string(*n)),
            Value::Number(_) => self.out.push_str("null"),
            Value::String(s) => self.out.push_str(&quote_string(s)),
            Value::Array(items) => {
                self.enter(std::rc::Rc::as_ptr(items) as *const ())?;
                let items = items.borrow().clone();
                let inner = format!("{}{}", current, self.indent);
                self.out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    self.newline(&inner);
                    if !self.write(item, &inner)? {
                        self.out.push_str("null");
                    }
                }
                if !items.is_empty() {
                    self.newline(current);
                }
                self.out.push(']');
                self.visiting.pop();
            }
            Value::Object(obj) => {
                self.enter(std::rc::Rc::as_ptr(obj) as *const ())?;
                let entries: Vec<(String, Value)> = if obj.borrow().is_error {
                    Vec::new()
                } else {
                    obj.borrow()
                        .properties
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                };
                let inner = format!("{}{}", current, self.indent);
                self.out.push('{');
                let mut wrote_any = false;
                for (key, item) in &entries {
                    let mark = self.out.len();
                    if wrote_any {
                        self.out.push(',');
                    }
                    self.newline(&inner);
                    self.out.push_str(&quote_string(key));
                    self.out.push(':');
                    if !self.indent.is_empty() {
                        self.out.push(' ');
                    }
                    if self.write(item, &inner)? {
                        wrote_any = true;
                    } else {
                        self.out.truncate(mark);
                    }
                }
                if wrote_any {
                    self.newline(current);
                }
                self.out.push('}');
                self.visiting.pop();
            }
            Value::Set(_) | Value::Map(_) => self.out.push_str("{}"),
        }
        Ok(true)
    }

    fn enter(&mut self, ptr: *const ()) -> EvalResult<()> {
        if self.visiting.contains(&ptr) {
            return type_error("Converting circular structure to JSON");
        }
        self.visiting.push(ptr);
        Ok(())
    }

    fn newline(&mut self, indent: &str) {
        if !self.indent.is_empty() {
            self.out.push('\n');
            self.out.push_str(indent);
        }
    }
}
