//! String methods
//!
//! Positions count Unicode scalar values, so `"héllo".length` is 5.

use std::cmp::Ordering;

use super::{arg, call_back, find, relative_index, to_integer, with_statics, Builtin};
use crate::error::{range_error, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

const METHODS: &[Builtin] = &[
    ("at", at),
    ("charAt", char_at),
    ("charCodeAt", char_code_at),
    ("codePointAt", code_point_at),
    ("concat", concat),
    ("endsWith", ends_with),
    ("includes", includes),
    ("indexOf", index_of),
    ("lastIndexOf", last_index_of),
    ("localeCompare", locale_compare),
    ("padEnd", pad_end),
    ("padStart", pad_start),
    ("repeat", repeat),
    ("replace", replace),
    ("replaceAll", replace_all),
    ("slice", slice),
    ("split", split),
    ("startsWith", starts_with),
    ("substr", substr),
    ("substring", substring),
    ("toLowerCase", to_lower_case),
    ("toString", to_string),
    ("toUpperCase", to_upper_case),
    ("trim", trim),
    ("trimEnd", trim_end),
    ("trimStart", trim_start),
    ("valueOf", to_string),
];

const STATICS: &[Builtin] = &[("fromCharCode", from_char_code)];

/// Method of a string value
pub fn method(name: &str) -> Option<Builtin> {
    find(METHODS, name)
}

/// The global `String` function
pub fn constructor() -> Value {
    with_statics("String", string, STATICS)
}

fn string(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(match args.first() {
        Some(value) => Value::from(value.to_js_string()),
        None => Value::from(""),
    })
}

fn from_char_code(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units: Vec<u16> = args.iter().map(|a| a.to_uint32() as u16).collect();
    Ok(Value::from(String::from_utf16_lossy(&units)))
}

fn chars_of(this: &Value) -> Vec<char> {
    match this {
        Value::String(s) => s.chars().collect(),
        other => other.to_js_string().chars().collect(),
    }
}

fn text_of(this: &Value) -> String {
    this.to_js_string()
}

fn char_value(c: Option<&char>) -> Value {
    match c {
        Some(c) => Value::from(c.to_string()),
        None => Value::from(""),
    }
}

/// Char index of `needle` in `haystack`, searching from `from`
fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

fn rfind_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = (haystack.len() - needle.len()).min(from);
    (0..=last).rev().find(|&i| haystack[i..].starts_with(needle))
}

fn collect(chars: &[char]) -> Value {
    Value::from(chars.iter().collect::<String>())
}

fn at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let n = to_integer(&arg(args, 0));
    let index = if n < 0.0 { chars.len() as f64 + n } else { n };
    if index < 0.0 || index >= chars.len() as f64 {
        return Ok(Value::Undefined);
    }
    Ok(char_value(chars.get(index as usize)))
}

fn char_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let n = to_integer(&arg(args, 0));
    if n < 0.0 {
        return Ok(Value::from(""));
    }
    Ok(char_value(chars.get(n as usize)))
}

fn char_code_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let n = to_integer(&arg(args, 0));
    if n < 0.0 {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(match chars.get(n as usize) {
        Some(c) => {
            let mut units = [0u16; 2];
            Value::Number(f64::from(c.encode_utf16(&mut units)[0]))
        }
        None => Value::Number(f64::NAN),
    })
}

fn code_point_at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let n = to_integer(&arg(args, 0));
    if n < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(match chars.get(n as usize) {
        Some(c) => Value::Number(f64::from(*c as u32)),
        None => Value::Undefined,
    })
}

fn concat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut out = text_of(this);
    for value in args {
        out.push_str(&value.to_js_string());
        interp.check_string_length(out.len())?;
    }
    Ok(Value::from(out))
}

fn starts_with(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(args, 0));
    let position = relative_clamped(&arg(args, 1), chars.len(), 0);
    Ok(Value::Boolean(chars[position..].starts_with(&needle)))
}

fn ends_with(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(args, 0));
    let end = relative_clamped(&arg(args, 1), chars.len(), chars.len());
    Ok(Value::Boolean(chars[..end].ends_with(&needle)))
}

/// Non-negative position clamped to `len` (negative values become 0)
fn relative_clamped(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    to_integer(value).clamp(0.0, len as f64) as usize
}

fn includes(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(args, 0));
    let from = relative_clamped(&arg(args, 1), chars.len(), 0);
    Ok(Value::Boolean(find_chars(&chars, &needle, from).is_some()))
}

fn index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(args, 0));
    let from = relative_clamped(&arg(args, 1), chars.len(), 0);
    Ok(position(find_chars(&chars, &needle, from)))
}

fn last_index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(args, 0));
    let from = match arg(args, 1).to_number() {
        n if n.is_nan() => chars.len(),
        n => n.clamp(0.0, chars.len() as f64) as usize,
    };
    Ok(position(rfind_chars(&chars, &needle, from)))
}

fn position(found: Option<usize>) -> Value {
    Value::Number(found.map(|i| i as f64).unwrap_or(-1.0))
}

fn locale_compare(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let this = text_of(this);
    let other = arg(args, 0).to_js_string();
    Ok(Value::Number(match this.cmp(&other) {
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
        Ordering::Greater => 1.0,
    }))
}

fn padding(interp: &Interpreter, this: &Value, args: &[Value]) -> EvalResult<Option<String>> {
    let len = this.to_js_string().chars().count();
    let target = to_integer(&arg(args, 0));
    if target <= len as f64 {
        return Ok(None);
    }
    let fill: Vec<char> = match arg(args, 1) {
        Value::Undefined => vec![' '],
        other => other.to_js_string().chars().collect(),
    };
    if fill.is_empty() {
        return Ok(None);
    }
    let needed = target as usize - len;
    interp.check_string_length(needed)?;
    Ok(Some(fill.iter().cycle().take(needed).collect()))
}

fn pad_start(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    Ok(match padding(interp, this, args)? {
        Some(pad) => Value::from(pad + &text),
        None => Value::from(text),
    })
}

fn pad_end(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    Ok(match padding(interp, this, args)? {
        Some(pad) => Value::from(text + &pad),
        None => Value::from(text),
    })
}

fn repeat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    let count = to_integer(&arg(args, 0));
    if count < 0.0 || count.is_infinite() {
        return range_error(format!("Invalid count value: {}", arg(args, 0).to_js_string()));
    }
    let count = count as usize;
    interp.check_string_length(text.len().saturating_mul(count))?;
    Ok(Value::from(text.repeat(count)))
}

/// Replacement text for one match
fn replacement(
    interp: &mut Interpreter,
    replacer: &Value,
    matched: &str,
    offset: usize,
    text: &str,
) -> EvalResult<String> {
    match replacer {
        Value::Function(_) => {
            let args = [
                Value::from(matched),
                Value::Number(offset as f64),
                Value::from(text),
            ];
            Ok(call_back(interp, replacer, &args)?.to_js_string())
        }
        other => Ok(other.to_js_string().replace("$&", matched)),
    }
}

fn replace(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    let pattern = arg(args, 0).to_js_string();
    let replacer = arg(args, 1);

    let Some(start) = text.find(&pattern) else {
        return Ok(Value::from(text));
    };
    let offset = text[..start].chars().count();
    let with = replacement(interp, &replacer, &pattern, offset, &text)?;

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..start]);
    out.push_str(&with);
    out.push_str(&text[start + pattern.len()..]);
    interp.check_string_length(out.len())?;
    Ok(Value::from(out))
}

fn replace_all(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    let pattern = arg(args, 0).to_js_string();
    let replacer = arg(args, 1);

    let mut matches: Vec<usize> = if pattern.is_empty() {
        text.char_indices().map(|(i, _)| i).collect()
    } else {
        text.match_indices(&pattern).map(|(i, _)| i).collect()
    };
    if pattern.is_empty() {
        matches.push(text.len());
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for start in matches {
        out.push_str(&text[last..start]);
        let offset = text[..start].chars().count();
        out.push_str(&replacement(interp, &replacer, &pattern, offset, &text)?);
        interp.check_string_length(out.len())?;
        last = start + pattern.len();
    }
    out.push_str(&text[last..]);
    Ok(Value::from(out))
}

fn slice(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let start = relative_index(&arg(args, 0), chars.len(), 0);
    let end = relative_index(&arg(args, 1), chars.len(), chars.len());
    if start >= end {
        return Ok(Value::from(""));
    }
    Ok(collect(&chars[start..end]))
}

fn substring(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let start = relative_clamped(&arg(args, 0), chars.len(), 0);
    let end = relative_clamped(&arg(args, 1), chars.len(), chars.len());
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(collect(&chars[start..end]))
}

fn substr(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let chars = chars_of(this);
    let start = relative_index(&arg(args, 0), chars.len(), 0);
    let length = match arg(args, 1) {
        Value::Undefined => chars.len() - start,
        other => to_integer(&other).clamp(0.0, (chars.len() - start) as f64) as usize,
    };
    Ok(collect(&chars[start..start + length]))
}

fn split(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = text_of(this);
    let limit = match arg(args, 1) {
        Value::Undefined => usize::MAX,
        other => other.to_uint32() as usize,
    };

    let parts: Vec<Value> = match arg(args, 0) {
        Value::Undefined => vec![Value::from(text)],
        separator => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                text.chars()
                    .take(limit)
                    .map(|c| Value::from(c.to_string()))
                    .collect()
            } else {
                text.split(separator.as_str())
                    .take(limit)
                    .map(Value::from)
                    .collect()
            }
        }
    };
    let parts: Vec<Value> = parts.into_iter().take(limit).collect();
    interp.check_array_length(parts.len())?;
    Ok(Value::array(parts))
}

fn to_string(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this)))
}

fn to_lower_case(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this).to_lowercase()))
}

fn to_upper_case(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this).to_uppercase()))
}

fn trim(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this).trim()))
}

fn trim_start(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this).trim_start()))
}

fn trim_end(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::from(text_of(this).trim_end()))
}
