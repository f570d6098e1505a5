//! Number constructor, number methods and the numeric globals

use super::{arg, find, to_integer, Builtin};
use crate::error::{range_error, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{number_to_string, Value};

/// Largest integer that survives a round trip through f64
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(super) const GLOBALS: &[Builtin] = &[
    ("parseInt", parse_int),
    ("parseFloat", parse_float),
    ("isNaN", is_nan_global),
    ("isFinite", is_finite_global),
];

const STATICS: &[Builtin] = &[
    ("isInteger", is_integer),
    ("isSafeInteger", is_safe_integer),
    ("isFinite", is_finite),
    ("isNaN", is_nan),
    ("parseInt", parse_int),
    ("parseFloat", parse_float),
];

const METHODS: &[Builtin] = &[
    ("toFixed", to_fixed),
    ("toPrecision", to_precision),
    ("toString", to_string),
    ("valueOf", value_of),
];

/// Method of a number value
pub fn method(name: &str) -> Option<Builtin> {
    find(METHODS, name)
}

/// The global `Number` function with its constants
pub fn constructor() -> Value {
    let value = super::with_statics("Number", number, STATICS);
    if let Value::Function(function) = &value {
        let mut properties = function.properties.borrow_mut();
        for (name, constant) in [
            ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
            ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("EPSILON", f64::EPSILON),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ] {
            properties.insert(name.to_string(), Value::Number(constant));
        }
    }
    value
}

fn number(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)))
}

fn is_integer(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(
        arg(args, 0),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0
    )))
}

fn is_safe_integer(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(
        arg(args, 0),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
    )))
}

fn is_finite(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
}

fn is_nan(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
}

fn is_finite_global(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(arg(args, 0).to_number().is_finite()))
}

fn is_nan_global(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(arg(args, 0).to_number().is_nan()))
}

fn parse_int(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = arg(args, 0).to_js_string();
    let radix = match arg(args, 1) {
        Value::Undefined => 0,
        other => other.to_int32(),
    };
    Ok(Value::Number(parse_int_str(&text, radix)))
}

/// `parseInt`: the longest valid digit prefix in `radix`
pub fn parse_int_str(text: &str, radix: i32) -> f64 {
    let text = text.trim_start();
    let (sign, mut digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };

    let mut radix = radix;
    if radix == 0 || radix == 16 {
        if let Some(rest) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            digits = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut result = 0.0;
    let mut any = false;
    for c in digits.chars() {
        match c.to_digit(radix as u32) {
            Some(d) => {
                result = result * f64::from(radix) + f64::from(d);
                any = true;
            }
            None => break,
        }
    }
    if any {
        sign * result
    } else {
        f64::NAN
    }
}

fn parse_float(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = arg(args, 0).to_js_string();
    Ok(Value::Number(parse_float_str(&text)))
}

/// `parseFloat`: the longest prefix that reads as a decimal literal
pub fn parse_float_str(text: &str) -> f64 {
    let text = text.trim_start();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    if unsigned.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }

    let bytes = unsigned.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    unsigned[..end]
        .parse::<f64>()
        .map(|v| sign * v)
        .unwrap_or(f64::NAN)
}

fn this_number(this: &Value) -> f64 {
    this.to_number()
}

fn value_of(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(this_number(this)))
}

fn to_fixed(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(this);
    let digits = to_integer(&arg(args, 0));
    if !(0.0..=100.0).contains(&digits) {
        return range_error("toFixed() digits argument must be between 0 and 100");
    }
    Ok(Value::from(format_fixed(n, digits as usize)))
}

/// `Number.prototype.toFixed`; exact ties round away from zero
pub fn format_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }

    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();

    // every finite double has at most 1074 fractional decimal digits
    let exact = format!("{:.*}", digits + 1075, abs);
    let point = exact.find('.').unwrap_or(exact.len());
    let cut = if digits == 0 { point } else { point + 1 + digits };
    let rest = exact[cut..].trim_start_matches('.');

    let is_tie = rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0');
    if is_tie {
        return format!("{}{}", sign, increment_decimal(&exact[..cut]));
    }
    format!("{}{:.*}", sign, digits, abs)
}

/// Add one unit in the last place of a plain decimal string
fn increment_decimal(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    for c in chars.iter_mut().rev() {
        match c {
            '.' => continue,
            '9' => *c = '0',
            digit => {
                *digit = (*digit as u8 + 1) as char;
                return chars.into_iter().collect();
            }
        }
    }
    std::iter::once('1').chain(chars).collect()
}

fn to_precision(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(this);
    let precision = match arg(args, 0) {
        Value::Undefined => return Ok(Value::from(number_to_string(n))),
        other => to_integer(&other),
    };
    if !(1.0..=100.0).contains(&precision) {
        return range_error("toPrecision() argument must be between 1 and 100");
    }
    if !n.is_finite() {
        return Ok(Value::from(number_to_string(n)));
    }
    let precision = precision as usize;
    if n == 0.0 {
        return Ok(Value::from(format_fixed(0.0, precision - 1)));
    }

    let exponent = n.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision as i32 {
        let formatted = format!("{:.*e}", precision - 1, n);
        return Ok(Value::from(match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        }));
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    Ok(Value::from(format_fixed(n, decimals)))
}

fn to_string(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(this);
    let radix = match arg(args, 0) {
        Value::Undefined => 10,
        other => to_integer(&other) as i64,
    };
    if !(2..=36).contains(&radix) {
        return range_error("toString() radix must be between 2 and 36");
    }
    if radix == 10 || !n.is_finite() {
        return Ok(Value::from(number_to_string(n)));
    }
    Ok(Value::from(format_radix(n, radix as u32)))
}

/// Render `n` in `radix`, with up to 20 fractional digits
pub fn format_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let abs = n.abs();
    let mut integer = abs.trunc();
    let mut fraction = abs - integer;

    let mut digits = Vec::new();
    if integer == 0.0 {
        digits.push('0');
    }
    while integer >= 1.0 {
        let d = (integer % f64::from(radix)) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        integer = (integer / f64::from(radix)).trunc();
    }
    digits.reverse();

    let mut out: String = digits.into_iter().collect();
    if fraction > 0.0 {
        out.push('.');
        for _ in 0..20 {
            fraction *= f64::from(radix);
            let d = fraction.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            fraction -= fraction.trunc();
            if fraction == 0.0 {
                break;
            }
        }
    }

    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_str() {
        assert_eq!(parse_int_str("42px", 0), 42.0);
        assert_eq!(parse_int_str("  -17", 0), -17.0);
        assert_eq!(parse_int_str("0x1A", 0), 26.0);
        assert_eq!(parse_int_str("101", 2), 5.0);
        assert!(parse_int_str("abc", 10).is_nan());
        assert!(parse_int_str("5", 40).is_nan());
    }

    #[test]
    fn test_parse_float_str() {
        assert_eq!(parse_float_str("3.14abc"), 3.14);
        assert_eq!(parse_float_str(".5"), 0.5);
        assert_eq!(parse_float_str("1e3x"), 1000.0);
        assert_eq!(parse_float_str("2e"), 2.0);
        assert_eq!(parse_float_str("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float_str("x1").is_nan());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(3.14159, 2), "3.14");
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(1.005, 2), "1.00");
        assert_eq!(format_fixed(-1.5, 0), "-2");
        assert_eq!(format_fixed(42.0, 3), "42.000");
        assert_eq!(format_fixed(0.05, 1), "0.1");
        assert_eq!(format_fixed(0.15, 1), "0.1");
        assert_eq!(format_fixed(9.5, 0), "10");
        assert_eq!(format_fixed(0.995, 2), "0.99");
    }

    #[test]
    fn test_format_radix() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(5.0, 2), "101");
        assert_eq!(format_radix(-8.0, 8), "-10");
        assert_eq!(format_radix(0.5, 2), "0.1");
    }
}
