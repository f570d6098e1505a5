//! The `Math` namespace. `Math.random` is deliberately absent: candidates
//! must be deterministic.

use super::{arg, Builtin};
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

const FUNCTIONS: &[Builtin] = &[
    ("abs", abs),
    ("acos", acos),
    ("asin", asin),
    ("atan", atan),
    ("atan2", atan2),
    ("cbrt", cbrt),
    ("ceil", ceil),
    ("cos", cos),
    ("exp", exp),
    ("floor", floor),
    ("hypot", hypot),
    ("log", log),
    ("log10", log10),
    ("log2", log2),
    ("max", max),
    ("min", min),
    ("pow", pow),
    ("round", round),
    ("sign", sign),
    ("sin", sin),
    ("sqrt", sqrt),
    ("tan", tan),
    ("trunc", trunc),
];

const CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

pub fn namespace() -> Value {
    let mut properties = super::namespace(FUNCTIONS);
    for (name, value) in CONSTANTS {
        properties.insert(name.to_string(), Value::Number(*value));
    }
    Value::object(properties)
}

fn number_arg(args: &[Value], index: usize) -> f64 {
    arg(args, index).to_number()
}

macro_rules! unary {
    ($($name:ident => $op:expr),* $(,)?) => {
        $(
            fn $name(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
                let op: fn(f64) -> f64 = $op;
                Ok(Value::Number(op(number_arg(args, 0))))
            }
        )*
    };
}

unary! {
    abs => f64::abs,
    acos => f64::acos,
    asin => f64::asin,
    atan => f64::atan,
    cbrt => f64::cbrt,
    ceil => f64::ceil,
    cos => f64::cos,
    exp => f64::exp,
    floor => f64::floor,
    log => f64::ln,
    log10 => f64::log10,
    log2 => f64::log2,
    round => js_round,
    sign => js_sign,
    sin => f64::sin,
    sqrt => f64::sqrt,
    tan => f64::tan,
    trunc => f64::trunc,
}

/// Halves round towards +Infinity
fn js_round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn js_sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn atan2(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(number_arg(args, 0).atan2(number_arg(args, 1))))
}

fn pow(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let base = number_arg(args, 0);
    let exponent = number_arg(args, 1);
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(base.powf(exponent)))
}

fn hypot(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let sum: f64 = args.iter().map(|a| a.to_number().powi(2)).sum();
    Ok(Value::Number(sum.sqrt()))
}

fn max(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut result = f64::NEG_INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(Value::Number(result))
}

fn min(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut result = f64::INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(Value::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_round() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(0.49999999999999994), 0.0);
        assert_eq!(js_round(-0.4), -0.0);
        assert!(js_round(f64::NAN).is_nan());
    }

    #[test]
    fn test_js_sign() {
        assert_eq!(js_sign(-3.0), -1.0);
        assert_eq!(js_sign(0.0), 0.0);
        assert!(js_sign(f64::NAN).is_nan());
    }
}
