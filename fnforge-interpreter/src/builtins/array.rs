//! Array constructor and methods

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::{
    arg, call_back, find, relative_index, require_callable, to_integer, with_statics, Builtin,
};
use crate::error::{range_error, type_error, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

const METHODS: &[Builtin] = &[
    ("at", at),
    ("concat", concat),
    ("entries", entries),
    ("every", every),
    ("fill", fill),
    ("filter", filter),
    ("find", find_item),
    ("findIndex", find_index),
    ("findLast", find_last),
    ("findLastIndex", find_last_index),
    ("flat", flat),
    ("flatMap", flat_map),
    ("forEach", for_each),
    ("includes", includes),
    ("indexOf", index_of),
    ("join", join),
    ("keys", keys),
    ("lastIndexOf", last_index_of),
    ("map", map),
    ("pop", pop),
    ("push", push),
    ("reduce", reduce),
    ("reduceRight", reduce_right),
    ("reverse", reverse),
    ("shift", shift),
    ("slice", slice),
    ("some", some),
    ("sort", sort),
    ("splice", splice),
    ("toReversed", to_reversed),
    ("toSorted", to_sorted),
    ("toString", to_string),
    ("unshift", unshift),
    ("values", values),
];

const STATICS: &[Builtin] = &[("isArray", is_array), ("from", from), ("of", of)];

/// Method of an array value
pub fn method(name: &str) -> Option<Builtin> {
    find(METHODS, name)
}

/// The global `Array` function
pub fn constructor() -> Value {
    with_statics("Array", array, STATICS)
}

type Items = Rc<RefCell<Vec<Value>>>;

fn items_of(this: &Value) -> EvalResult<Items> {
    match this {
        Value::Array(items) => Ok(items.clone()),
        other => type_error(format!("{} is not an array", other.inspect())),
    }
}

/// Copy of the current elements, so callbacks may mutate the array
fn snapshot(this: &Value) -> EvalResult<Vec<Value>> {
    Ok(items_of(this)?.borrow().clone())
}

fn array(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args {
        [Value::Number(n)] => {
            if *n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
                return range_error("Invalid array length");
            }
            let len = *n as usize;
            interp.check_array_length(len)?;
            Ok(Value::array(vec![Value::Undefined; len]))
        }
        _ => Ok(Value::array(args.to_vec())),
    }
}

fn is_array(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(matches!(arg(args, 0), Value::Array(_))))
}

fn from(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let source = arg(args, 0);
    let items = match &source {
        Value::Object(obj) => {
            // array-likes such as `{ length: n }`
            let len = obj
                .borrow()
                .properties
                .get("length")
                .map(to_integer)
                .unwrap_or(0.0)
                .max(0.0);
            if len > super::MAX_ARRAY_LENGTH as f64 {
                return range_error("Invalid array length");
            }
            let mut items = Vec::with_capacity(len as usize);
            for index in 0..len as usize {
                items.push(interp.get_property(&source, &index.to_string())?);
            }
            items
        }
        Value::Undefined | Value::Null => {
            return type_error(format!("{} is not iterable", source.to_js_string()))
        }
        other => interp.iterate(other)?,
    };

    let mapper = arg(args, 1);
    if matches!(mapper, Value::Undefined) {
        return Ok(Value::array(items));
    }
    require_callable(&mapper)?;
    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        mapped.push(call_back(interp, &mapper, &[item, Value::Number(index as f64)])?);
    }
    Ok(Value::array(mapped))
}

fn of(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::array(args.to_vec()))
}

fn at(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let items = items.borrow();
    let n = to_integer(&arg(args, 0));
    let index = if n < 0.0 { items.len() as f64 + n } else { n };
    if index < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(index as usize).cloned().unwrap_or(Value::Undefined))
}

fn push(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let mut items = items.borrow_mut();
    interp.check_array_length(items.len() + args.len())?;
    items.extend_from_slice(args);
    Ok(Value::Number(items.len() as f64))
}

fn pop(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or(Value::Undefined))
}

fn shift(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(items.remove(0))
}

fn unshift(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let mut items = items.borrow_mut();
    interp.check_array_length(items.len() + args.len())?;
    items.splice(0..0, args.iter().cloned());
    Ok(Value::Number(items.len() as f64))
}

fn slice(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let start = relative_index(&arg(args, 0), items.len(), 0);
    let end = relative_index(&arg(args, 1), items.len(), items.len());
    if start >= end {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(items[start..end].to_vec()))
}

fn splice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    let mut items = items.borrow_mut();
    let len = items.len();
    let start = relative_index(&arg(args, 0), len, 0);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => to_integer(&args[1]).clamp(0.0, (len - start) as f64) as usize,
    };
    let inserted = args.get(2..).unwrap_or_default();
    interp.check_array_length(len - delete_count + inserted.len())?;

    let removed: Vec<Value> = items
        .splice(start..start + delete_count, inserted.iter().cloned())
        .collect();
    Ok(Value::array(removed))
}

fn concat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut result = snapshot(this)?;
    for value in args {
        match value {
            Value::Array(other) => result.extend(other.borrow().iter().cloned()),
            other => result.push(other.clone()),
        }
        interp.check_array_length(result.len())?;
    }
    Ok(Value::array(result))
}

fn join_items(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn join(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".to_string(),
        other => other.to_js_string(),
    };
    let joined = join_items(&items, &separator);
    interp.check_string_length(joined.len())?;
    Ok(Value::from(joined))
}

fn to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    join(interp, this, &[])
}

fn reverse(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    items_of(this)?.borrow_mut().reverse();
    Ok(this.clone())
}

fn to_reversed(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let mut items = snapshot(this)?;
    items.reverse();
    Ok(Value::array(items))
}

fn index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let target = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, item)| item.strict_equals(&target))
        .map(|(i, _)| i as f64);
    Ok(Value::Number(found.unwrap_or(-1.0)))
}

fn last_index_of(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let target = arg(args, 0);
    let found = items
        .iter()
        .rposition(|item| item.strict_equals(&target))
        .map(|i| i as f64);
    Ok(Value::Number(found.unwrap_or(-1.0)))
}

fn includes(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let target = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    Ok(Value::Boolean(
        items.iter().skip(from).any(|item| item.same_value_zero(&target)),
    ))
}

/// Run `callback(item, index, array)` over a snapshot until `stop` says so.
/// Returns the index it stopped at.
fn scan(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    reverse: bool,
    stop: impl Fn(&Value) -> bool,
) -> EvalResult<Option<(usize, Value)>> {
    let items = snapshot(this)?;
    let callback = arg(args, 0);
    require_callable(&callback)?;

    let indices: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..items.len()).rev())
    } else {
        Box::new(0..items.len())
    };
    for index in indices {
        let item = items[index].clone();
        let result = call_back(
            interp,
            &callback,
            &[item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if stop(&result) {
            return Ok(Some((index, item)));
        }
    }
    Ok(None)
}

fn find_item(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, Value::is_truthy)?;
    Ok(found.map(|(_, item)| item).unwrap_or(Value::Undefined))
}

fn find_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, Value::is_truthy)?;
    Ok(Value::Number(found.map(|(i, _)| i as f64).unwrap_or(-1.0)))
}

fn find_last(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, true, Value::is_truthy)?;
    Ok(found.map(|(_, item)| item).unwrap_or(Value::Undefined))
}

fn find_last_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, true, Value::is_truthy)?;
    Ok(Value::Number(found.map(|(i, _)| i as f64).unwrap_or(-1.0)))
}

fn some(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, Value::is_truthy)?;
    Ok(Value::Boolean(found.is_some()))
}

fn every(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, |v| !v.is_truthy())?;
    Ok(Value::Boolean(found.is_none()))
}

fn for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    scan(interp, this, args, false, |_| false)?;
    Ok(Value::Undefined)
}

fn map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let callback = arg(args, 0);
    require_callable(&callback)?;

    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        mapped.push(call_back(
            interp,
            &callback,
            &[item, Value::Number(index as f64), this.clone()],
        )?);
    }
    Ok(Value::array(mapped))
}

fn filter(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let callback = arg(args, 0);
    require_callable(&callback)?;

    let mut kept = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let keep = call_back(
            interp,
            &callback,
            &[item.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if keep.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn fold(interp: &mut Interpreter, this: &Value, args: &[Value], reverse: bool) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let callback = arg(args, 0);
    require_callable(&callback)?;

    let mut indices: Vec<usize> = (0..items.len()).collect();
    if reverse {
        indices.reverse();
    }
    let mut indices = indices.into_iter();

    let mut accumulator = if args.len() >= 2 {
        args[1].clone()
    } else {
        match indices.next() {
            Some(first) => items[first].clone(),
            None => return type_error("Reduce of empty array with no initial value"),
        }
    };

    for index in indices {
        accumulator = call_back(
            interp,
            &callback,
            &[
                accumulator,
                items[index].clone(),
                Value::Number(index as f64),
                this.clone(),
            ],
        )?;
    }
    Ok(accumulator)
}

fn reduce(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interp, this, args, false)
}

fn reduce_right(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interp, this, args, true)
}

fn flatten_into(interp: &Interpreter, out: &mut Vec<Value>, items: &[Value], depth: f64) -> EvalResult<()> {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => {
                let inner = inner.borrow().clone();
                flatten_into(interp, out, &inner, depth - 1.0)?;
            }
            other => {
                out.push(other.clone());
                interp.check_array_length(out.len())?;
            }
        }
    }
    Ok(())
}

fn flat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let depth = match arg(args, 0) {
        Value::Undefined => 1.0,
        // `Infinity` flattens completely
        other => to_integer(&other).min(10_000.0),
    };
    let mut out = Vec::new();
    flatten_into(interp, &mut out, &items, depth)?;
    Ok(Value::array(out))
}

fn flat_map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mapped = map(interp, this, args)?;
    let mapped = snapshot(&mapped)?;
    let mut out = Vec::new();
    flatten_into(interp, &mut out, &mapped, 1.0)?;
    Ok(Value::array(out))
}

fn fill(_interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = items_of(this)?;
    {
        let mut items = items.borrow_mut();
        let len = items.len();
        let start = relative_index(&arg(args, 1), len, 0);
        let end = relative_index(&arg(args, 2), len, len);
        let value = arg(args, 0);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    }
    Ok(this.clone())
}

fn keys(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let len = items_of(this)?.borrow().len();
    Ok(Value::array((0..len).map(|i| Value::Number(i as f64)).collect()))
}

fn values(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::array(snapshot(this)?))
}

fn entries(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    Ok(Value::array(
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Value::array(vec![Value::Number(i as f64), item]))
            .collect(),
    ))
}

fn sort(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    let sorted = sort_values(interp, items, &arg(args, 0))?;
    *items_of(this)?.borrow_mut() = sorted;
    Ok(this.clone())
}

fn to_sorted(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let items = snapshot(this)?;
    Ok(Value::array(sort_values(interp, items, &arg(args, 0))?))
}

fn sort_values(interp: &mut Interpreter, items: Vec<Value>, comparator: &Value) -> EvalResult<Vec<Value>> {
    if !matches!(comparator, Value::Undefined) {
        require_callable(comparator)?;
    }

    // undefined always sorts last and is never passed to the comparator
    let (mut defined, undefined): (Vec<Value>, Vec<Value>) = items
        .into_iter()
        .partition(|item| !matches!(item, Value::Undefined));

    let mut compare = |a: &Value, b: &Value| -> EvalResult<Ordering> {
        if matches!(comparator, Value::Undefined) {
            return Ok(a.to_js_string().cmp(&b.to_js_string()));
        }
        let result = call_back(interp, comparator, &[a.clone(), b.clone()])?.to_number();
        Ok(if result < 0.0 {
            Ordering::Less
        } else if result > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        })
    };

    merge_sort(&mut defined, &mut compare)?;
    defined.extend(undefined);
    Ok(defined)
}

/// Stable merge sort with a fallible comparator. Inconsistent comparators
/// produce some permutation rather than a panic.
fn merge_sort<F>(items: &mut Vec<Value>, compare: &mut F) -> EvalResult<()>
where
    F: FnMut(&Value, &Value) -> EvalResult<Ordering>,
{
    if items.len() <= 1 {
        return Ok(());
    }
    let mut right = items.split_off(items.len() / 2);
    merge_sort(items, compare)?;
    merge_sort(&mut right, compare)?;

    let left = std::mem::take(items);
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare(b, a)? == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    *items = merged;
    Ok(())
}
