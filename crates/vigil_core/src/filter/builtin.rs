//! The built-in `filter` filter: selects array items.
//!
//! `items | filter:expectation` keeps the items that match `expectation`:
//!
//! - a function: called as `predicate(item, index, items)`, truthy keeps;
//! - a string, number or boolean: case-insensitive substring match against
//!   the item or, for arrays and objects, against any value nested inside
//!   it.  A leading `!` negates the match;
//! - an object: every property of the pattern must match the same property
//!   of the item (recursively).  The `$` key matches against any property;
//! - `null` / `undefined`: keeps everything.

use crate::error::{VigilError, VigilResult};
use crate::objects::js_function::JsFunction;
use crate::objects::value::{MAX_TRAVERSAL_DEPTH, Value};

/// Builds the `filter` filter.
pub fn filter_filter() -> JsFunction {
    JsFunction::native("filter", 2, |_this, args| {
        let input = args.first().cloned().unwrap_or(Value::Undefined);
        let expectation = args.get(1).cloned().unwrap_or(Value::Undefined);
        let items = match &input {
            Value::Array(arr) => arr.borrow().elements().to_vec(),
            v if v.is_nullish() => return Ok(input),
            other => {
                return Err(VigilError::Type(format!(
                    "filter expects an array, got {}",
                    other.type_of()
                )));
            }
        };
        let mut kept = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            if keeps(&expectation, &item, index, &input)? {
                kept.push(item);
            }
        }
        Ok(Value::new_array(kept))
    })
}

fn keeps(expectation: &Value, item: &Value, index: usize, items: &Value) -> VigilResult<bool> {
    Ok(match expectation {
        Value::Function(predicate) => predicate
            .call(
                &Value::Undefined,
                &[item.clone(), Value::Number(index as f64), items.clone()],
            )?
            .to_boolean(),
        v if v.is_nullish() => true,
        Value::Object(_) => matches_pattern(item, expectation, 0),
        _ => deep_match(item, expectation, 0),
    })
}

/// Primitive `expected` against anything: substring match at any depth.
/// Values nested deeper than [`MAX_TRAVERSAL_DEPTH`] never match.
fn deep_match(actual: &Value, expected: &Value, depth: usize) -> bool {
    if let Some(negated) = expected.as_str().and_then(|s| s.strip_prefix('!')) {
        return !deep_match(actual, &Value::from(negated), depth);
    }
    if depth > MAX_TRAVERSAL_DEPTH {
        return false;
    }
    match actual {
        Value::Array(arr) => {
            let elements = arr.borrow().elements().to_vec();
            elements.iter().any(|v| deep_match(v, expected, depth + 1))
        }
        Value::Object(obj) => obj
            .borrow()
            .entries()
            .iter()
            .any(|(_, v)| !v.is_function() && deep_match(v, expected, depth + 1)),
        Value::Function(_) => false,
        v if v.is_nullish() => false,
        _ => contains_ignore_case(actual, expected),
    }
}

/// Object `pattern` against `actual`: every pattern key must match.
fn matches_pattern(actual: &Value, pattern: &Value, depth: usize) -> bool {
    let Value::Object(pattern_obj) = pattern else {
        return deep_match(actual, pattern, depth);
    };
    if depth > MAX_TRAVERSAL_DEPTH {
        return false;
    }
    let entries = pattern_obj.borrow().entries();
    entries.iter().all(|(key, expected)| {
        if expected.is_undefined() {
            return true;
        }
        if key.as_ref() == "$" {
            return deep_match(actual, expected, depth);
        }
        if !actual.is_object_like() {
            return false;
        }
        let value = actual.get_member(key);
        match expected {
            Value::Object(_) => matches_pattern(&value, expected, depth + 1),
            _ => deep_match(&value, expected, depth),
        }
    })
}

fn contains_ignore_case(actual: &Value, expected: &Value) -> bool {
    let haystack = actual.to_js_string().to_lowercase();
    let needle = expected.to_js_string().to_lowercase();
    haystack.contains(&needle)
}
