//! Runtime value representation.
//!
//! This module provides [`Value`], the enum that can hold any value an
//! expression can produce, together with type-checking predicates, the three
//! abstract type-conversion operations of ECMAScript §7.1
//! ([`to_boolean`][Value::to_boolean], [`to_number`][Value::to_number],
//! [`to_js_string`][Value::to_js_string]), the equality relations the
//! evaluator and the digest loop rely on, and member access.

use std::fmt;
use std::rc::Rc;

use crate::error::VigilResult;
use crate::objects::js_array::{ArrayRef, JsArray};
use crate::objects::js_function::{FunctionRef, JsFunction};
use crate::objects::js_object::{JsObject, ObjectRef};

/// Nesting depth past which structural traversals stop descending: joins
/// render empty, deep equality falls back to identity and deep clones share
/// the remaining subtree.
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Allocation address of an array or object, used to spot cycles.
type RefPtr = *const ();

/// Any value an expression can produce.
///
/// Primitive variants carry their data inline; arrays, objects and functions
/// are shared reference types whose identity is the `Rc` allocation.
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// A double-precision number.
    Number(f64),
    /// An immutable string.
    String(Rc<str>),
    /// A shared, mutable array.
    Array(ArrayRef),
    /// A shared, mutable plain object.
    Object(ObjectRef),
    /// A callable.
    Function(FunctionRef),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow: nested containers may be cyclic.
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", number_to_string(*n)),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Array(a) => write!(f, "[Array({})]", a.borrow().len()),
            Self::Object(o) => write!(f, "[Object({} keys)]", o.borrow().len()),
            Self::Function(func) => write!(f, "[Function {}]", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<JsObject> for Value {
    fn from(o: JsObject) -> Self {
        Self::Object(o.into_ref())
    }
}

impl From<JsArray> for Value {
    fn from(a: JsArray) -> Self {
        Self::Array(a.into_ref())
    }
}

impl From<JsFunction> for Value {
    fn from(f: JsFunction) -> Self {
        Self::Function(f.into_ref())
    }
}

impl Value {
    /// Creates a new empty plain object.
    pub fn new_object() -> Self {
        Self::Object(JsObject::new().into_ref())
    }

    /// Creates an array from `elements`.
    pub fn new_array(elements: Vec<Value>) -> Self {
        Self::Array(JsArray::from_vec(elements).into_ref())
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Type-checking predicates
// ──────────────────────────────────────────────────────────────────────────────

impl Value {
    /// Returns `true` if this value is `undefined`.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` if this value is `null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if this value is `null` or `undefined`.
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Returns `true` if this value is a number.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns `true` if this value is a string.
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns `true` if this value is a function.
    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Returns `true` for arrays, objects and functions.
    #[inline]
    pub fn is_object_like(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_) | Self::Function(_))
    }

    /// Returns the string slice if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Abstract type-conversion operations (ECMAScript §7.1)
// ──────────────────────────────────────────────────────────────────────────────

impl Value {
    /// ECMAScript §7.1.2 **ToBoolean**.
    ///
    /// | Value type | Result |
    /// |---|---|
    /// | `Undefined` / `Null` | `false` |
    /// | `Boolean` | the boolean itself |
    /// | `Number` | `false` if `+0.0`, `-0.0`, or `NaN`; otherwise `true` |
    /// | `String` | `false` if the string is empty; otherwise `true` |
    /// | `Array` / `Object` / `Function` | `true` |
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => !n.is_nan() && *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// ECMAScript §7.1.4 **ToNumber**.
    ///
    /// Reference types go through their string form, so `[]` is `0`, `[7]` is
    /// `7` and plain objects are `NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Array(_) => string_to_number(&self.to_js_string()),
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    /// ECMAScript §7.1.17 **ToString**.
    ///
    /// Named `to_js_string` to avoid ambiguity with [`ToString::to_string`].
    /// Arrays join their elements with `,` (nullish elements render empty).
    /// An array that contains itself renders empty at the point of recursion.
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.to_string(),
            Self::Array(a) => join_elements(a, &mut Vec::new()),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
        }
    }

    /// Converts this value to a property key.
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }

    /// Returns the `typeof` string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Equality
// ──────────────────────────────────────────────────────────────────────────────

impl Value {
    /// `===`: same type and value; reference types compare by identity and
    /// `NaN` is unequal to itself.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Identity used for change detection: `===` except that `NaN` equals
    /// `NaN`.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// `==`: the abstract equality comparison.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined | Self::Null, Self::Undefined | Self::Null) => true,
            (Self::Undefined | Self::Null, _) | (_, Self::Undefined | Self::Null) => false,
            (Self::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Self::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Self::Number(a), Self::String(_)) => *a == other.to_number(),
            (Self::String(_), Self::Number(b)) => self.to_number() == *b,
            (Self::Number(_) | Self::String(_), _) if other.is_object_like() => {
                self.loose_equals(&Value::from(other.to_js_string()))
            }
            (_, Self::Number(_) | Self::String(_)) if self.is_object_like() => {
                Value::from(self.to_js_string()).loose_equals(other)
            }
            _ => self.strict_equals(other),
        }
    }

    /// Structural equality: arrays compare element-wise, plain objects
    /// compare key sets and values recursively, everything else uses
    /// [`identical`][Value::identical]. A pair of references already being
    /// compared further up counts as equal, so cyclic graphs terminate.
    pub fn deep_equals(&self, other: &Value) -> bool {
        self.deep_equals_in(other, &mut Vec::new())
    }

    fn deep_equals_in(&self, other: &Value, open: &mut Vec<(RefPtr, RefPtr)>) -> bool {
        if self.identical(other) {
            return true;
        }
        let (Some(left), Some(right)) = (self.ref_ptr(), other.ref_ptr()) else {
            return false;
        };
        if open.contains(&(left, right)) {
            return true;
        }
        if open.len() >= MAX_TRAVERSAL_DEPTH {
            return false;
        }
        open.push((left, right));
        let equal = match (self, other) {
            (Self::Array(a), Self::Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.elements()
                        .iter()
                        .zip(b.elements())
                        .all(|(x, y)| x.deep_equals_in(y, open))
            }
            (Self::Object(a), Self::Object(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.entries().iter().all(|(k, v)| {
                        b.get_own_property(k)
                            .is_some_and(|other_v| v.deep_equals_in(&other_v, open))
                    })
            }
            _ => false,
        };
        open.pop();
        equal
    }

    /// Returns a structural copy: arrays and plain objects are copied
    /// recursively, primitives and functions are shared. A reference back to
    /// an enclosing array or object points at that container's copy.
    pub fn deep_clone(&self) -> Value {
        self.deep_clone_in(&mut Vec::new())
    }

    fn deep_clone_in(&self, open: &mut Vec<(RefPtr, Value)>) -> Value {
        let Some(ptr) = self.ref_ptr() else {
            return self.clone();
        };
        if let Some((_, copy)) = open.iter().find(|(p, _)| *p == ptr) {
            return copy.clone();
        }
        if open.len() >= MAX_TRAVERSAL_DEPTH {
            return self.clone();
        }
        match self {
            Self::Array(a) => {
                let copy = JsArray::new().into_ref();
                open.push((ptr, Value::Array(Rc::clone(&copy))));
                let elements = a.borrow().elements().to_vec();
                for element in &elements {
                    let element = element.deep_clone_in(open);
                    copy.borrow_mut().push(element);
                }
                open.pop();
                Value::Array(copy)
            }
            Self::Object(o) => {
                let copy = JsObject::new().into_ref();
                open.push((ptr, Value::Object(Rc::clone(&copy))));
                let entries = o.borrow().entries();
                for (k, v) in entries {
                    let v = v.deep_clone_in(open);
                    copy.borrow_mut().set_property(&k, v);
                }
                open.pop();
                Value::Object(copy)
            }
            other => other.clone(),
        }
    }

    fn ref_ptr(&self) -> Option<RefPtr> {
        match self {
            Self::Array(a) => Some(Rc::as_ptr(a).cast()),
            Self::Object(o) => Some(Rc::as_ptr(o).cast()),
            _ => None,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Member access
// ──────────────────────────────────────────────────────────────────────────────

impl Value {
    /// Reads member `key`.  Nullish receivers and missing members yield
    /// [`Value::Undefined`].
    pub fn get_member(&self, key: &str) -> Value {
        match self {
            Self::Object(o) => o.borrow().get_property(key),
            Self::Array(a) => {
                let a = a.borrow();
                if key == "length" {
                    Value::Number(a.len() as f64)
                } else {
                    match parse_index(key) {
                        Some(i) => a.get(i),
                        None => Value::Undefined,
                    }
                }
            }
            Self::String(s) => {
                if key == "length" {
                    Value::Number(s.encode_utf16().count() as f64)
                } else {
                    parse_index(key)
                        .and_then(|i| s.chars().nth(i))
                        .map_or(Value::Undefined, |c| Value::from(c.to_string()))
                }
            }
            Self::Function(f) => match key {
                "name" => Value::from(f.name()),
                "length" => Value::Number(f64::from(f.param_count())),
                "call" => Value::from(JsFunction::call_of(Rc::clone(f))),
                "apply" => Value::from(JsFunction::apply_of(Rc::clone(f))),
                "bind" => Value::from(JsFunction::bind_of(Rc::clone(f))),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        }
    }

    /// Returns `true` if `key` is readable on this value (the `in` operator).
    pub fn has_member(&self, key: &str) -> bool {
        match self {
            Self::Object(o) => o.borrow().has_property(key),
            Self::Array(a) => key == "length" || parse_index(key).is_some_and(|i| i < a.borrow().len()),
            Self::Function(_) => matches!(key, "name" | "length" | "call" | "apply" | "bind"),
            _ => false,
        }
    }

    /// Writes member `key`.  Returns `false` when the receiver cannot hold
    /// properties (primitives, functions) or the write was rejected.
    pub fn set_member(&self, key: &str, value: Value) -> bool {
        self.try_set_member(key, value).unwrap_or(false)
    }

    /// Like [`set_member`][Value::set_member], but an array write that
    /// would grow past [`MAX_ARRAY_LENGTH`] is a [`VigilError::Type`].
    ///
    /// [`MAX_ARRAY_LENGTH`]: crate::objects::js_array::MAX_ARRAY_LENGTH
    /// [`VigilError::Type`]: crate::error::VigilError::Type
    pub fn try_set_member(&self, key: &str, value: Value) -> VigilResult<bool> {
        match self {
            Self::Object(o) => {
                o.borrow_mut().set_property(key, value);
                Ok(true)
            }
            Self::Array(a) => {
                let mut a = a.borrow_mut();
                if key == "length" {
                    let n = value.to_number();
                    if n >= 0.0 && n.fract() == 0.0 {
                        a.set_length(n as usize)?;
                        return Ok(true);
                    }
                    Ok(false)
                } else if let Some(i) = parse_index(key) {
                    a.set(i, value)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────────────────────────────────────

/// Formats an `f64` as a JavaScript number string (ECMAScript §7.1.12.1).
///
/// Special cases: `NaN → "NaN"`, `+∞ → "Infinity"`, `-∞ → "-Infinity"`,
/// and both `+0.0` and `-0.0` → `"0"`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// StringToNumber: whitespace-trimmed decimal literal, `Infinity`, or `NaN`.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust also accepts "inf"/"nan"; JavaScript does not.
        _ if trimmed
            .chars()
            .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
        {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// `Array.prototype.join(",")` over `array`; an array already on the `open`
/// stack renders empty.
fn join_elements(array: &ArrayRef, open: &mut Vec<RefPtr>) -> String {
    let ptr: RefPtr = Rc::as_ptr(array).cast();
    if open.contains(&ptr) || open.len() >= MAX_TRAVERSAL_DEPTH {
        return String::new();
    }
    open.push(ptr);
    let elements = array.borrow().elements().to_vec();
    let joined = elements
        .iter()
        .map(|v| match v {
            Value::Array(inner) => join_elements(inner, open),
            v if v.is_nullish() => String::new(),
            v => v.to_js_string(),
        })
        .collect::<Vec<_>>()
        .join(",");
    open.pop();
    joined
}

/// Parses a canonical array index (`"0"`, `"17"`, not `"01"` or `"-1"`).
fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        let o: JsObject = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::from(o)
    }

    // ── Conversions ──────────────────────────────────────────────────────────

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(Value::new_array(vec![]).to_boolean());
        assert!(Value::new_object().to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::from(true).to_number(), 1.0);
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert!(Value::from("abc").to_number().is_nan());
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::from("-Infinity").to_number(), f64::NEG_INFINITY);
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        assert_eq!(Value::new_array(vec![]).to_number(), 0.0);
        assert_eq!(Value::new_array(vec![Value::from(7)]).to_number(), 7.0);
        assert!(Value::new_object().to_number().is_nan());
    }

    #[test]
    fn test_to_js_string() {
        assert_eq!(Value::Number(42.0).to_js_string(), "42");
        assert_eq!(Value::Number(-0.0).to_js_string(), "0");
        assert_eq!(Value::Number(1.5).to_js_string(), "1.5");
        assert_eq!(Value::Number(f64::NAN).to_js_string(), "NaN");
        assert_eq!(Value::Number(f64::INFINITY).to_js_string(), "Infinity");
        let arr = Value::new_array(vec![Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(arr.to_js_string(), "1,,x");
        assert_eq!(Value::new_object().to_js_string(), "[object Object]");
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::from(1).type_of(), "number");
        assert_eq!(
            Value::from(JsFunction::native("f", 0, |_, _| Ok(Value::Undefined))).type_of(),
            "function"
        );
    }

    // ── Equality ─────────────────────────────────────────────────────────────

    #[test]
    fn test_strict_equals_nan_is_unequal() {
        let nan = Value::Number(f64::NAN);
        assert!(!nan.strict_equals(&nan));
        assert!(nan.identical(&nan));
    }

    #[test]
    fn test_strict_equals_reference_identity() {
        let a = Value::new_object();
        let b = Value::new_object();
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
    }

    #[test]
    fn test_loose_equals() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::from(0)));
        assert!(Value::from(1).loose_equals(&Value::from("1")));
        assert!(Value::from(true).loose_equals(&Value::from(1)));
        assert!(Value::from("").loose_equals(&Value::from(0)));
        assert!(Value::new_array(vec![Value::from(2)]).loose_equals(&Value::from(2)));
        assert!(!Value::from("a").loose_equals(&Value::from("b")));
    }

    #[test]
    fn test_deep_equals_structural() {
        let a = obj(&[
            ("x", Value::from(1)),
            ("list", Value::new_array(vec![Value::from(1), Value::from(2)])),
        ]);
        let b = obj(&[
            ("x", Value::from(1)),
            ("list", Value::new_array(vec![Value::from(1), Value::from(2)])),
        ]);
        assert!(a.deep_equals(&b));
        assert!(!a.strict_equals(&b));
        let c = obj(&[("x", Value::from(1))]);
        assert!(!a.deep_equals(&c));
    }

    #[test]
    fn test_deep_equals_nan_elements() {
        let a = Value::new_array(vec![Value::Number(f64::NAN)]);
        let b = Value::new_array(vec![Value::Number(f64::NAN)]);
        assert!(a.deep_equals(&b));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let inner = Value::new_array(vec![Value::from(1)]);
        let original = obj(&[("inner", inner.clone())]);
        let copy = original.deep_clone();
        assert!(copy.deep_equals(&original));
        inner.set_member("1", Value::from(2));
        assert!(!copy.deep_equals(&original));
        assert_eq!(copy.get_member("inner").get_member("length").to_number(), 1.0);
    }

    #[test]
    fn test_cyclic_values_terminate() {
        let a = Value::new_object();
        a.set_member("me", a.clone());
        a.set_member("n", Value::from(1));
        let copy = a.deep_clone();
        assert!(!copy.strict_equals(&a));
        assert!(copy.get_member("me").strict_equals(&copy));
        assert!(copy.deep_equals(&a));
        copy.set_member("n", Value::from(2));
        assert!(!copy.deep_equals(&a));

        let list = Value::new_array(vec![Value::from(1)]);
        list.set_member("1", list.clone());
        assert_eq!(list.to_js_string(), "1,");
        assert!(list.deep_clone().deep_equals(&list));
    }

    #[test]
    fn test_very_deep_values_stop_descending() {
        let mut nested = Value::new_array(vec![]);
        for _ in 0..(MAX_TRAVERSAL_DEPTH + 10) {
            nested = Value::new_array(vec![nested]);
        }
        assert_eq!(nested.to_js_string(), "");
        assert!(nested.deep_equals(&nested.clone()));
        assert!(nested.deep_clone().deep_equals(&nested));
    }

    // ── Member access ────────────────────────────────────────────────────────

    #[test]
    fn test_get_member_on_nullish_is_undefined() {
        assert!(Value::Undefined.get_member("a").is_undefined());
        assert!(Value::Null.get_member("a").is_undefined());
    }

    #[test]
    fn test_array_members() {
        let arr = Value::new_array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(arr.get_member("length").to_number(), 2.0);
        assert_eq!(arr.get_member("1").to_js_string(), "b");
        assert!(arr.get_member("01").is_undefined());
        assert!(arr.set_member("3", Value::from("d")));
        assert_eq!(arr.get_member("length").to_number(), 4.0);
        assert!(arr.set_member("length", Value::from(1)));
        assert_eq!(arr.to_js_string(), "a");
    }

    #[test]
    fn test_oversized_array_writes_are_rejected() {
        let arr = Value::new_array(vec![]);
        assert!(arr.try_set_member("18446744073709551615", Value::from(1)).is_err());
        assert!(arr.try_set_member("length", Value::from(1e12)).is_err());
        assert!(!arr.set_member("length", Value::from(1e12)));
        assert_eq!(arr.get_member("length").to_number(), 0.0);
        assert!(!arr.try_set_member("99999999999999999999999", Value::from(1)).unwrap());
    }

    #[test]
    fn test_string_members() {
        let s = Value::from("héllo");
        assert_eq!(s.get_member("length").to_number(), 5.0);
        assert_eq!(s.get_member("1").to_js_string(), "é");
        assert!(!s.set_member("x", Value::from(1)));
    }

    #[test]
    fn test_function_members_expose_intrinsics() {
        let f = Value::from(JsFunction::native("greet", 2, |_, _| Ok(Value::Undefined)));
        assert_eq!(f.get_member("name").to_js_string(), "greet");
        assert_eq!(f.get_member("length").to_number(), 2.0);
        let Value::Function(call) = f.get_member("call") else {
            panic!("expected call intrinsic");
        };
        assert!(call.is_call_apply_bind());
        assert!(f.get_member("constructor").is_undefined());
    }
}
