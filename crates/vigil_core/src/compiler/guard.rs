//! Runtime containment checks applied by compiled evaluators.
//!
//! Two independent layers:
//!
//! 1. [`ensure_safe_member_name`] rejects a fixed set of member names before
//!    any read or write, computed or not.
//! 2. [`ensure_safe_object`] inspects the concrete *value* reached through an
//!    identifier, member, call argument, call result or assignment, and
//!    rejects anything that structurally resembles a global window, a DOM
//!    node, the `Function`/`Object` constructors, or
//!    `Function.prototype.call`/`apply`/`bind`.  A disallowed global can be
//!    reached without ever spelling a disallowed name, so the value check
//!    cannot be folded into the name check.

use crate::error::{VigilError, VigilResult};
use crate::objects::js_function::JsFunction;
use crate::objects::js_object::JsObject;
use crate::objects::value::Value;

/// Member names that are never readable or writable from an expression.
pub const DISALLOWED_MEMBER_NAMES: &[&str] = &[
    "constructor",
    "__proto__",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// Fails with [`VigilError::Security`] if `name` is a disallowed member name.
pub fn ensure_safe_member_name(name: &str) -> VigilResult<()> {
    if DISALLOWED_MEMBER_NAMES.contains(&name) {
        return Err(VigilError::Security(format!(
            "attempting to access a disallowed field '{name}'"
        )));
    }
    Ok(())
}

/// Fails with [`VigilError::Security`] if `value` must not flow through an
/// expression.  Returns the value unchanged otherwise.
pub fn ensure_safe_object(value: Value) -> VigilResult<Value> {
    match &value {
        Value::Object(obj) => {
            let obj_ref = obj.borrow();
            if is_window_like(&obj_ref, &value) {
                return Err(VigilError::Security(
                    "referencing the window in expressions is disallowed".into(),
                ));
            }
            if is_dom_like(&obj_ref) {
                return Err(VigilError::Security(
                    "referencing DOM nodes in expressions is disallowed".into(),
                ));
            }
            if obj_ref.get_property("constructor").identical(&value) {
                return Err(VigilError::Security(
                    "referencing a constructor in expressions is disallowed".into(),
                ));
            }
        }
        Value::Function(func) => {
            check_function(func)?;
        }
        _ => {}
    }
    Ok(value)
}

/// Callee check: rejects the same intrinsics as [`ensure_safe_object`].
pub fn ensure_safe_function(func: &JsFunction) -> VigilResult<()> {
    check_function(func)
}

fn check_function(func: &JsFunction) -> VigilResult<()> {
    if func.is_global_constructor() {
        return Err(VigilError::Security(format!(
            "referencing the {} constructor in expressions is disallowed",
            func.name()
        )));
    }
    if func.is_call_apply_bind() {
        return Err(VigilError::Security(
            "referencing call, apply or bind in expressions is disallowed".into(),
        ));
    }
    Ok(())
}

/// `obj.window === obj`
fn is_window_like(obj: &JsObject, value: &Value) -> bool {
    obj.get_property("window").identical(value)
}

/// `obj.children && (obj.nodeName || (obj.prop && obj.attr && obj.find))`
fn is_dom_like(obj: &JsObject) -> bool {
    let truthy = |key: &str| obj.get_property(key).to_boolean();
    truthy("children") && (truthy("nodeName") || (truthy("prop") && truthy("attr") && truthy("find")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_with(pairs: &[(&str, Value)]) -> Value {
        let o: JsObject = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::from(o)
    }

    #[test]
    fn test_disallowed_names() {
        for name in DISALLOWED_MEMBER_NAMES {
            assert!(ensure_safe_member_name(name).is_err_and(|e| e.is_security()));
        }
        assert!(ensure_safe_member_name("constructors").is_ok());
        assert!(ensure_safe_member_name("proto").is_ok());
    }

    #[test]
    fn test_window_like_object_is_rejected() {
        let win = Value::new_object();
        win.set_member("window", win.clone());
        assert!(ensure_safe_object(win).is_err());
    }

    #[test]
    fn test_dom_like_object_is_rejected() {
        let node = object_with(&[
            ("children", Value::new_array(vec![])),
            ("nodeName", Value::from("DIV")),
        ]);
        assert!(ensure_safe_object(node).is_err());
        let jq = object_with(&[
            ("children", Value::from(1)),
            ("prop", Value::from(1)),
            ("attr", Value::from(1)),
            ("find", Value::from(1)),
        ]);
        assert!(ensure_safe_object(jq).is_err());
    }

    #[test]
    fn test_incidental_shapes_are_allowed() {
        let tree = object_with(&[
            ("children", Value::new_array(vec![Value::from(1)])),
            ("length", Value::from(3)),
        ]);
        assert!(ensure_safe_object(tree).is_ok());
    }

    #[test]
    fn test_self_constructor_is_rejected() {
        let ctor = Value::new_object();
        ctor.set_member("constructor", ctor.clone());
        assert!(ensure_safe_object(ctor).is_err());
    }

    #[test]
    fn test_intrinsic_functions_are_rejected() {
        let plain = JsFunction::native("f", 0, |_, _| Ok(Value::Undefined)).into_ref();
        assert!(ensure_safe_object(Value::Function(plain.clone())).is_ok());
        assert!(ensure_safe_object(Value::from(JsFunction::function_constructor())).is_err());
        assert!(ensure_safe_object(Value::from(JsFunction::object_constructor())).is_err());
        assert!(ensure_safe_object(Value::from(JsFunction::apply_of(plain.clone()))).is_err());
        assert!(ensure_safe_function(&JsFunction::bind_of(plain)).is_err());
    }
}
