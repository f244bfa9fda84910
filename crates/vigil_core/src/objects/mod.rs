/// JavaScript arrays: a dense element vector with `length` semantics.
pub mod js_array;
/// Host callbacks and the `call` / `apply` / `bind` intrinsics.
pub mod js_function;
/// Ordinary objects with fast/slow named-property storage and a prototype link.
pub mod js_object;
/// Top-level value enum and ECMAScript §7.1 type conversions.
pub mod value;
