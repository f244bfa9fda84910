//! Callable function values.
//!
//! This module provides two closely related types:
//!
//! * [`SharedFunctionInfo`]: the **static** metadata about a function: its
//!   name and its declared formal-parameter count.
//!
//! * [`JsFunction`]: a callable instance pairing that metadata with a
//!   [`FunctionKind`].
//!
//! Besides host callbacks ([`NativeFn`]) and bound functions, a handful of
//! **intrinsic** kinds model the dangerous built-ins that expression
//! evaluation must never hand out: the `Function` and `Object` constructors
//! and `Function.prototype.call` / `apply` / `bind`.  Reading `call`, `apply`
//! or `bind` off any function value yields one of these intrinsics, which the
//! evaluator's object guard rejects.

use std::fmt;
use std::rc::Rc;

use crate::error::{VigilError, VigilResult};
use crate::objects::js_object::JsObject;
use crate::objects::value::Value;

/// Shared handle to a [`JsFunction`].
pub type FunctionRef = Rc<JsFunction>;

// ──────────────────────────────────────────────────────────────────────────────
// SharedFunctionInfo
// ──────────────────────────────────────────────────────────────────────────────

/// Metadata shared by every copy of a function.
#[derive(Debug, Clone)]
pub struct SharedFunctionInfo {
    name: String,
    param_count: u32,
}

impl SharedFunctionInfo {
    /// Creates metadata for a function called `name` declaring `param_count`
    /// formal parameters.
    pub fn new(name: impl Into<String>, param_count: u32) -> Self {
        Self {
            name: name.into(),
            param_count,
        }
    }

    /// Returns the function's declared name (empty for anonymous functions).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the formal parameter count.
    pub fn param_count(&self) -> u32 {
        self.param_count
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// NativeFn
// ──────────────────────────────────────────────────────────────────────────────

/// A host-side (Rust) callback.
///
/// Receives the `this` value and the positional arguments.
pub type NativeFn = Rc<dyn Fn(&Value, &[Value]) -> VigilResult<Value>>;

// ──────────────────────────────────────────────────────────────────────────────
// FunctionKind
// ──────────────────────────────────────────────────────────────────────────────

/// Discriminates the flavours a [`JsFunction`] can take.
pub enum FunctionKind {
    /// A built-in Rust callback.
    Native(NativeFn),

    /// A bound function produced by `bind`.
    Bound {
        /// The underlying function that will be invoked.
        target: FunctionRef,
        /// The `this` value bound at `bind` time.
        bound_this: Value,
        /// Leading arguments prepended to each call.
        bound_args: Vec<Value>,
    },

    /// The global `Function` constructor.
    FunctionConstructor,
    /// The global `Object` constructor.
    ObjectConstructor,
    /// `target.call`
    Call(FunctionRef),
    /// `target.apply`
    Apply(FunctionRef),
    /// `target.bind`
    Bind(FunctionRef),
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => write!(f, "Native(<fn>)"),
            Self::Bound {
                target, bound_args, ..
            } => f
                .debug_struct("Bound")
                .field("target", &target.name())
                .field("bound_args", &bound_args.len())
                .finish(),
            Self::FunctionConstructor => write!(f, "FunctionConstructor"),
            Self::ObjectConstructor => write!(f, "ObjectConstructor"),
            Self::Call(t) => write!(f, "Call({})", t.name()),
            Self::Apply(t) => write!(f, "Apply({})", t.name()),
            Self::Bind(t) => write!(f, "Bind({})", t.name()),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// JsFunction
// ──────────────────────────────────────────────────────────────────────────────

/// A callable value.
///
/// # Example: wrapping a native function
///
/// ```rust
/// use vigil_core::objects::js_function::JsFunction;
/// use vigil_core::objects::value::Value;
///
/// let add = JsFunction::native("add", 2, |_this, args| {
///     let a = args.first().map(Value::to_number).unwrap_or(0.0);
///     let b = args.get(1).map(Value::to_number).unwrap_or(0.0);
///     Ok(Value::Number(a + b))
/// });
/// assert_eq!(add.name(), "add");
/// assert_eq!(add.param_count(), 2);
/// let sum = add.call(&Value::Undefined, &[Value::Number(40.0), Value::Number(2.0)]).unwrap();
/// assert_eq!(sum.to_number(), 42.0);
/// ```
#[derive(Debug)]
pub struct JsFunction {
    shared: Rc<SharedFunctionInfo>,
    kind: FunctionKind,
}

impl JsFunction {
    /// Creates a native (Rust callback) function.
    pub fn native<F>(name: impl Into<String>, param_count: u32, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> VigilResult<Value> + 'static,
    {
        Self {
            shared: Rc::new(SharedFunctionInfo::new(name, param_count)),
            kind: FunctionKind::Native(Rc::new(f)),
        }
    }

    /// Creates a bound function from `target`, binding `bound_this` and
    /// zero or more leading `bound_args`.
    pub fn new_bound(target: FunctionRef, bound_this: Value, bound_args: Vec<Value>) -> Self {
        let shared = Rc::clone(&target.shared);
        Self {
            shared,
            kind: FunctionKind::Bound {
                target,
                bound_this,
                bound_args,
            },
        }
    }

    /// The global `Function` constructor, as a host may expose it.
    pub fn function_constructor() -> Self {
        Self::intrinsic("Function", 1, FunctionKind::FunctionConstructor)
    }

    /// The global `Object` constructor, as a host may expose it.
    pub fn object_constructor() -> Self {
        Self::intrinsic("Object", 1, FunctionKind::ObjectConstructor)
    }

    /// `target.call`
    pub fn call_of(target: FunctionRef) -> Self {
        Self::intrinsic("call", 1, FunctionKind::Call(target))
    }

    /// `target.apply`
    pub fn apply_of(target: FunctionRef) -> Self {
        Self::intrinsic("apply", 2, FunctionKind::Apply(target))
    }

    /// `target.bind`
    pub fn bind_of(target: FunctionRef) -> Self {
        Self::intrinsic("bind", 1, FunctionKind::Bind(target))
    }

    fn intrinsic(name: &str, param_count: u32, kind: FunctionKind) -> Self {
        Self {
            shared: Rc::new(SharedFunctionInfo::new(name, param_count)),
            kind,
        }
    }

    /// Wraps this function in a shared handle.
    pub fn into_ref(self) -> FunctionRef {
        Rc::new(self)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Returns the function's declared name.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Returns the formal parameter count.
    pub fn param_count(&self) -> u32 {
        self.shared.param_count()
    }

    /// Returns the kind of this function.
    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    /// Returns `true` for the `Function` or `Object` constructor.
    pub fn is_global_constructor(&self) -> bool {
        matches!(
            self.kind,
            FunctionKind::FunctionConstructor | FunctionKind::ObjectConstructor
        )
    }

    /// Returns `true` for `call`, `apply` or `bind`.
    pub fn is_call_apply_bind(&self) -> bool {
        matches!(
            self.kind,
            FunctionKind::Call(_) | FunctionKind::Apply(_) | FunctionKind::Bind(_)
        )
    }

    // ── Call ──────────────────────────────────────────────────────────────────

    /// Invokes the function with the given receiver and arguments.
    pub fn call(&self, this: &Value, args: &[Value]) -> VigilResult<Value> {
        match &self.kind {
            FunctionKind::Native(f) => f(this, args),
            FunctionKind::Bound {
                target,
                bound_this,
                bound_args,
            } => {
                let mut full = bound_args.clone();
                full.extend_from_slice(args);
                target.call(bound_this, &full)
            }
            FunctionKind::FunctionConstructor => Err(VigilError::Type(
                "code generation from strings is not supported".into(),
            )),
            FunctionKind::ObjectConstructor => match args.first() {
                Some(v) if v.is_object_like() => Ok(v.clone()),
                _ => Ok(Value::Object(JsObject::new().into_ref())),
            },
            FunctionKind::Call(target) => {
                let this = args.first().cloned().unwrap_or(Value::Undefined);
                target.call(&this, args.get(1..).unwrap_or(&[]))
            }
            FunctionKind::Apply(target) => {
                let this = args.first().cloned().unwrap_or(Value::Undefined);
                let spread = match args.get(1) {
                    Some(Value::Array(arr)) => arr.borrow().elements().to_vec(),
                    _ => Vec::new(),
                };
                target.call(&this, &spread)
            }
            FunctionKind::Bind(target) => {
                let this = args.first().cloned().unwrap_or(Value::Undefined);
                let bound = args.get(1..).unwrap_or(&[]).to_vec();
                Ok(Value::Function(
                    JsFunction::new_bound(Rc::clone(target), this, bound).into_ref(),
                ))
            }
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────
