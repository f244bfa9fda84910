//! Closure compiler: turns a [`Program`] into an [`Expression`].
//!
//! Every AST node compiles once into a boxed closure over
//! `(scope, locals) -> Value`; evaluation walks the closure tree without
//! re-inspecting the AST.
//!
//! # Reference resolution
//!
//! Identifiers resolve against `locals` first: if `locals` has the key
//! (own or inherited) the lookup stops there, otherwise it falls through to
//! the scope.  The rule applies to every identifier in the tree, not only
//! the head of a path.
//!
//! Assignment targets and call callees compile to a [`Reference`] (a
//! `base` value plus a `key`) so the receiver is evaluated once and used both
//! for the lookup and as `this` / the write target.  When compiled with
//! `create`, nullish intermediate members are materialised as empty objects.

pub mod guard;

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::compiler::guard::{ensure_safe_function, ensure_safe_member_name, ensure_safe_object};
use crate::error::{VigilError, VigilResult};
use crate::filter::FilterRegistry;
use crate::objects::js_object::JsObject;
use crate::objects::value::Value;
use crate::parser::ast::{
    BinaryOp, CallExpr, Expr, LiteralValue, LogicalOp, MemberProp, Program, PropKey, UnaryOp,
};

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation frame
// ─────────────────────────────────────────────────────────────────────────────

/// The `(context, locals)` pair an evaluator runs against.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    /// The scope model (or any object) identifiers fall back to.
    pub scope: &'a Value,
    /// Optional locals that shadow the scope.
    pub locals: Option<&'a Value>,
}

impl Frame<'_> {
    /// Returns the value identifiers named `name` resolve against.
    fn owner_of(&self, name: &str) -> &Value {
        match self.locals {
            Some(locals) if locals.has_member(name) => locals,
            _ => self.scope,
        }
    }
}

type EvalFn = Rc<dyn Fn(&Frame<'_>) -> VigilResult<Value>>;

/// A resolved assignment target or call receiver.
struct Reference {
    base: Value,
    key: String,
}

type RefFn = Rc<dyn Fn(&Frame<'_>) -> VigilResult<Reference>>;

// ─────────────────────────────────────────────────────────────────────────────
// Expression
// ─────────────────────────────────────────────────────────────────────────────

/// A compiled expression.  Cheap to clone.
#[derive(Clone)]
pub struct Expression {
    source: Rc<str>,
    eval: EvalFn,
    literal: bool,
    constant: bool,
}

impl Expression {
    /// Evaluates against `scope`, with `locals` shadowing it.
    pub fn evaluate(&self, scope: &Value, locals: Option<&Value>) -> VigilResult<Value> {
        (self.eval)(&Frame { scope, locals })
    }

    /// The source text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `true` if the program is empty or a single literal, array literal or
    /// object literal.
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// `true` if the result cannot change between evaluations.
    pub fn is_constant(&self) -> bool {
        self.constant
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("literal", &self.literal)
            .field("constant", &self.constant)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiler
// ─────────────────────────────────────────────────────────────────────────────

/// Compiles ASTs against a filter registry.
pub struct Compiler<'r> {
    filters: &'r FilterRegistry,
}

impl<'r> Compiler<'r> {
    /// Creates a compiler resolving filter names through `filters`.
    pub fn new(filters: &'r FilterRegistry) -> Self {
        Self { filters }
    }

    /// Compiles a whole program; its value is that of the last statement.
    pub fn compile(&self, program: &Program, source: &str) -> VigilResult<Expression> {
        let statements = program
            .body
            .iter()
            .map(|stmt| self.compile_expr(stmt, false))
            .collect::<VigilResult<Vec<_>>>()?;
        let literal = match program.body.as_slice() {
            [] => true,
            [single] => matches!(single, Expr::Literal(_) | Expr::Array(_) | Expr::Object(_)),
            _ => false,
        };
        let constant = program.body.iter().all(is_constant);
        trace!(source, literal, constant, "compiled expression");

        let eval: EvalFn = Rc::new(move |frame| {
            let mut last = Value::Undefined;
            for stmt in &statements {
                last = stmt(frame)?;
            }
            Ok(last)
        });
        Ok(Expression {
            source: Rc::from(source),
            eval,
            literal,
            constant,
        })
    }

    // ── Expressions ─────────────────────────────────────────────────────────

    fn compile_expr(&self, expr: &Expr, create: bool) -> VigilResult<EvalFn> {
        Ok(match expr {
            Expr::Literal(lit) => {
                let value = literal_value(&lit.value);
                Rc::new(move |_| Ok(value.clone()))
            }
            Expr::Array(arr) => {
                let elements = arr
                    .elements
                    .iter()
                    .map(|e| self.compile_expr(e, false))
                    .collect::<VigilResult<Vec<_>>>()?;
                Rc::new(move |frame| {
                    let values = elements
                        .iter()
                        .map(|e| e(frame))
                        .collect::<VigilResult<Vec<_>>>()?;
                    Ok(Value::new_array(values))
                })
            }
            Expr::Object(obj) => {
                let properties = obj
                    .properties
                    .iter()
                    .map(|p| {
                        let key = match &p.key {
                            PropKey::Ident(id) => id.name.clone(),
                            PropKey::Literal(lit) => literal_value(&lit.value).to_property_key(),
                        };
                        Ok((key, self.compile_expr(&p.value, false)?))
                    })
                    .collect::<VigilResult<Vec<_>>>()?;
                Rc::new(move |frame| {
                    let mut out = JsObject::new();
                    for (key, value) in &properties {
                        out.set_property(key, value(frame)?);
                    }
                    Ok(Value::from(out))
                })
            }
            Expr::Ident(id) => {
                let name = id.name.clone();
                Rc::new(move |frame| {
                    ensure_safe_member_name(&name)?;
                    let owner = frame.owner_of(&name);
                    if create && std::ptr::eq(owner, frame.scope) && !owner.has_member(&name) {
                        owner.try_set_member(&name, Value::new_object())?;
                    }
                    ensure_safe_object(owner.get_member(&name))
                })
            }
            Expr::This(_) => Rc::new(|frame| ensure_safe_object(frame.scope.clone())),
            Expr::Member(member) => {
                let object = self.compile_expr(&member.object, create)?;
                let key = self.compile_key(&member.property)?;
                Rc::new(move |frame| {
                    let base = object(frame)?;
                    let key = key(frame)?;
                    ensure_safe_member_name(&key)?;
                    if base.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    if create && base.get_member(&key).is_nullish() {
                        base.try_set_member(&key, Value::new_object())?;
                    }
                    ensure_safe_object(base.get_member(&key))
                })
            }
            Expr::Call(call) if call.filter => self.compile_filter(call)?,
            Expr::Call(call) => self.compile_call(call)?,
            Expr::Assign(assign) => {
                let target = self.compile_reference(&assign.left, true)?;
                let right = self.compile_expr(&assign.right, false)?;
                Rc::new(move |frame| {
                    let Reference { base, key } = target(frame)?;
                    ensure_safe_member_name(&key)?;
                    let value = ensure_safe_object(right(frame)?)?;
                    if base.is_nullish() {
                        return Err(VigilError::Type(format!(
                            "cannot set property '{key}' of {}",
                            base.to_js_string()
                        )));
                    }
                    base.try_set_member(&key, value.clone())?;
                    Ok(value)
                })
            }
            Expr::Unary(unary) => {
                let argument = self.compile_expr(&unary.argument, false)?;
                let op = unary.op;
                Rc::new(move |frame| {
                    let v = argument(frame)?;
                    Ok(match op {
                        UnaryOp::Plus => Value::Number(if_defined(v).to_number()),
                        UnaryOp::Minus => Value::Number(-if_defined(v).to_number()),
                        UnaryOp::Not => Value::Boolean(!v.to_boolean()),
                    })
                })
            }
            Expr::Binary(binary) => {
                let left = self.compile_expr(&binary.left, false)?;
                let right = self.compile_expr(&binary.right, false)?;
                let op = binary.op;
                Rc::new(move |frame| Ok(binary_op(op, left(frame)?, right(frame)?)))
            }
            Expr::Logical(logical) => {
                let left = self.compile_expr(&logical.left, false)?;
                let right = self.compile_expr(&logical.right, false)?;
                let op = logical.op;
                Rc::new(move |frame| {
                    let l = left(frame)?;
                    match (op, l.to_boolean()) {
                        (LogicalOp::And, true) | (LogicalOp::Or, false) => right(frame),
                        _ => Ok(l),
                    }
                })
            }
            Expr::Conditional(cond) => {
                let test = self.compile_expr(&cond.test, false)?;
                let consequent = self.compile_expr(&cond.consequent, false)?;
                let alternate = self.compile_expr(&cond.alternate, false)?;
                Rc::new(move |frame| {
                    if test(frame)?.to_boolean() {
                        consequent(frame)
                    } else {
                        alternate(frame)
                    }
                })
            }
        })
    }

    /// Compiles the property part of a member access to its key string.
    fn compile_key(
        &self,
        property: &MemberProp,
    ) -> VigilResult<Rc<dyn Fn(&Frame<'_>) -> VigilResult<String>>> {
        Ok(match property {
            MemberProp::Ident(id) => {
                let name = id.name.clone();
                Rc::new(move |_| Ok(name.clone()))
            }
            MemberProp::Computed(expr) => {
                let key = self.compile_expr(expr, false)?;
                Rc::new(move |frame| Ok(key(frame)?.to_property_key()))
            }
        })
    }

    /// Compiles an identifier or member to a `(base, key)` reference.
    fn compile_reference(&self, expr: &Expr, create: bool) -> VigilResult<RefFn> {
        match expr {
            Expr::Ident(id) => {
                let name = id.name.clone();
                Ok(Rc::new(move |frame| {
                    Ok(Reference {
                        base: frame.owner_of(&name).clone(),
                        key: name.clone(),
                    })
                }))
            }
            Expr::Member(member) => {
                let object = self.compile_expr(&member.object, create)?;
                let key = self.compile_key(&member.property)?;
                Ok(Rc::new(move |frame| {
                    let base = object(frame)?;
                    let key = key(frame)?;
                    Ok(Reference { base, key })
                }))
            }
            other => Err(VigilError::Compile(format!(
                "expression at offset {} is not a reference",
                other.loc().start.offset
            ))),
        }
    }

    // ── Calls ───────────────────────────────────────────────────────────────

    fn compile_call(&self, call: &CallExpr) -> VigilResult<EvalFn> {
        let args = self.compile_args(call)?;
        let callee: Rc<dyn Fn(&Frame<'_>) -> VigilResult<(Value, Value)>> = match &call.callee {
            target @ (Expr::Ident(_) | Expr::Member(_)) => {
                let reference = self.compile_reference(target, false)?;
                Rc::new(move |frame| {
                    let Reference { base, key } = reference(frame)?;
                    ensure_safe_member_name(&key)?;
                    let callee = if base.is_nullish() {
                        Value::Undefined
                    } else {
                        ensure_safe_object(base.get_member(&key))?
                    };
                    Ok((base, callee))
                })
            }
            other => {
                let eval = self.compile_expr(other, false)?;
                Rc::new(move |frame| Ok((Value::Undefined, eval(frame)?)))
            }
        };
        Ok(Rc::new(move |frame| {
            let (this, callee) = callee(frame)?;
            if !callee.to_boolean() {
                return Ok(callee);
            }
            let Value::Function(func) = &callee else {
                return Err(VigilError::Type(format!(
                    "{} is not a function",
                    callee.to_js_string()
                )));
            };
            ensure_safe_function(func)?;
            let this = ensure_safe_object(this)?;
            let values = args
                .iter()
                .map(|a| a(frame).and_then(ensure_safe_object))
                .collect::<VigilResult<Vec<_>>>()?;
            ensure_safe_object(func.call(&this, &values)?)
        }))
    }

    /// `input | name:arg` becomes `name(input, arg)`; the filter is resolved
    /// now, so an unknown name fails at compile time.
    fn compile_filter(&self, call: &CallExpr) -> VigilResult<EvalFn> {
        let Expr::Ident(id) = &call.callee else {
            return Err(VigilError::Compile("filter name must be an identifier".into()));
        };
        let filter = self.filters.lookup(&id.name)?;
        let args = self.compile_args(call)?;
        Ok(Rc::new(move |frame| {
            let values = args
                .iter()
                .map(|a| a(frame))
                .collect::<VigilResult<Vec<_>>>()?;
            ensure_safe_object(filter.call(&Value::Undefined, &values)?)
        }))
    }

    fn compile_args(&self, call: &CallExpr) -> VigilResult<Vec<EvalFn>> {
        call.arguments
            .iter()
            .map(|a| self.compile_expr(a, false))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn literal_value(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Null => Value::Null,
        LiteralValue::Bool(b) => Value::Boolean(*b),
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::from(s.as_str()),
    }
}

/// `undefined` operands of `+`/`-` count as zero.
fn if_defined(v: Value) -> Value {
    if v.is_undefined() { Value::Number(0.0) } else { v }
}

fn binary_op(op: BinaryOp, l: Value, r: Value) -> Value {
    match op {
        BinaryOp::Add => {
            let (l, r) = (if_defined(l), if_defined(r));
            let stringy = |v: &Value| v.is_string() || v.is_object_like();
            if stringy(&l) || stringy(&r) {
                Value::from(l.to_js_string() + &r.to_js_string())
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(if_defined(l).to_number() - if_defined(r).to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => Value::Boolean(compare(&l, &r).is_some_and(|o| o.is_lt())),
        BinaryOp::Gt => Value::Boolean(compare(&l, &r).is_some_and(|o| o.is_gt())),
        BinaryOp::LtEq => Value::Boolean(compare(&l, &r).is_some_and(|o| o.is_le())),
        BinaryOp::GtEq => Value::Boolean(compare(&l, &r).is_some_and(|o| o.is_ge())),
        BinaryOp::Eq => Value::Boolean(l.loose_equals(&r)),
        BinaryOp::NotEq => Value::Boolean(!l.loose_equals(&r)),
        BinaryOp::StrictEq => Value::Boolean(l.strict_equals(&r)),
        BinaryOp::StrictNotEq => Value::Boolean(!l.strict_equals(&r)),
    }
}

/// Abstract relational comparison: strings compare by code unit, everything
/// else numerically (`None` when either side is `NaN`).
fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    let primitive = |v: &Value| {
        if v.is_object_like() {
            Value::from(v.to_js_string())
        } else {
            v.clone()
        }
    };
    match (primitive(l), primitive(r)) {
        (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Static constant-ness: no free identifiers, members, `this`, assignments
/// or non-filter calls anywhere in the tree.
fn is_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Array(arr) => arr.elements.iter().all(is_constant),
        Expr::Object(obj) => obj.properties.iter().all(|p| is_constant(&p.value)),
        Expr::Ident(_) | Expr::This(_) | Expr::Member(_) | Expr::Assign(_) => false,
        Expr::Call(call) => call.filter && call.arguments.iter().all(is_constant),
        Expr::Unary(u) => is_constant(&u.argument),
        Expr::Binary(b) => is_constant(&b.left) && is_constant(&b.right),
        Expr::Logical(l) => is_constant(&l.left) && is_constant(&l.right),
        Expr::Conditional(c) => {
            is_constant(&c.test) && is_constant(&c.consequent) && is_constant(&c.alternate)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::js_function::JsFunction;
    use crate::parser::ast_builder::build_ast;

    fn compile(src: &str) -> VigilResult<Expression> {
        let filters = FilterRegistry::new();
        filters.register("upcase", || {
            JsFunction::native("upcase", 1, |_, args| {
                Ok(Value::from(
                    args.first()
                        .map(Value::to_js_string)
                        .unwrap_or_default()
                        .to_uppercase(),
                ))
            })
        });
        Compiler::new(&filters).compile(&build_ast(src)?, src)
    }

    fn eval(src: &str) -> Value {
        compile(src).unwrap().evaluate(&Value::new_object(), None).unwrap()
    }

    fn eval_in(src: &str, scope: &Value) -> VigilResult<Value> {
        compile(src)?.evaluate(scope, None)
    }

    fn scope_with(pairs: &[(&str, Value)]) -> Value {
        let o: JsObject = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::from(o)
    }

    // ── Literals ──────────────────────────────────────────────────────────────

    #[test]
    fn test_literals() {
        assert_eq!(eval("42").to_number(), 42.0);
        assert_eq!(eval("4.2e1").to_number(), 42.0);
        assert_eq!(eval("'abc'").to_js_string(), "abc");
        assert_eq!(eval("\"abc\"").to_js_string(), "abc");
        assert!(eval("true").strict_equals(&Value::Boolean(true)));
        assert!(eval("null").is_null());
        assert!(eval("").is_undefined());
        let arr = eval("[1, [2, 'three']]");
        assert!(arr.deep_equals(&Value::new_array(vec![
            Value::from(1),
            Value::new_array(vec![Value::from(2), Value::from("three")]),
        ])));
        let obj = eval("{a: 1, 'b-c': [2], 3: true}");
        assert_eq!(obj.get_member("b-c").get_member("0").to_number(), 2.0);
        assert!(obj.get_member("3").to_boolean());
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_path_is_undefined() {
        let scope = Value::new_object();
        assert!(eval_in("a.b.c.d", &scope).unwrap().is_undefined());
        assert!(eval_in("a[b][c]", &scope).unwrap().is_undefined());
    }

    #[test]
    fn test_locals_shadow_scope_at_every_segment() {
        let scope = scope_with(&[("a", scope_with(&[("b", Value::from(1))]))]);
        let locals = scope_with(&[("a", Value::new_object())]);
        let expr = compile("a.b").unwrap();
        assert!(expr.evaluate(&scope, Some(&locals)).unwrap().is_undefined());
        let other = scope_with(&[("c", Value::from(2))]);
        assert_eq!(expr.evaluate(&scope, Some(&other)).unwrap().to_number(), 1.0);
    }

    #[test]
    fn test_computed_key_uses_locals() {
        let scope = scope_with(&[
            ("lock", scope_with(&[("theKey", Value::from(42))])),
            ("key", Value::from("wrong")),
        ]);
        let locals = scope_with(&[("key", Value::from("theKey"))]);
        let v = compile("lock[key]")
            .unwrap()
            .evaluate(&scope, Some(&locals))
            .unwrap();
        assert_eq!(v.to_number(), 42.0);
    }

    #[test]
    fn test_this_is_the_scope() {
        let scope = scope_with(&[("x", Value::from(5))]);
        assert_eq!(eval_in("this.x", &scope).unwrap().to_number(), 5.0);
    }

    // ── Assignment ────────────────────────────────────────────────────────────

    #[test]
    fn test_assignment_from_expression() {
        let scope = scope_with(&[("b", Value::from(41))]);
        let v = eval_in("a = b + 1", &scope).unwrap();
        assert_eq!(v.to_number(), 42.0);
        assert_eq!(scope.get_member("a").to_number(), 42.0);
    }

    #[test]
    fn test_assignment_auto_creates_path() {
        let scope = Value::new_object();
        eval_in("some['nested'].path.value = 42", &scope).unwrap();
        assert_eq!(
            scope
                .get_member("some")
                .get_member("nested")
                .get_member("path")
                .get_member("value")
                .to_number(),
            42.0
        );
    }

    #[test]
    fn test_assignment_writes_into_shadowing_locals() {
        let scope = Value::new_object();
        let locals = scope_with(&[("a", Value::from(1))]);
        compile("a = 2").unwrap().evaluate(&scope, Some(&locals)).unwrap();
        assert_eq!(locals.get_member("a").to_number(), 2.0);
        assert!(!scope.has_member("a"));
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_method_call_binds_receiver() {
        let obj = scope_with(&[("value", Value::from(7))]);
        obj.set_member(
            "get",
            Value::from(JsFunction::native("get", 0, |this, _| {
                Ok(this.get_member("value"))
            })),
        );
        let scope = scope_with(&[("obj", obj)]);
        assert_eq!(eval_in("obj.get()", &scope).unwrap().to_number(), 7.0);
        assert_eq!(eval_in("obj['get']()", &scope).unwrap().to_number(), 7.0);
    }

    #[test]
    fn test_bare_function_binds_scope() {
        let scope = scope_with(&[("value", Value::from(3))]);
        scope.set_member(
            "get",
            Value::from(JsFunction::native("get", 0, |this, _| {
                Ok(this.get_member("value"))
            })),
        );
        assert_eq!(eval_in("get()", &scope).unwrap().to_number(), 3.0);
    }

    #[test]
    fn test_calling_missing_function_is_undefined() {
        assert!(eval("nothing(1)").is_undefined());
        let scope = scope_with(&[("n", Value::from(1))]);
        assert!(matches!(eval_in("n()", &scope), Err(VigilError::Type(_))));
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    #[test]
    fn test_arithmetic_and_if_defined() {
        assert_eq!(eval("2 + 3 * 4").to_number(), 14.0);
        assert_eq!(eval("42 + a").to_number(), 42.0);
        assert_eq!(eval("42 - a").to_number(), 42.0);
        assert_eq!(eval("-a").to_number(), 0.0);
        assert!(eval("a * 2").to_number().is_nan());
        assert_eq!(eval("'a' + 1").to_js_string(), "a1");
        assert_eq!(eval("7 % 4").to_number(), 3.0);
    }

    #[test]
    fn test_comparison_and_equality() {
        assert!(eval("1 < 2").to_boolean());
        assert!(eval("'a' < 'b'").to_boolean());
        assert!(eval("'10' < '9'").to_boolean());
        assert!(!eval("10 < 9").to_boolean());
        assert!(eval("2 >= 2").to_boolean());
        assert!(eval("42 == '42'").to_boolean());
        assert!(!eval("42 === '42'").to_boolean());
        assert!(eval("null != 0").to_boolean());
    }

    #[test]
    fn test_logical_short_circuit() {
        let scope = Value::new_object();
        eval_in("false && (touched = true)", &scope).unwrap();
        eval_in("true || (touched = true)", &scope).unwrap();
        assert!(!scope.has_member("touched"));
        assert_eq!(eval("0 || 'fallback'").to_js_string(), "fallback");
        assert_eq!(eval("1 && 'second'").to_js_string(), "second");
    }

    #[test]
    fn test_ternary_and_statements() {
        assert_eq!(eval("1 < 2 ? 'yes' : 'no'").to_js_string(), "yes");
        assert_eq!(eval("a = 1; b = 2; a + b").to_number(), 3.0);
    }

    // ── Filters ───────────────────────────────────────────────────────────────

    #[test]
    fn test_filter_call() {
        assert_eq!(eval("\"hi\" | upcase").to_js_string(), "HI");
    }

    #[test]
    fn test_unknown_filter_fails_at_compile_time() {
        assert!(matches!(
            compile("x | nope"),
            Err(VigilError::UnknownFilter(name)) if name == "nope"
        ));
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    #[test]
    fn test_literal_and_constant_flags() {
        let lit = compile("[1, 2]").unwrap();
        assert!(lit.is_literal() && lit.is_constant());
        let sum = compile("1 + 2").unwrap();
        assert!(!sum.is_literal() && sum.is_constant());
        let path = compile("a.b").unwrap();
        assert!(!path.is_literal() && !path.is_constant());
        assert!(compile("'a' | upcase").unwrap().is_constant());
        assert!(!compile("a | upcase").unwrap().is_constant());
    }

    // ── Security ──────────────────────────────────────────────────────────────

    #[test]
    fn test_disallowed_member_names_fail_at_evaluation() {
        let expr = compile("a.constructor").unwrap();
        assert!(expr.evaluate(&Value::new_object(), None).is_err_and(|e| e.is_security()));
        for src in ["constructor", "a['__proto__']", "a.__defineGetter__ = 1", "a['__lookupSetter__']()"] {
            let err = eval_in(src, &scope_with(&[("a", Value::new_object())])).unwrap_err();
            assert!(err.is_security(), "{src}: {err}");
        }
    }

    #[test]
    fn test_function_intrinsics_are_contained() {
        let scope = scope_with(&[(
            "fn",
            Value::from(JsFunction::native("fn", 0, |_, _| Ok(Value::Undefined))),
        )]);
        for src in ["fn.call(null)", "fn.apply(null)", "fn.bind(null)()", "fn['call']"] {
            assert!(eval_in(src, &scope).unwrap_err().is_security(), "{src}");
        }
        let scope = scope_with(&[("F", Value::from(JsFunction::function_constructor()))]);
        assert!(eval_in("F('return window')()", &scope).unwrap_err().is_security());
    }

    #[test]
    fn test_window_cannot_be_returned_or_passed() {
        let win = Value::new_object();
        win.set_member("window", win.clone());
        let scope = scope_with(&[("wnd", win.clone())]);
        scope.set_member(
            "take",
            Value::from(JsFunction::native("take", 1, |_, _| Ok(Value::Undefined))),
        );
        scope.set_member(
            "give",
            Value::from(JsFunction::native("give", 0, move |_, _| Ok(win.clone()))),
        );
        for src in ["wnd", "take(wnd)", "give()", "x = wnd"] {
            assert!(eval_in(src, &scope).unwrap_err().is_security(), "{src}");
        }
    }
}
