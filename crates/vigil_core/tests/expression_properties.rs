//! End-to-end expression behaviour through the public `Parser` facade.

use std::rc::Rc;

use vigil_core::error::VigilError;
use vigil_core::filter::FilterRegistry;
use vigil_core::objects::js_function::JsFunction;
use vigil_core::objects::value::Value;
use vigil_core::parser::Parser;

fn eval(parser: &Parser, src: &str, scope: &Value) -> Result<Value, VigilError> {
    parser.parse(src)?.evaluate(scope, None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals and paths
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_literals_evaluate_to_native_values() {
    let parser = Parser::new();
    let scope = Value::new_object();
    let cases: &[(&str, Value)] = &[
        ("42", Value::from(42)),
        ("4.2", Value::from(4.2)),
        ("42e-2", Value::from(0.42)),
        (".5E+1", Value::from(5)),
        ("'single'", Value::from("single")),
        ("\"double\"", Value::from("double")),
        ("true", Value::Boolean(true)),
        ("false", Value::Boolean(false)),
        ("null", Value::Null),
    ];
    for (src, expected) in cases {
        let value = eval(&parser, src, &scope).unwrap();
        assert!(value.strict_equals(expected), "{src}");
        assert!(parser.parse(src).unwrap().is_literal(), "{src}");
    }
}

#[test]
fn test_missing_intermediate_reads_undefined_and_assignment_creates_it() {
    let parser = Parser::new();
    let scope = Value::new_object();
    assert!(eval(&parser, "a.b.c.d", &scope).unwrap().is_undefined());
    eval(&parser, "a.b.c.d = 1", &scope).unwrap();
    assert_eq!(eval(&parser, "a.b.c.d", &scope).unwrap().to_number(), 1.0);
}

#[test]
fn test_locals_shadow_scope() {
    let parser = Parser::new();
    let scope = Value::new_object();
    eval(&parser, "a = {b: 1}", &scope).unwrap();
    let locals = Value::new_object();
    locals.set_member("a", Value::new_object());
    let out = parser.parse("a.b").unwrap().evaluate(&scope, Some(&locals)).unwrap();
    assert!(out.is_undefined());
}

#[test]
fn test_assignment_scenario() {
    let parser = Parser::new();
    let ctx = Value::new_object();
    ctx.set_member("b", Value::from(41));
    eval(&parser, "a = b + 1", &ctx).unwrap();
    assert!(ctx.get_member("a").strict_equals(&Value::from(42)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_registered_filter_scenario() {
    let filters = Rc::new(FilterRegistry::new());
    filters.register("upcase", || {
        JsFunction::native("upcase", 1, |_, args| {
            let s = args.first().map(Value::to_js_string).unwrap_or_default();
            Ok(Value::from(s.to_uppercase()))
        })
    });
    let parser = Parser::with_filters(filters);
    let out = eval(&parser, "\"hi\" | upcase", &Value::new_object()).unwrap();
    assert_eq!(out.to_js_string(), "HI");
}

#[test]
fn test_builtin_filter_filter_in_expression() {
    let parser = Parser::new();
    let scope = Value::new_object();
    eval(&parser, "items = ['apple', 'banana', 'cherry']", &scope).unwrap();
    let out = eval(&parser, "items | filter:'an'", &scope).unwrap();
    assert!(out.deep_equals(&Value::new_array(vec![Value::from("banana")])));
    let out = eval(&parser, "items | filter:{$: 'ERR'}", &scope).unwrap();
    assert!(out.deep_equals(&Value::new_array(vec![Value::from("cherry")])));
}

#[test]
fn test_filter_results_are_contained() {
    let filters = Rc::new(FilterRegistry::new());
    filters.register("globalObject", || {
        JsFunction::native("globalObject", 1, |_, _| {
            let win = Value::new_object();
            win.set_member("window", win.clone());
            Ok(win)
        })
    });
    let parser = Parser::with_filters(filters);
    let err = eval(&parser, "1 | globalObject", &Value::new_object()).unwrap_err();
    assert!(err.is_security(), "{err}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Containment
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_constructor_escape_is_contained() {
    let parser = Parser::new();
    let scope = Value::new_object();
    scope.set_member("obj", Value::new_object());
    scope.set_member(
        "fn",
        Value::from(JsFunction::native("fn", 0, |_, _| Ok(Value::Undefined))),
    );
    for src in [
        "obj.constructor('return window')()",
        "fn.constructor('return window')()",
        "obj['const' + 'ructor']",
        "obj.__proto__",
    ] {
        let err = eval(&parser, src, &scope).unwrap_err();
        assert!(err.is_security(), "{src}: {err}");
    }
}

#[test]
fn test_window_and_dom_like_values_are_contained() {
    let parser = Parser::new();
    let scope = Value::new_object();
    let win = Value::new_object();
    win.set_member("window", win.clone());
    let node = Value::new_object();
    node.set_member("children", Value::new_array(vec![]));
    node.set_member("nodeName", Value::from("DIV"));
    scope.set_member("wnd", win);
    scope.set_member("node", node);
    for src in ["wnd", "node", "x = node", "[wnd]"] {
        let err = eval(&parser, src, &scope).unwrap_err();
        assert!(err.is_security(), "{src}: {err}");
    }
}

#[test]
fn test_incidental_shapes_are_not_rejected() {
    let parser = Parser::new();
    let scope = Value::new_object();
    eval(
        &parser,
        "tree = {children: [1, 2], length: 2, name: 'root'}",
        &scope,
    )
    .unwrap();
    assert_eq!(eval(&parser, "tree.children[1]", &scope).unwrap().to_number(), 2.0);
    assert_eq!(eval(&parser, "tree.length", &scope).unwrap().to_number(), 2.0);
    assert_eq!(eval(&parser, "tree.name", &scope).unwrap().to_js_string(), "root");
}

// ─────────────────────────────────────────────────────────────────────────────
// Hostile shapes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_oversized_array_writes_fail_with_type_error() {
    let parser = Parser::new();
    let scope = Value::new_object();
    eval(&parser, "a = []", &scope).unwrap();
    assert!(matches!(
        eval(&parser, "a['18446744073709551615'] = 1", &scope),
        Err(VigilError::Type(_))
    ));
    assert!(matches!(eval(&parser, "a.length = 1e12", &scope), Err(VigilError::Type(_))));
    assert!(matches!(eval(&parser, "a[4294967294].x = 1", &scope), Err(VigilError::Type(_))));
    assert_eq!(eval(&parser, "a.length", &scope).unwrap().to_number(), 0.0);
}

#[test]
fn test_self_referencing_array_converts_to_string() {
    let parser = Parser::new();
    let scope = Value::new_object();
    assert_eq!(
        eval(&parser, "a = []; a[0] = a; a + ''", &scope).unwrap().to_js_string(),
        ""
    );
    assert_eq!(
        eval(&parser, "b = [1, 2]; b[2] = b; b + ''", &scope).unwrap().to_js_string(),
        "1,2,"
    );
}

#[test]
fn test_deeply_nested_source_is_a_parse_error() {
    let parser = Parser::new();
    let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    let negations = format!("{}1", "-".repeat(200_000));
    for src in [parens, negations] {
        assert!(matches!(parser.parse(&src), Err(VigilError::Parse(_))));
    }
    assert_eq!(
        eval(&parser, "((((1 + 2))))", &Value::new_object()).unwrap().to_number(),
        3.0
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Failures by stage
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_errors_by_stage() {
    let parser = Parser::new();
    assert!(matches!(parser.parse("a # b"), Err(VigilError::Lex { offset: 2, .. })));
    assert!(matches!(parser.parse("a +"), Err(VigilError::Parse(_))));
    assert!(matches!(parser.parse("1 = 2"), Err(VigilError::Parse(_))));
    assert!(matches!(parser.parse("a | nope"), Err(VigilError::UnknownFilter(_))));
    let scope = Value::new_object();
    scope.set_member("n", Value::from(1));
    assert!(matches!(eval(&parser, "n()", &scope), Err(VigilError::Type(_))));
}
