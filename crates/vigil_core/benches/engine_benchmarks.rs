use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use vigil_core::objects::value::Value;
use vigil_core::parser::Parser;
use vigil_core::parser::ast_builder::build_ast;
use vigil_core::parser::lexer::Lexer;
use vigil_core::scope::Scope;

const SOURCE: &str = "user.orders[index].total * (1 + rate) > limit ? 'over' : 'ok'";

fn sample_context() -> Value {
    let parser = Parser::new();
    let ctx = Value::new_object();
    parser
        .parse("user = {orders: [{total: 10}, {total: 250}]}; index = 1; rate = 0.2; limit = 200")
        .and_then(|expr| expr.evaluate(&ctx, None))
        .unwrap();
    ctx
}

// ---------------------------------------------------------------------------
// Front end
// ---------------------------------------------------------------------------

fn bench_lex(c: &mut Criterion) {
    c.bench_function("lex_expression", |b| {
        b.iter(|| Lexer::tokenize_all(black_box(SOURCE)).unwrap());
    });
}

fn bench_build_ast(c: &mut Criterion) {
    c.bench_function("build_ast", |b| {
        b.iter(|| build_ast(black_box(SOURCE)).unwrap());
    });
}

fn bench_parse_and_compile(c: &mut Criterion) {
    let parser = Parser::new();
    c.bench_function("parse_and_compile", |b| {
        b.iter(|| parser.parse(black_box(SOURCE)).unwrap());
    });
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn bench_evaluate(c: &mut Criterion) {
    let expr = Parser::new().parse(SOURCE).unwrap();
    let ctx = sample_context();
    c.bench_function("evaluate_compiled", |b| {
        b.iter(|| expr.evaluate(black_box(&ctx), None).unwrap());
    });
}

fn bench_filter_chain(c: &mut Criterion) {
    let parser = Parser::new();
    let ctx = Value::new_object();
    parser
        .parse("words = ['alpha', 'beta', 'gamma', 'delta', 'epsilon']")
        .and_then(|expr| expr.evaluate(&ctx, None))
        .unwrap();
    let expr = parser.parse("words | filter:'a' | filter:'!ph'").unwrap();
    c.bench_function("evaluate_filter_chain", |b| {
        b.iter(|| expr.evaluate(black_box(&ctx), None).unwrap());
    });
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

fn bench_clean_digest(c: &mut Criterion) {
    let root = Scope::new_root();
    for i in 0..100 {
        root.set(&format!("v{i}"), i);
        root.watch(format!("v{i}").as_str(), |_, _, _| Ok(()), false)
            .unwrap();
    }
    root.digest().unwrap();
    c.bench_function("digest_100_clean_watches", |b| {
        b.iter(|| root.digest().unwrap());
    });
}

fn bench_dirty_digest(c: &mut Criterion) {
    let root = Scope::new_root();
    let children: Vec<Scope> = (0..10).map(|_| root.new_scope(false, None)).collect();
    for child in &children {
        for i in 0..10 {
            child.watch(format!("v{i}").as_str(), |_, _, _| Ok(()), false)
                .unwrap();
        }
    }
    root.digest().unwrap();
    let mut tick = 0;
    c.bench_function("digest_after_one_write", |b| {
        b.iter(|| {
            tick += 1;
            children[tick % children.len()].set("v5", tick as f64);
            root.digest().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_lex,
    bench_build_ast,
    bench_parse_and_compile,
    bench_evaluate,
    bench_filter_chain,
    bench_clean_digest,
    bench_dirty_digest,
);
criterion_main!(benches);
