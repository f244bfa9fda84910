//! `vigil_core`: expression compiler and dirty-checking scope graph.
//!
//! # Crate layout
//!
//! - [`objects`]: values, objects, arrays and host functions.
//! - [`parser`]: lexer, AST and recursive-descent AST builder.
//! - [`compiler`]: closure compiler and member/object guards.
//! - [`filter`]: named filter registry and built-in filters.
//! - [`scope`]: scope tree, watches, digest loop, events and task queue.
//! - [`injector`]: module loader and dependency injector.
//!
//! ```
//! use vigil_core::scope::Scope;
//!
//! let scope = Scope::new_root();
//! scope.apply("a = 41; a = a + 1", None).unwrap();
//! assert_eq!(scope.get("a").to_number(), 42.0);
//! ```

/// Closure compiler for expression ASTs.
pub mod compiler;
/// Runtime configuration shared by a scope tree.
pub mod config;
/// Error types.
pub mod error;
/// Named filter registry.
pub mod filter;
/// Module loader and dependency injector.
pub mod injector;
/// Value representation and object model.
pub mod objects;
/// Expression lexer and parser.
pub mod parser;
/// Scope graph and digest engine.
pub mod scope;
