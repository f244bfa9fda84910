//! Expression front end.
//!
//! - [`lexer`]: converts raw source text into [`lexer::Token`]s.
//! - [`ast`]: expression Abstract Syntax Tree node definitions.
//! - [`ast_builder`]: recursive-descent builder producing an [`ast::Program`].
//!
//! [`Parser`] ties the stages to the [`compiler`](crate::compiler): source
//! text in, compiled [`Expression`] out.

/// Expression AST node types.
pub mod ast;
/// Recursive-descent AST builder.
pub mod ast_builder;
/// Expression lexer.
pub mod lexer;

use std::rc::Rc;

use crate::compiler::{Compiler, Expression};
use crate::error::VigilResult;
use crate::filter::FilterRegistry;

/// Lexes, parses and compiles expressions against one filter registry.
#[derive(Clone)]
pub struct Parser {
    filters: Rc<FilterRegistry>,
}

impl Parser {
    /// Creates a parser with the built-in filters.
    pub fn new() -> Self {
        Self::with_filters(Rc::new(FilterRegistry::new()))
    }

    /// Creates a parser resolving filters through `filters`.
    pub fn with_filters(filters: Rc<FilterRegistry>) -> Self {
        Self { filters }
    }

    /// The registry filter names resolve against.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Compiles `text` into an [`Expression`].
    pub fn parse(&self, text: &str) -> VigilResult<Expression> {
        let program = ast_builder::build_ast(text)?;
        Compiler::new(&self.filters).compile(&program, text)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VigilError;
    use crate::objects::js_function::JsFunction;
    use crate::objects::value::Value;

    #[test]
    fn test_parse_and_evaluate() {
        let parser = Parser::new();
        let expr = parser.parse("a + 1").unwrap();
        let scope = Value::new_object();
        scope.set_member("a", Value::from(1));
        assert_eq!(expr.evaluate(&scope, None).unwrap().to_number(), 2.0);
        assert_eq!(expr.source(), "a + 1");
    }

    #[test]
    fn test_filters_registered_after_construction_are_visible() {
        let parser = Parser::new();
        assert!(matches!(
            parser.parse("'x' | shout"),
            Err(VigilError::UnknownFilter(_))
        ));
        parser.filters().register("shout", || {
            JsFunction::native("shout", 1, |_, args| {
                Ok(Value::from(format!("{}!", args[0].to_js_string())))
            })
        });
        let out = parser
            .parse("'x' | shout | shout")
            .unwrap()
            .evaluate(&Value::new_object(), None)
            .unwrap();
        assert_eq!(out.to_js_string(), "x!!");
    }

    #[test]
    fn test_errors_surface_by_stage() {
        let parser = Parser::new();
        assert!(matches!(parser.parse("'open"), Err(VigilError::Lex { .. })));
        assert!(matches!(parser.parse("a +"), Err(VigilError::Parse(_))));
    }
}
