//! Recursive-descent AST builder.
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! program     := statement (';' statement)*
//! statement   := assignment ('|' IDENT (':' assignment)*)*
//! assignment  := ternary ('=' ternary)?
//! ternary     := or ('?' assignment ':' assignment)?
//! or          := and ('||' and)*
//! and         := equality ('&&' equality)*
//! equality    := relational (('==' | '!=' | '===' | '!==') relational)*
//! relational  := additive (('<' | '>' | '<=' | '>=') additive)*
//! additive    := mult (('+' | '-') mult)*
//! mult        := unary (('*' | '/' | '%') unary)*
//! unary       := ('+' | '-' | '!') unary | primary
//! primary     := ( '(' statement ')' | array | object | literal | 'this' | IDENT )
//!                ( '.' IDENT | '[' assignment ']' | '(' args ')' )*
//! ```

use crate::error::{VigilError, VigilResult};
use crate::parser::ast::{
    ArrayExpr, AssignExpr, BinaryExpr, BinaryOp, CallExpr, ConditionalExpr, Expr, Ident, Literal,
    LiteralValue, LogicalExpr, LogicalOp, MemberExpr, MemberProp, ObjectExpr, Program, PropKey,
    Property, SourceLocation, UnaryExpr, UnaryOp,
};
use crate::parser::lexer::{Position, Span, Token, TokenKind, TokenValue, lex};

/// Deepest expression tree the builder will produce. Operator chains count
/// one level per operator, since they nest on the left.
pub const MAX_NESTING: usize = 128;

/// Builds a [`Program`] from expression source text.
pub fn build_ast(text: &str) -> VigilResult<Program> {
    AstBuilder::new(lex(text)?).program()
}

/// Token cursor plus the grammar productions.
pub struct AstBuilder {
    tokens: Vec<Token>,
    index: usize,
    /// End of the most recently consumed token.
    prev_end: Position,
    depth: usize,
}

impl AstBuilder {
    /// Creates a builder over an already-lexed token sequence.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            index: 0,
            prev_end: Position::default(),
            depth: 0,
        }
    }

    // ── Cursor helpers ──────────────────────────────────────────────────────

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn start_pos(&self) -> Position {
        self.current().map_or(self.prev_end, |t| t.span.start)
    }

    fn span_from(&self, start: Position) -> SourceLocation {
        Span {
            start,
            end: self.prev_end,
        }
    }

    /// Returns `true` if the next token is one of `kinds`.
    fn peek(&self, kinds: &[TokenKind]) -> bool {
        self.current().is_some_and(|t| kinds.contains(&t.kind))
    }

    /// Consumes and returns the next token if it is one of `kinds`.
    fn expect(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if !self.peek(kinds) {
            return None;
        }
        let tok = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        self.prev_end = tok.span.end;
        Some(tok)
    }

    /// Like [`expect`][Self::expect] but fails with a [`VigilError::Parse`]
    /// naming the expected token.
    fn consume(&mut self, kind: TokenKind) -> VigilResult<Token> {
        self.expect(&[kind]).ok_or_else(|| self.unexpected(kind.describe()))
    }

    fn unexpected(&self, expecting: &str) -> VigilError {
        match self.current() {
            Some(tok) => VigilError::Parse(format!(
                "unexpected {} at offset {}, expecting {expecting}",
                tok.kind.describe(),
                tok.span.start.offset
            )),
            None => VigilError::Parse(format!("unexpected end of input, expecting {expecting}")),
        }
    }

    /// Counts one more level of tree depth below the current production.
    fn descend(&mut self) -> VigilResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(VigilError::Parse("expression nested too deeply".into()));
        }
        Ok(())
    }

    // ── Program / statements ────────────────────────────────────────────────

    /// `statement (';' statement)*`, with every token consumed.
    pub fn program(&mut self) -> VigilResult<Program> {
        let start = self.start_pos();
        let mut body = Vec::new();
        loop {
            if self.current().is_some()
                && !self.peek(&[
                    TokenKind::RBrace,
                    TokenKind::RParen,
                    TokenKind::Semicolon,
                    TokenKind::RBracket,
                ])
            {
                body.push(self.filter_chain()?);
            }
            if self.expect(&[TokenKind::Semicolon]).is_none() {
                break;
            }
        }
        if let Some(tok) = self.current() {
            return Err(VigilError::Parse(format!(
                "unexpected trailing {} at offset {}",
                tok.kind.describe(),
                tok.span.start.offset
            )));
        }
        Ok(Program {
            loc: self.span_from(start),
            body,
        })
    }

    /// `assignment ('|' IDENT (':' assignment)*)*`
    fn filter_chain(&mut self) -> VigilResult<Expr> {
        let start = self.start_pos();
        let depth = self.depth;
        let mut left = self.assignment()?;
        while self.expect(&[TokenKind::Pipe]).is_some() {
            self.descend()?;
            let callee = self.identifier()?;
            let mut arguments = vec![left];
            while self.expect(&[TokenKind::Colon]).is_some() {
                arguments.push(self.assignment()?);
            }
            left = Expr::Call(Box::new(CallExpr {
                loc: self.span_from(start),
                callee,
                arguments,
                filter: true,
            }));
        }
        self.depth = depth;
        Ok(left)
    }

    // ── Operators ───────────────────────────────────────────────────────────

    fn assignment(&mut self) -> VigilResult<Expr> {
        let depth = self.depth;
        self.descend()?;
        let expr = self.assignment_expr();
        self.depth = depth;
        expr
    }

    fn assignment_expr(&mut self) -> VigilResult<Expr> {
        let start = self.start_pos();
        let left = self.ternary()?;
        if self.expect(&[TokenKind::Eq]).is_none() {
            return Ok(left);
        }
        if !left.is_assignable() {
            return Err(VigilError::Parse(format!(
                "cannot assign to a non-reference expression at offset {}",
                left.loc().start.offset
            )));
        }
        let right = self.ternary()?;
        Ok(Expr::Assign(Box::new(AssignExpr {
            loc: self.span_from(start),
            left,
            right,
        })))
    }

    fn ternary(&mut self) -> VigilResult<Expr> {
        let start = self.start_pos();
        let test = self.logical(LogicalOp::Or)?;
        if self.expect(&[TokenKind::Question]).is_none() {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.consume(TokenKind::Colon)?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional(Box::new(ConditionalExpr {
            loc: self.span_from(start),
            test,
            consequent,
            alternate,
        })))
    }

    /// `||` binds looser than `&&`; both are left-associative.
    fn logical(&mut self, op: LogicalOp) -> VigilResult<Expr> {
        let start = self.start_pos();
        let (token, next) = match op {
            LogicalOp::Or => (TokenKind::PipePipe, Some(LogicalOp::And)),
            LogicalOp::And => (TokenKind::AmpAmp, None),
        };
        let operand = |this: &mut Self| match next {
            Some(inner) => this.logical(inner),
            None => this.equality(),
        };
        let depth = self.depth;
        let mut left = operand(self)?;
        while self.expect(&[token]).is_some() {
            self.descend()?;
            let right = operand(self)?;
            left = Expr::Logical(Box::new(LogicalExpr {
                loc: self.span_from(start),
                op,
                left,
                right,
            }));
        }
        self.depth = depth;
        Ok(left)
    }

    fn equality(&mut self) -> VigilResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::NotEq),
                (TokenKind::StrictEq, BinaryOp::StrictEq),
                (TokenKind::StrictNotEq, BinaryOp::StrictNotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> VigilResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::LtEq, BinaryOp::LtEq),
                (TokenKind::GtEq, BinaryOp::GtEq),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> VigilResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> VigilResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    /// One left-associative binary precedence level.
    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        operand: fn(&mut Self) -> VigilResult<Expr>,
    ) -> VigilResult<Expr> {
        let start = self.start_pos();
        let kinds: Vec<TokenKind> = ops.iter().map(|(k, _)| *k).collect();
        let depth = self.depth;
        let mut left = operand(self)?;
        while let Some(tok) = self.expect(&kinds) {
            self.descend()?;
            let op = ops
                .iter()
                .find(|(k, _)| *k == tok.kind)
                .map(|(_, op)| *op)
                .ok_or_else(|| VigilError::Parse("operator table mismatch".into()))?;
            let right = operand(self)?;
            left = Expr::Binary(Box::new(BinaryExpr {
                loc: self.span_from(start),
                op,
                left,
                right,
            }));
        }
        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> VigilResult<Expr> {
        let start = self.start_pos();
        let Some(tok) = self.expect(&[TokenKind::Plus, TokenKind::Minus, TokenKind::Bang]) else {
            return self.primary();
        };
        let op = match tok.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => UnaryOp::Not,
        };
        let depth = self.depth;
        self.descend()?;
        let argument = self.unary()?;
        self.depth = depth;
        Ok(Expr::Unary(Box::new(UnaryExpr {
            loc: self.span_from(start),
            op,
            argument,
        })))
    }

    // ── Primary ─────────────────────────────────────────────────────────────

    fn primary(&mut self) -> VigilResult<Expr> {
        let start = self.start_pos();
        let mut node = if self.expect(&[TokenKind::LParen]).is_some() {
            let inner = self.filter_chain()?;
            self.consume(TokenKind::RParen)?;
            inner
        } else if self.expect(&[TokenKind::LBracket]).is_some() {
            self.array_literal(start)?
        } else if self.expect(&[TokenKind::LBrace]).is_some() {
            self.object_literal(start)?
        } else if let Some(lit) = self.literal()? {
            Expr::Literal(lit)
        } else if let Some(tok) = self.expect(&[TokenKind::This]) {
            Expr::This(tok.span)
        } else {
            self.identifier()?
        };

        let depth = self.depth;
        while let Some(tok) =
            self.expect(&[TokenKind::Dot, TokenKind::LBracket, TokenKind::LParen])
        {
            self.descend()?;
            node = match tok.kind {
                TokenKind::Dot => {
                    let Expr::Ident(name) = self.identifier()? else {
                        return Err(self.unexpected("identifier"));
                    };
                    Expr::Member(Box::new(MemberExpr {
                        loc: self.span_from(start),
                        object: node,
                        property: MemberProp::Ident(name),
                    }))
                }
                TokenKind::LBracket => {
                    let property = self.assignment()?;
                    self.consume(TokenKind::RBracket)?;
                    Expr::Member(Box::new(MemberExpr {
                        loc: self.span_from(start),
                        object: node,
                        property: MemberProp::Computed(property),
                    }))
                }
                _ => {
                    let arguments = self.arguments()?;
                    Expr::Call(Box::new(CallExpr {
                        loc: self.span_from(start),
                        callee: node,
                        arguments,
                        filter: false,
                    }))
                }
            };
        }
        self.depth = depth;
        Ok(node)
    }

    fn literal(&mut self) -> VigilResult<Option<Literal>> {
        let Some(tok) = self.expect(&[
            TokenKind::Number,
            TokenKind::String,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
        ]) else {
            return Ok(None);
        };
        let value = match (tok.kind, tok.value) {
            (TokenKind::Number, TokenValue::Number(n)) => LiteralValue::Number(n),
            (TokenKind::String, TokenValue::Str(s)) => LiteralValue::String(s),
            (TokenKind::True, _) => LiteralValue::Bool(true),
            (TokenKind::False, _) => LiteralValue::Bool(false),
            (TokenKind::Null, _) => LiteralValue::Null,
            (kind, _) => {
                return Err(VigilError::Parse(format!(
                    "malformed {} token",
                    kind.describe()
                )));
            }
        };
        Ok(Some(Literal {
            loc: tok.span,
            value,
        }))
    }

    fn identifier(&mut self) -> VigilResult<Expr> {
        let tok = self.consume(TokenKind::Identifier)?;
        let name = tok.text().unwrap_or_default().to_string();
        Ok(Expr::Ident(Ident {
            loc: tok.span,
            name,
        }))
    }

    /// After `(`: `(assignment (',' assignment)*)? ')'`
    fn arguments(&mut self) -> VigilResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.peek(&[TokenKind::RParen]) {
            loop {
                args.push(self.assignment()?);
                if self.expect(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    /// After `[`: elements with an optional trailing comma, then `]`.
    fn array_literal(&mut self, start: Position) -> VigilResult<Expr> {
        let mut elements = Vec::new();
        if !self.peek(&[TokenKind::RBracket]) {
            loop {
                if self.peek(&[TokenKind::RBracket]) {
                    break;
                }
                elements.push(self.assignment()?);
                if self.expect(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBracket)?;
        Ok(Expr::Array(ArrayExpr {
            loc: self.span_from(start),
            elements,
        }))
    }

    /// After `{`: `key: value` pairs with an optional trailing comma, then `}`.
    fn object_literal(&mut self, start: Position) -> VigilResult<Expr> {
        let mut properties = Vec::new();
        if !self.peek(&[TokenKind::RBrace]) {
            loop {
                if self.peek(&[TokenKind::RBrace]) {
                    break;
                }
                let prop_start = self.start_pos();
                let key = if let Some(lit) = self.literal()? {
                    PropKey::Literal(lit)
                } else {
                    match self.identifier() {
                        Ok(Expr::Ident(name)) => PropKey::Ident(name),
                        _ => return Err(self.unexpected("property key")),
                    }
                };
                self.consume(TokenKind::Colon)?;
                let value = self.assignment()?;
                properties.push(Property {
                    loc: self.span_from(prop_start),
                    key,
                    value,
                });
                if self.expect(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Expr::Object(ObjectExpr {
            loc: self.span_from(start),
            properties,
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn single(src: &str) -> Expr {
        let mut prog = build_ast(src).unwrap();
        assert_eq!(prog.body.len(), 1, "expected one statement in {src:?}");
        prog.body.remove(0)
    }

    fn is_parse_error(src: &str) -> bool {
        matches!(build_ast(src), Err(VigilError::Parse(_)))
    }

    // ── Literals ──────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_program() {
        assert!(build_ast("").unwrap().body.is_empty());
        assert!(build_ast(";;").unwrap().body.is_empty());
    }

    #[test]
    fn test_array_and_object_literals_with_trailing_commas() {
        let Expr::Array(arr) = single("[1, 'two', [3],]") else {
            panic!("expected array");
        };
        assert_eq!(arr.elements.len(), 3);
        let Expr::Object(obj) = single("{a: 1, 'b': [2], 3: 'c',}") else {
            panic!("expected object");
        };
        assert_eq!(obj.properties.len(), 3);
        assert!(matches!(obj.properties[0].key, PropKey::Ident(_)));
        assert!(matches!(obj.properties[1].key, PropKey::Literal(_)));
    }

    // ── Precedence ────────────────────────────────────────────────────────────

    #[test]
    fn test_multiplicative_binds_tighter_than_additive() {
        let Expr::Binary(add) = single("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(&add.right, Expr::Binary(m) if m.op == BinaryOp::Mul));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let Expr::Logical(or) = single("a || b && c") else {
            panic!("expected logical");
        };
        assert_eq!(or.op, LogicalOp::Or);
        assert!(matches!(&or.right, Expr::Logical(l) if l.op == LogicalOp::And));
    }

    #[test]
    fn test_ternary_and_parens() {
        assert!(matches!(single("a ? b : c"), Expr::Conditional(_)));
        let Expr::Binary(mul) = single("(1 + 2) * 3") else {
            panic!("expected binary");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
    }

    #[test]
    fn test_unary_chain() {
        let Expr::Unary(not) = single("!!a") else {
            panic!("expected unary");
        };
        assert!(matches!(not.argument, Expr::Unary(_)));
    }

    // ── Members / calls ───────────────────────────────────────────────────────

    #[test]
    fn test_member_and_call_chain() {
        let Expr::Call(call) = single("a.b['c'](1, d)") else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
        assert!(!call.filter);
        let Expr::Member(member) = &call.callee else {
            panic!("expected member callee");
        };
        assert!(member.is_computed());
    }

    // ── Assignment ────────────────────────────────────────────────────────────

    #[test]
    fn test_assignment_targets() {
        assert!(matches!(single("a = 1"), Expr::Assign(_)));
        assert!(matches!(single("a.b[c] = d + 1"), Expr::Assign(_)));
        assert!(is_parse_error("1 = 2"));
        assert!(is_parse_error("a() = 2"));
    }

    // ── Filters / statements ──────────────────────────────────────────────────

    #[test]
    fn test_filter_chain_desugars_to_calls() {
        let Expr::Call(outer) = single("x | f:1:2 | g") else {
            panic!("expected filter call");
        };
        assert!(outer.filter);
        assert_eq!(outer.arguments.len(), 1);
        let Expr::Call(inner) = &outer.arguments[0] else {
            panic!("expected inner filter call");
        };
        assert_eq!(inner.arguments.len(), 3);
    }

    #[test]
    fn test_multiple_statements() {
        assert_eq!(build_ast("a = 1; b = 2; a + b").unwrap().body.len(), 3);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn test_trailing_tokens_are_rejected() {
        assert!(is_parse_error("a b"));
        assert!(is_parse_error("1 )"));
    }

    #[test]
    fn test_missing_token_names_expectation() {
        match build_ast("a ? b") {
            Err(VigilError::Parse(msg)) => assert!(msg.contains("':'"), "{msg}"),
            other => panic!("expected ParseError, got {other:?}"),
        }
        match build_ast("[1, 2") {
            Err(VigilError::Parse(msg)) => assert!(msg.contains("']'"), "{msg}"),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        for src in [
            format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000)),
            format!("{}1", "-".repeat(200_000)),
            format!("{}1{}", "[".repeat(200_000), "]".repeat(200_000)),
        ] {
            match build_ast(&src) {
                Err(VigilError::Parse(msg)) => assert!(msg.contains("too deeply"), "{msg}"),
                other => panic!("expected ParseError, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_long_operator_chains_are_bounded() {
        let sum = vec!["1"; 100_000].join(" + ");
        assert!(is_parse_error(&sum));
        let path = format!("a{}", ".b".repeat(100_000));
        assert!(is_parse_error(&path));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let src = format!("{}a{}", "(".repeat(50), ")".repeat(50));
        assert!(matches!(single(&src), Expr::Ident(_)));
        assert!(matches!(single(&vec!["1"; 100].join(" + ")), Expr::Binary(_)));
        assert!(matches!(single(&format!("{}a", "!".repeat(100))), Expr::Unary(_)));
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(build_ast("a # b"), Err(VigilError::Lex { .. })));
    }
}
