//! Expression Abstract Syntax Tree node definitions.
//!
//! Every node struct carries a [`SourceLocation`] field (`loc`) that pinpoints
//! its position in the source text.  [`SourceLocation`] is a type alias for
//! [`crate::parser::lexer::Span`] so it is [`Copy`].
//!
//! Each node exclusively owns its children.  A tree is built once per parse
//! and dropped after compilation; only the compiled evaluator is retained.

use crate::parser::lexer::Span;

/// Source location attached to every AST node.
pub type SourceLocation = Span;

// ─────────────────────────────────────────────────────────────────────────────
// Program
// ─────────────────────────────────────────────────────────────────────────────

/// The root node: `;`-separated statements whose last value is the result.
#[derive(Debug, Clone)]
pub struct Program {
    /// Source location of the entire program.
    pub loc: SourceLocation,
    /// Statements in source order (possibly empty).
    pub body: Vec<Expr>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────────────

/// A primitive literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// A numeric literal.
    Number(f64),
    /// A string literal (escapes already decoded).
    String(String),
}

/// A literal node.
#[derive(Debug, Clone)]
pub struct Literal {
    /// Source location.
    pub loc: SourceLocation,
    /// The literal's value.
    pub value: LiteralValue,
}

/// An identifier reference.
#[derive(Debug, Clone)]
pub struct Ident {
    /// Source location.
    pub loc: SourceLocation,
    /// The raw identifier text.
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `!`
    Not,
}

/// Binary (non-short-circuit) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
}

/// Short-circuit logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `null`, `true`, `42`, `'s'`
    Literal(Literal),
    /// `[a, b]`
    Array(ArrayExpr),
    /// `{a: 1, 'b': 2}`
    Object(ObjectExpr),
    /// `name`
    Ident(Ident),
    /// `this`
    This(SourceLocation),
    /// `obj.prop` or `obj[expr]`
    Member(Box<MemberExpr>),
    /// `callee(args)`, also the desugared form of a filter segment.
    Call(Box<CallExpr>),
    /// `target = value`
    Assign(Box<AssignExpr>),
    /// `-x`
    Unary(Box<UnaryExpr>),
    /// `a + b`
    Binary(Box<BinaryExpr>),
    /// `a && b`
    Logical(Box<LogicalExpr>),
    /// `test ? consequent : alternate`
    Conditional(Box<ConditionalExpr>),
}

impl Expr {
    /// Returns the source location of this expression.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Self::Literal(n) => n.loc,
            Self::Array(n) => n.loc,
            Self::Object(n) => n.loc,
            Self::Ident(n) => n.loc,
            Self::This(loc) => *loc,
            Self::Member(n) => n.loc,
            Self::Call(n) => n.loc,
            Self::Assign(n) => n.loc,
            Self::Unary(n) => n.loc,
            Self::Binary(n) => n.loc,
            Self::Logical(n) => n.loc,
            Self::Conditional(n) => n.loc,
        }
    }

    /// Returns `true` if this expression can be the target of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Ident(_) | Self::Member(_))
    }
}

/// An array literal.
#[derive(Debug, Clone)]
pub struct ArrayExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// Element expressions.
    pub elements: Vec<Expr>,
}

/// The key of an object-literal property.
#[derive(Debug, Clone)]
pub enum PropKey {
    /// `{ name: … }`
    Ident(Ident),
    /// `{ 'name': … }` or `{ 1: … }`
    Literal(Literal),
}

/// A single `key: value` property in an object literal.
#[derive(Debug, Clone)]
pub struct Property {
    /// Source location.
    pub loc: SourceLocation,
    /// The property key.
    pub key: PropKey,
    /// The property value.
    pub value: Expr,
}

/// An object literal.
#[derive(Debug, Clone)]
pub struct ObjectExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// Properties in source order.
    pub properties: Vec<Property>,
}

/// The property part of a member expression.
#[derive(Debug, Clone)]
pub enum MemberProp {
    /// `obj.name`
    Ident(Ident),
    /// `obj[expr]`
    Computed(Expr),
}

/// A member access.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// The object being accessed.
    pub object: Expr,
    /// The property.
    pub property: MemberProp,
}

impl MemberExpr {
    /// Returns `true` for `obj[expr]`.
    pub fn is_computed(&self) -> bool {
        matches!(self.property, MemberProp::Computed(_))
    }
}

/// A call.
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// The callee expression (for a filter, an [`Ident`] naming the filter).
    pub callee: Expr,
    /// Argument expressions.
    pub arguments: Vec<Expr>,
    /// `true` when this node was produced by a `| name:arg` filter segment.
    pub filter: bool,
}

/// An assignment `left = right`.
#[derive(Debug, Clone)]
pub struct AssignExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// Assignment target ([`Expr::Ident`] or [`Expr::Member`]).
    pub left: Expr,
    /// Value expression.
    pub right: Expr,
}

/// A prefix unary expression.
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// The operator.
    pub op: UnaryOp,
    /// The operand.
    pub argument: Expr,
}

/// A binary expression.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// The operator.
    pub op: BinaryOp,
    /// Left operand.
    pub left: Expr,
    /// Right operand.
    pub right: Expr,
}

/// A short-circuit logical expression.
#[derive(Debug, Clone)]
pub struct LogicalExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// The operator.
    pub op: LogicalOp,
    /// Left operand.
    pub left: Expr,
    /// Right operand (evaluated only when needed).
    pub right: Expr,
}

/// `test ? consequent : alternate`
#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    /// Source location.
    pub loc: SourceLocation,
    /// Condition.
    pub test: Expr,
    /// Value when truthy.
    pub consequent: Expr,
    /// Value when falsy.
    pub alternate: Expr,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
