//! Expression lexer.
//!
//! The lexer applies an ordered table of token rules at the
//! current scan position.  The first rule that recognises the input wins;
//! rules are tried in priority order rather than by longest match, so the
//! keyword rule shadows the identifier rule and three-character operators are
//! tried before their two- and one-character prefixes.
//!
//! See [`Lexer`] for the main entry point, or [`lex`] for the one-shot form.

use crate::error::{VigilError, VigilResult};

// ─────────────────────────────────────────────────────────────────────────────
// Position / Span
// ─────────────────────────────────────────────────────────────────────────────

/// A byte offset + line/column location in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the beginning of the source string.
    pub offset: usize,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number, measured in Unicode scalar values.
    pub column: u32,
}

/// A half-open `[start, end)` source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Inclusive start of the span.
    pub start: Position,
    /// Exclusive end of the span.
    pub end: Position,
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────────────

/// The syntactic category of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────────────────
    /// Decimal numeric literal, optionally in scientific notation.
    Number,
    /// String literal enclosed in `"` or `'`.
    String,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `this`
    This,
    /// An identifier.
    Identifier,

    // ── Operators ─────────────────────────────────────────────────────────
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `!`
    Bang,
    /// `=`
    Eq,
    /// `|`
    Pipe,

    // ── Punctuation ───────────────────────────────────────────────────────
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// A short human-readable description used in parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
            Self::This => "'this'",
            Self::Identifier => "identifier",
            Self::StrictEq => "'==='",
            Self::StrictNotEq => "'!=='",
            Self::EqEq => "'=='",
            Self::NotEq => "'!='",
            Self::LtEq => "'<='",
            Self::GtEq => "'>='",
            Self::AmpAmp => "'&&'",
            Self::PipePipe => "'||'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Lt => "'<'",
            Self::Gt => "'>'",
            Self::Bang => "'!'",
            Self::Eq => "'='",
            Self::Pipe => "'|'",
            Self::Question => "'?'",
            Self::Colon => "':'",
            Self::Dot => "'.'",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Eof => "end of input",
        }
    }
}

/// Operator and punctuation spellings, longest first within each prefix.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("===", TokenKind::StrictEq),
    ("!==", TokenKind::StrictNotEq),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("!", TokenKind::Bang),
    ("=", TokenKind::Eq),
    ("|", TokenKind::Pipe),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
];

// ─────────────────────────────────────────────────────────────────────────────
// TokenValue / Token
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic value carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// No semantic value (operators, keywords, EOF).
    None,
    /// Identifier name, or the unescaped contents of a string literal.
    Str(String),
    /// Parsed numeric value for [`TokenKind::Number`].
    Number(f64),
}

/// A single lexical token produced by the [`Lexer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The syntactic category.
    pub kind: TokenKind,
    /// The associated value, if any.
    pub value: TokenValue,
    /// Source location of this token.
    pub span: Span,
}

impl Token {
    /// Returns the identifier name or string contents, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Character-classification helpers
// ─────────────────────────────────────────────────────────────────────────────

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\r' | '\t' | '\n' | '\u{000B}' | '\u{00A0}')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
    match word {
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "null" => Some(TokenKind::Null),
        "this" => Some(TokenKind::This),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lexer
// ─────────────────────────────────────────────────────────────────────────────

/// A token rule: returns `None` (consuming nothing) when it does not apply at
/// the current position.
type Rule<'src> = fn(&mut Lexer<'src>, Position) -> Option<VigilResult<Token>>;

/// Converts expression source text into [`Token`]s.
pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source string.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns `true` when all input has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    // ── Low-level character helpers ─────────────────────────────────────────

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.rest().chars();
        it.next();
        it.next()
    }

    /// Advance past the current character and update line/column tracking.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn current_pos(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> VigilError {
        VigilError::Lex {
            offset,
            message: message.into(),
        }
    }

    fn token(&self, kind: TokenKind, value: TokenValue, start: Position) -> Token {
        Token {
            kind,
            value,
            span: Span {
                start,
                end: self.current_pos(),
            },
        }
    }

    // ── Rules ───────────────────────────────────────────────────────────────

    /// `123`, `4.5`, `.5`, `42e3`, `1.5E-2`, `2e+1`.
    fn rule_number(&mut self, start: Position) -> Option<VigilResult<Token>> {
        let first = self.peek()?;
        let leading_dot = first == '.' && self.peek2().is_some_and(|c| c.is_ascii_digit());
        if !first.is_ascii_digit() && !leading_dot {
            return None;
        }
        let begin = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Some(Err(self.error(self.pos, "invalid exponent")));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let raw = &self.source[begin..self.pos];
        Some(match raw.parse::<f64>() {
            Ok(n) => Ok(self.token(TokenKind::Number, TokenValue::Number(n), start)),
            Err(_) => Err(self.error(begin, format!("invalid number '{raw}'"))),
        })
    }

    /// `'…'` or `"…"` with `\n \f \r \t \v \' \" \\` and `\uXXXX` escapes.
    fn rule_string(&mut self, start: Position) -> Option<VigilResult<Token>> {
        let quote = self.peek().filter(|c| matches!(c, '\'' | '"'))?;
        self.advance();
        Some(self.scan_string_body(quote, start))
    }

    fn scan_string_body(&mut self, quote: char, start: Position) -> VigilResult<Token> {
        let mut out = String::new();
        loop {
            let at = self.pos;
            match self.advance() {
                None => return Err(self.error(start.offset, "unmatched quote")),
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    None => return Err(self.error(at, "unterminated escape sequence")),
                    Some('u') => out.push(self.scan_unicode_escape(at)?),
                    Some('n') => out.push('\n'),
                    Some('f') => out.push('\u{000C}'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('v') => out.push('\u{000B}'),
                    Some(other) => out.push(other),
                },
                Some(c) => out.push(c),
            }
        }
        Ok(self.token(TokenKind::String, TokenValue::Str(out), start))
    }

    /// Consumes the four hex digits after `\u`.
    fn scan_unicode_escape(&mut self, escape_offset: usize) -> VigilResult<char> {
        let digits = self.rest().get(..4).unwrap_or("");
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error(escape_offset, "invalid unicode escape"));
        }
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| self.error(escape_offset, "invalid unicode escape"))?;
        for _ in 0..4 {
            self.advance();
        }
        char::from_u32(code).ok_or_else(|| self.error(escape_offset, "invalid unicode escape"))
    }

    /// `true`, `false`, `null`, `this` (whole words only).
    fn rule_keyword(&mut self, start: Position) -> Option<VigilResult<Token>> {
        let word_len = self
            .rest()
            .find(|c: char| !is_ident_continue(c))
            .unwrap_or(self.rest().len());
        let kind = keyword_kind(&self.rest()[..word_len])?;
        for _ in 0..word_len {
            self.advance();
        }
        Some(Ok(self.token(kind, TokenValue::None, start)))
    }

    fn rule_operator(&mut self, start: Position) -> Option<VigilResult<Token>> {
        let (spelling, kind) = OPERATORS
            .iter()
            .find(|(spelling, _)| self.rest().starts_with(spelling))?;
        for _ in 0..spelling.len() {
            self.advance();
        }
        Some(Ok(self.token(*kind, TokenValue::None, start)))
    }

    fn rule_identifier(&mut self, start: Position) -> Option<VigilResult<Token>> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let begin = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        let name = self.source[begin..self.pos].to_string();
        Some(Ok(self.token(TokenKind::Identifier, TokenValue::Str(name), start)))
    }

    // ── Main public API ─────────────────────────────────────────────────────

    /// Scan and return the next [`Token`].
    ///
    /// Returns a token with [`TokenKind::Eof`] when the input is exhausted.
    pub fn next_token(&mut self) -> VigilResult<Token> {
        self.skip_whitespace();
        let start = self.current_pos();
        if self.is_eof() {
            return Ok(self.token(TokenKind::Eof, TokenValue::None, start));
        }
        // Priority order: keywords shadow identifiers.
        let rules: [Rule<'src>; 5] = [
            Self::rule_number,
            Self::rule_string,
            Self::rule_keyword,
            Self::rule_operator,
            Self::rule_identifier,
        ];
        for rule in rules {
            if let Some(result) = rule(self, start) {
                return result;
            }
        }
        let offending = self.peek().unwrap_or('\0');
        Err(self.error(
            start.offset,
            format!("unexpected character '{offending}'"),
        ))
    }

    /// Tokenize the entire source and return all tokens
    /// (the [`TokenKind::Eof`] sentinel is **not** included).
    ///
    /// # Errors
    ///
    /// Returns the first [`VigilError::Lex`] encountered.
    pub fn tokenize_all(source: &'src str) -> VigilResult<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            if tok.kind == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

/// Lexes `text` into a token vector.
pub fn lex(text: &str) -> VigilResult<Vec<Token>> {
    Lexer::tokenize_all(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn single_number(src: &str) -> f64 {
        let toks = lex(src).unwrap();
        assert_eq!(toks.len(), 1, "expected a single token for {src:?}");
        match toks[0].value {
            TokenValue::Number(n) => n,
            ref other => panic!("expected number, got {other:?}"),
        }
    }

    fn single_string(src: &str) -> String {
        let toks = lex(src).unwrap();
        assert_eq!(toks.len(), 1);
        toks[0].text().unwrap().to_string()
    }

    // ── Numbers ───────────────────────────────────────────────────────────────

    #[test]
    fn test_integer_and_float() {
        assert_eq!(single_number("42"), 42.0);
        assert_eq!(single_number("4.2"), 4.2);
        assert_eq!(single_number(".42"), 0.42);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(single_number("42e3"), 42000.0);
        assert_eq!(single_number(".42e2"), 42.0);
        assert_eq!(single_number("4200e-2"), 42.0);
        assert_eq!(single_number(".42e+2"), 42.0);
        assert_eq!(single_number(".42E2"), 42.0);
    }

    #[test]
    fn test_invalid_exponent_is_lex_error() {
        assert!(matches!(lex("42e-"), Err(VigilError::Lex { .. })));
        assert!(matches!(lex("42e-a"), Err(VigilError::Lex { .. })));
    }

    // ── Strings ───────────────────────────────────────────────────────────────

    #[test]
    fn test_both_quote_styles() {
        assert_eq!(single_string("'abc'"), "abc");
        assert_eq!(single_string("\"abc\""), "abc");
    }

    #[test]
    fn test_mismatched_quotes_fail() {
        assert!(matches!(lex("\"abc'"), Err(VigilError::Lex { offset: 0, .. })));
    }

    #[test]
    fn test_escaped_quotes_inside_string() {
        assert_eq!(single_string(r#"'a\'b'"#), "a'b");
        assert_eq!(single_string(r#""a\"b""#), "a\"b");
        assert_eq!(single_string(r#"'a\nb'"#), "a\nb");
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(single_string(r"'\u00A0'"), "\u{00A0}");
        assert!(matches!(lex(r"'\u00T0'"), Err(VigilError::Lex { .. })));
    }

    // ── Keywords / identifiers ────────────────────────────────────────────────

    #[test]
    fn test_keywords_are_whole_words() {
        assert_eq!(
            kinds("true false null this"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::This
            ]
        );
        assert_eq!(kinds("trueish"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("$nullable_1"), vec![TokenKind::Identifier]);
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    #[test]
    fn test_multi_char_operators_win_over_prefixes() {
        assert_eq!(
            kinds("a === b !== c == d != e"),
            vec![
                TokenKind::Identifier,
                TokenKind::StrictEq,
                TokenKind::Identifier,
                TokenKind::StrictNotEq,
                TokenKind::Identifier,
                TokenKind::EqEq,
                TokenKind::Identifier,
                TokenKind::NotEq,
                TokenKind::Identifier,
            ]
        );
        assert_eq!(
            kinds("a||b|c"),
            vec![
                TokenKind::Identifier,
                TokenKind::PipePipe,
                TokenKind::Identifier,
                TokenKind::Pipe,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_member_dot_is_not_a_number() {
        assert_eq!(
            kinds("a.b"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    // ── Whitespace / errors ───────────────────────────────────────────────────

    #[test]
    fn test_whitespace_is_skipped() {
        assert_eq!(single_number(" \n42 \t"), 42.0);
        assert!(lex("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_character_reports_offset() {
        match lex("a # b") {
            Err(VigilError::Lex { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("expected LexError, got {other:?}"),
        }
    }

    #[test]
    fn test_spans_track_columns() {
        let toks = lex("ab + 1").unwrap();
        assert_eq!(toks[1].span.start.column, 4);
        assert_eq!(toks[2].span.start.offset, 5);
    }
}
