use std::collections::HashMap;

use log::{debug, trace};

use super::precedence::{default_precedences, Precedence};
use super::registry::ParseletRegistry;
use crate::ast::{BlockStatement, Expression, Identifier};
use crate::error::{LexError, ParseError};
use crate::lexer::Lexer;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

/// Everything a parselet needs while parsing: the two-token window over the
/// lexer, the accumulated errors, the precedence table, the parselet
/// registry and the loop nesting depth (for `break`/`continue` checks).
pub struct ParsingContext<'a> {
    lexer: Lexer<'a>,
    pub current: Token,
    pub peek: Token,
    errors: Vec<ParseError>,
    fatal: Option<LexError>,
    precedences: HashMap<TokenKind, Precedence>,
    registry: ParseletRegistry,
    loop_depth: usize,
}

impl<'a> ParsingContext<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_grammar(source, ParseletRegistry::with_defaults(), default_precedences())
    }

    pub fn with_grammar(
        source: &'a str,
        registry: ParseletRegistry,
        precedences: HashMap<TokenKind, Precedence>,
    ) -> Self {
        let placeholder = Token::eof(Default::default());

        let mut ctx = Self {
            lexer: Lexer::new(source),
            current: placeholder.clone(),
            peek: placeholder,
            errors: Vec::new(),
            fatal: None,
            precedences,
            registry,
            loop_depth: 0,
        };

        // Fill the current/peek window.
        ctx.advance();
        ctx.advance();

        ctx
    }

    /// A context over `source` sharing this context's grammar; used to parse
    /// f-string interpolations.
    pub fn nested<'b>(&self, source: &'b str) -> ParsingContext<'b> {
        ParsingContext::with_grammar(source, self.registry.clone(), self.precedences.clone())
    }

    // ───────────────────────── token window ─────────────────────────

    /// Shift the window one token forward.  A lexing failure is recorded as
    /// fatal and the stream continues as `EOF`.
    pub fn advance(&mut self) {
        let next = if self.fatal.is_some() {
            Token::eof(self.peek.position)
        } else {
            match self.lexer.next_token() {
                Ok(token) => token,
                Err(err) => {
                    debug!("Lexing failed while parsing: {}", err);
                    let position = err.position();
                    self.fatal = Some(err);
                    Token::eof(position)
                }
            }
        };

        self.current = std::mem::replace(&mut self.peek, next);

        trace!("Parser advanced to {}", self.current);
    }

    #[inline]
    pub fn current_is(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    #[inline]
    pub fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    /// Advance iff the next token is `kind`; otherwise record an error.
    pub fn expect_peek(&mut self, kind: TokenKind, what: &str) -> Option<()> {
        if self.peek_is(kind) {
            self.advance();
            return Some(());
        }

        let message = format!("expected {}, found {}", what, describe(&self.peek));
        let token = self.peek.clone();
        self.error_at(message, &token);

        None
    }

    /// Advance past the next token iff it is `kind`.
    pub fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.advance();
            return true;
        }

        false
    }

    // ───────────────────────── errors ───────────────────────────────

    pub fn error_at<S: Into<String>>(&mut self, message: S, token: &Token) {
        self.errors.push(ParseError::new(message, token));
    }

    /// Record an error at the current token.
    pub fn error<S: Into<String>>(&mut self, message: S) {
        let token = self.current.clone();
        self.error_at(message, &token);
    }

    pub fn push_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn fatal(&self) -> Option<&LexError> {
        self.fatal.as_ref()
    }

    pub fn take_fatal(&mut self) -> Option<LexError> {
        self.fatal.take()
    }

    // ───────────────────────── grammar tables ───────────────────────

    pub fn precedence_of(&self, kind: TokenKind) -> Precedence {
        self.precedences
            .get(&kind)
            .copied()
            .unwrap_or(Precedence::Lowest)
    }

    pub fn peek_precedence(&self) -> Precedence {
        self.precedence_of(self.peek.kind)
    }

    pub fn current_precedence(&self) -> Precedence {
        self.precedence_of(self.current.kind)
    }

    pub fn set_precedence(&mut self, kind: TokenKind, precedence: Precedence) {
        self.precedences.insert(kind, precedence);
    }

    pub fn registry(&self) -> &ParseletRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ParseletRegistry {
        &mut self.registry
    }

    // ───────────────────────── loops ────────────────────────────────

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    /// Run `f` with the loop depth raised by one.
    pub fn within_loop<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    /// Run `f` as a function body: loops outside the function do not count.
    pub fn within_function<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.loop_depth, 0);
        let result = f(self);
        self.loop_depth = saved;
        result
    }

    // ───────────────────────── Pratt loop ───────────────────────────

    /// Parse an expression whose operators all bind tighter than `min`.
    pub fn parse_expression(&mut self, min: Precedence) -> Option<Expression> {
        ensure_sufficient_stack(|| self.parse_expression_inner(min))
    }

    fn parse_expression_inner(&mut self, min: Precedence) -> Option<Expression> {
        let Some(prefix) = self.registry.prefix(self.current.kind) else {
            let message = format!("no prefix parser for {}", self.current.kind);
            self.error(message);
            return None;
        };

        let mut left = prefix.parse(self)?;

        while !self.peek_is(TokenKind::SEMICOLON) && min < self.peek_precedence() {
            let Some(infix) = self.registry.infix(self.peek.kind) else {
                return Some(left);
            };

            self.advance();
            left = infix.parse(self, left)?;
        }

        Some(left)
    }

    /// Comma-separated expressions up to `end`; current token is the opener
    /// on entry and `end` on success.  A trailing comma is allowed.
    pub fn parse_expression_list(&mut self, end: TokenKind, what: &str) -> Option<Vec<Expression>> {
        let mut items = Vec::new();

        if self.consume(end) {
            return Some(items);
        }

        self.advance();
        items.push(self.parse_expression(Precedence::Lowest)?);

        while self.consume(TokenKind::COMMA) {
            if self.peek_is(end) {
                break;
            }

            self.advance();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end, what)?;

        Some(items)
    }

    /// `(a, b, c)` parameter names; current token is `(` on entry and `)`
    /// on success.
    pub fn parse_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut params: Vec<Identifier> = Vec::new();

        if self.consume(TokenKind::RPAREN) {
            return Some(params);
        }

        loop {
            self.expect_peek(TokenKind::IDENT, "parameter name")?;

            if params.iter().any(|p| p.name == self.current.literal) {
                let message = format!("duplicate parameter '{}'", self.current.literal);
                self.error(message);
                return None;
            }

            params.push(Identifier::new(self.current.literal.clone(), self.current.position));

            if !self.consume(TokenKind::COMMA) {
                break;
            }
        }

        self.expect_peek(TokenKind::RPAREN, "')' after parameters")?;

        Some(params)
    }

    /// A `{ ... }` block; current token is `{` on entry and `}` on success.
    pub fn parse_block(&mut self) -> Option<BlockStatement> {
        let position = self.current.position;
        let mut statements = Vec::new();

        self.advance();

        while !self.current_is(TokenKind::RBRACE) {
            if self.current_is(TokenKind::EOF) {
                self.error("expected '}' to close block");
                return None;
            }

            match self.parse_statement() {
                Some(statement) => statements.push(statement),
                None => {
                    if self.synchronize() {
                        break;
                    }
                }
            }

            self.advance();
        }

        Some(BlockStatement {
            position,
            statements,
        })
    }

    /// Skip to a point where the next statement can start: just after a
    /// `;`, or before a statement keyword, a closing `}` or end of input.
    /// Balanced `{ ... }` groups are skipped whole.
    ///
    /// Returns `true` when the current token is a `}` that closes no group
    /// opened during recovery, i.e. the end of the enclosing block.
    pub fn synchronize(&mut self) -> bool {
        debug!("Recovering from parse error at {}", self.current);

        let mut depth = 0usize;

        loop {
            match self.current.kind {
                TokenKind::EOF => return false,
                TokenKind::SEMICOLON if depth == 0 => return false,
                TokenKind::LBRACE => depth += 1,
                TokenKind::RBRACE if depth == 0 => return true,
                TokenKind::RBRACE => depth -= 1,
                _ => {}
            }

            if self.peek_is(TokenKind::EOF) {
                return false;
            }

            if depth == 0 && (self.peek_is(TokenKind::RBRACE) || self.peek.kind.starts_statement()) {
                return false;
            }

            self.advance();
        }
    }
}

/// Human description of a token for "expected ..., found ..." messages.
pub fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::EOF => "end of input".into(),
        TokenKind::STRING => format!("string \"{}\"", token.literal),
        TokenKind::F_STRING => "f-string".into(),
        _ => format!("'{}'", token.literal),
    }
}
