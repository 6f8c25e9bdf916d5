//! Module `lexer` implements a one-pass, streaming lexer for sprig source text.
//!
//! It walks the UTF-8 bytes of a `&str` and produces positioned [`Token`]s,
//! skipping whitespace and comments.  Once the input is exhausted every call
//! to [`Lexer::next_token`] returns an `EOF` token again; the [`Iterator`]
//! view yields that first `EOF` and then stops, so it is safe to chain with
//! other adapters (`FusedIterator`).
//!
//! # Core Phases
//!
//! 1. **Primitive Helpers**
//!    - `ch` is the current byte, `peek()` the one-byte lookahead.
//!    - `advance()` moves one byte forward and keeps `line`/`column` current:
//!      a newline bumps the line and resets the column, UTF-8 continuation
//!      bytes share the column of their lead byte.
//!
//! 2. **Trivia** (`skip_trivia`)
//!    - Whitespace, `# ...` line comments (bulk-skipped with `memchr`) and
//!      `/* ... */` block comments with arbitrary nesting.  An unterminated
//!      block comment silently runs to end of input.
//!
//! 3. **Token Recognition** (`next_token`)
//!    - Two-character operators by one-byte lookahead, then single-character
//!      punctuation.
//!    - `"` strings and `f"` f-strings (brace-depth aware).
//!    - Identifiers/keywords via the perfect-hash keyword table.
//!    - Integers and floats; a `.` not followed by a digit is left for the
//!      next call so `5.part` lexes as `INT DOT IDENT`.
//!    - Anything else becomes a one-character `ILLEGAL` token.
//!
//! Only unterminated strings/f-strings and a stray `}` inside an f-string are
//! errors ([`LexError`]); they mean the source cannot be tokenized at all.

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;

use crate::error::LexError;
use crate::token::{lookup_ident, Position, Token, TokenKind};

/// A single pass **lexer** over borrowed source text.
pub struct Lexer<'a> {
    source: &'a str,
    src: &'a [u8],
    pos: usize,    // index of the current byte
    ch: u8,        // current byte, 0 past the end
    line: usize,   // 1-based line of `ch`
    column: usize, // 1-based column of `ch`
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        info!("Lexer created over {} bytes", source.len());

        let src = source.as_bytes();

        Self {
            source,
            src,
            pos: 0,
            ch: src.first().copied().unwrap_or(0),
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Rewind to the start of the input.
    pub fn reset(&mut self) {
        debug!("Lexer reset");

        self.pos = 0;
        self.ch = self.src.first().copied().unwrap_or(0);
        self.line = 1;
        self.column = 1;
        self.finished = false;
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline(always)]
    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Peek one byte beyond `ch`.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.src.get(self.pos + 1).copied().unwrap_or(0)
    }

    /// Move to the next byte, updating line and column.
    #[inline(always)]
    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }

        let leaving = self.ch;

        self.pos += 1;
        self.ch = self.src.get(self.pos).copied().unwrap_or(0);

        if leaving == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_continuation(self.ch) || self.is_at_end() {
            self.column += 1;
        }
    }

    #[inline(always)]
    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Jump straight to byte index `target` (which must not lie behind
    /// `pos` and must not skip a newline), keeping the column accurate.
    fn jump_to(&mut self, target: usize) {
        let skipped = &self.src[self.pos..target];

        self.column += skipped.iter().filter(|b| !is_continuation(**b)).count();
        self.pos = target;
        self.ch = self.src.get(self.pos).copied().unwrap_or(0);
    }

    // ───────────────────────────── trivia ──────────────────────────────────

    fn skip_trivia(&mut self) {
        loop {
            match self.ch {
                b' ' | b'\t' | b'\r' | b'\n' if !self.is_at_end() => self.advance(),

                b'#' if !self.is_at_end() => {
                    // Fast-forward to the next newline; the newline itself is
                    // consumed as ordinary whitespace on the next turn.
                    let end = match memchr(b'\n', &self.src[self.pos..]) {
                        Some(offset) => self.pos + offset,
                        None => self.src.len(),
                    };

                    self.jump_to(end);
                }

                b'/' if self.peek() == b'*' => self.skip_block_comment(),

                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.here();
        let mut depth: usize = 1;

        self.advance_by(2);

        while depth > 0 && !self.is_at_end() {
            if self.ch == b'/' && self.peek() == b'*' {
                depth += 1;
                self.advance_by(2);
            } else if self.ch == b'*' && self.peek() == b'/' {
                depth -= 1;
                self.advance_by(2);
            } else {
                self.advance();
            }
        }

        if depth > 0 {
            debug!("Block comment opened at {} runs to end of input", start);
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan the next token.  After end of input this keeps returning `EOF`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();

        let start = self.here();

        if self.is_at_end() {
            return Ok(Token::eof(start));
        }

        let token = match self.ch {
            b'=' => self.one_or_two(b'=', TokenKind::EQ, TokenKind::ASSIGN, start),
            b'!' => self.one_or_two(b'=', TokenKind::NOT_EQ, TokenKind::BANG, start),
            b'<' => self.one_or_two(b'=', TokenKind::LT_EQ, TokenKind::LT, start),
            b'>' => self.one_or_two(b'=', TokenKind::GT_EQ, TokenKind::GT, start),
            b'+' => self.one_or_two(b'=', TokenKind::PLUS_ASSIGN, TokenKind::PLUS, start),
            b'-' => self.one_or_two(b'=', TokenKind::MINUS_ASSIGN, TokenKind::MINUS, start),
            b'*' => self.one_or_two(
                b'=',
                TokenKind::ASTERISK_ASSIGN,
                TokenKind::ASTERISK,
                start,
            ),
            b'&' => self.one_or_two(b'&', TokenKind::AND, TokenKind::ILLEGAL, start),
            b'|' => self.one_or_two(b'|', TokenKind::OR, TokenKind::ILLEGAL, start),

            b'/' => match self.peek() {
                b'/' => self.two(TokenKind::SLASH_SLASH, start),
                b'=' => self.two(TokenKind::SLASH_ASSIGN, start),
                _ => self.one(TokenKind::SLASH, start),
            },

            b'%' => self.one(TokenKind::PERCENT, start),
            b',' => self.one(TokenKind::COMMA, start),
            b';' => self.one(TokenKind::SEMICOLON, start),
            b':' => self.one(TokenKind::COLON, start),
            b'(' => self.one(TokenKind::LPAREN, start),
            b')' => self.one(TokenKind::RPAREN, start),
            b'{' => self.one(TokenKind::LBRACE, start),
            b'}' => self.one(TokenKind::RBRACE, start),
            b'[' => self.one(TokenKind::LBRACKET, start),
            b']' => self.one(TokenKind::RBRACKET, start),

            b'"' => self.read_string(start)?,
            b'f' if self.peek() == b'"' => self.read_fstring(start)?,

            b'.' if self.peek().is_ascii_digit() => self.read_number(start),
            b'.' => self.one(TokenKind::DOT, start),

            b'0'..=b'9' => self.read_number(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.read_identifier(start),

            _ => self.read_illegal(start),
        };

        debug!("Scanned token {}", token);

        Ok(token)
    }

    fn one(&mut self, kind: TokenKind, start: Position) -> Token {
        let begin = self.pos;
        self.advance();
        Token::new(kind, &self.source[begin..self.pos], start)
    }

    fn two(&mut self, kind: TokenKind, start: Position) -> Token {
        let begin = self.pos;
        self.advance_by(2);
        Token::new(kind, &self.source[begin..self.pos], start)
    }

    fn one_or_two(
        &mut self,
        second: u8,
        double: TokenKind,
        single: TokenKind,
        start: Position,
    ) -> Token {
        if self.peek() == second {
            self.two(double, start)
        } else {
            self.one(single, start)
        }
    }

    fn read_illegal(&mut self, start: Position) -> Token {
        let begin = self.pos;

        self.advance();
        while !self.is_at_end() && is_continuation(self.ch) {
            self.advance();
        }

        Token::new(TokenKind::ILLEGAL, &self.source[begin..self.pos], start)
    }

    fn read_identifier(&mut self, start: Position) -> Token {
        let begin = self.pos;

        while self.ch.is_ascii_alphanumeric() || self.ch == b'_' {
            self.advance();
        }

        let word = &self.source[begin..self.pos];

        Token::new(lookup_ident(word), word, start)
    }

    /// Integers are a maximal digit run; a `.` followed by a digit makes a
    /// float.  A leading `.` (as in `.5`) is only routed here when a digit
    /// follows it.
    fn read_number(&mut self, start: Position) -> Token {
        let begin = self.pos;
        let mut kind = TokenKind::INT;

        while self.ch.is_ascii_digit() {
            self.advance();
        }

        if self.ch == b'.' && self.peek().is_ascii_digit() {
            kind = TokenKind::FLOAT;
            self.advance();

            while self.ch.is_ascii_digit() {
                self.advance();
            }
        }

        Token::new(kind, &self.source[begin..self.pos], start)
    }

    /// Parse a double-quoted string literal, translating escapes.
    fn read_string(&mut self, start: Position) -> Result<Token, LexError> {
        let mut buf: Vec<u8> = Vec::new();

        self.advance(); // opening quote

        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedString { position: start });
            }

            match self.ch {
                b'"' => {
                    self.advance();
                    break;
                }
                b'\\' => {
                    self.advance();

                    if self.is_at_end() {
                        return Err(LexError::UnterminatedString { position: start });
                    }

                    buf.push(translate_escape(self.ch));
                    self.advance();
                }
                other => {
                    buf.push(other);
                    self.advance();
                }
            }
        }

        Ok(Token::new(
            TokenKind::STRING,
            String::from_utf8_lossy(&buf).into_owned(),
            start,
        ))
    }

    /// Parse `f"..."`.  Text outside braces has its escapes translated,
    /// except `\{`, `\}` and `\\` which are kept for the parser; the
    /// text of each `{...}` interpolation is copied verbatim, tracking brace
    /// depth so nested hash literals or blocks do not end it early.
    fn read_fstring(&mut self, start: Position) -> Result<Token, LexError> {
        let mut buf: Vec<u8> = Vec::new();
        let mut depth: usize = 0;

        self.advance_by(2); // f"

        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedFString { position: start });
            }

            if depth == 0 {
                match self.ch {
                    b'"' => {
                        self.advance();
                        break;
                    }
                    b'\\' => {
                        self.advance();

                        if self.is_at_end() {
                            return Err(LexError::UnterminatedFString { position: start });
                        }

                        // `\{`, `\}` and `\\` stay escaped for `split_fstring`.
                        if matches!(self.ch, b'{' | b'}' | b'\\') {
                            buf.push(b'\\');
                            buf.push(self.ch);
                        } else {
                            buf.push(translate_escape(self.ch));
                        }
                        self.advance();
                    }
                    b'{' => {
                        depth = 1;
                        buf.push(b'{');
                        self.advance();
                    }
                    b'}' => {
                        let position = self.here();
                        self.advance();

                        return Err(LexError::UnmatchedBrace { position });
                    }
                    other => {
                        buf.push(other);
                        self.advance();
                    }
                }

                continue;
            }

            match self.ch {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                b'"' => {
                    self.copy_nested_string(&mut buf, start)?;
                    continue;
                }
                _ => {}
            }

            buf.push(self.ch);
            self.advance();
        }

        Ok(Token::new(
            TokenKind::F_STRING,
            String::from_utf8_lossy(&buf).into_owned(),
            start,
        ))
    }

    /// Copy a string literal that appears inside an f-string interpolation,
    /// quotes and escapes included, so the interpolation can be re-lexed.
    fn copy_nested_string(&mut self, buf: &mut Vec<u8>, start: Position) -> Result<(), LexError> {
        buf.push(b'"');
        self.advance();

        loop {
            if self.is_at_end() {
                return Err(LexError::UnterminatedFString { position: start });
            }

            match self.ch {
                b'"' => {
                    buf.push(b'"');
                    self.advance();
                    return Ok(());
                }
                b'\\' => {
                    buf.push(b'\\');
                    self.advance();

                    if self.is_at_end() {
                        return Err(LexError::UnterminatedFString { position: start });
                    }

                    buf.push(self.ch);
                    self.advance();
                }
                other => {
                    buf.push(other);
                    self.advance();
                }
            }
        }
    }
}

#[inline(always)]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

fn translate_escape(b: u8) -> u8 {
    match b {
        b'n' => b'\n',
        b't' => b'\t',
        b'r' => b'\r',
        b'b' => 0x08,
        b'f' => 0x0C,
        b'v' => 0x0B,
        b'0' => 0,
        other => other, // covers `\\`, `\"` and any unknown escape
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();

        match &result {
            Ok(token) if token.kind == TokenKind::EOF => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }

        Some(result)
    }
}

impl<'a> FusedIterator for Lexer<'a> {}

/// Tokenize the whole of `source`, ending with exactly one `EOF` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}
