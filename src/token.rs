use log::trace;
use phf::phf_map;
use serde::Serialize;
use std::fmt;

/// 1-based line/column location of a character in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The different kinds of tokens recognized by the lexer.
///
/// Kinds are plain tags; the text of a token (identifier name, number digits,
/// unescaped string contents) lives in [`Token::literal`].
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Any character the lexer does not understand
    ILLEGAL,

    /// End-of-input marker, repeated forever once reached
    EOF,

    // ── literals ─────────────────────────────────────────────────────────
    IDENT,
    INT,
    FLOAT,
    STRING,
    F_STRING,

    // ── operators ────────────────────────────────────────────────────────
    /// '='
    ASSIGN,
    /// '+'
    PLUS,
    /// '-'
    MINUS,
    /// '*'
    ASTERISK,
    /// '/'
    SLASH,
    /// '//'
    SLASH_SLASH,
    /// '%'
    PERCENT,
    /// '!'
    BANG,
    /// '<'
    LT,
    /// '>'
    GT,
    /// '<='
    LT_EQ,
    /// '>='
    GT_EQ,
    /// '=='
    EQ,
    /// '!='
    NOT_EQ,
    /// '&&'
    AND,
    /// '||'
    OR,
    /// '+='
    PLUS_ASSIGN,
    /// '-='
    MINUS_ASSIGN,
    /// '*='
    ASTERISK_ASSIGN,
    /// '/='
    SLASH_ASSIGN,

    // ── delimiters ───────────────────────────────────────────────────────
    COMMA,
    SEMICOLON,
    COLON,
    DOT,
    LPAREN,
    RPAREN,
    LBRACE,
    RBRACE,
    LBRACKET,
    RBRACKET,

    // ── keywords ─────────────────────────────────────────────────────────
    FUNCTION,
    LET,
    CONST,
    RETURN,
    IF,
    ELIF,
    ELSE,
    WHILE,
    FOR,
    BREAK,
    CONTINUE,
    CLASS,
    EXTENDS,
    NEW,
    THIS,
    SUPER,
    TRUE,
    FALSE,
    NULL,
}

impl TokenKind {
    /// Upper-case tag used by the CLI token dump and error messages.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::ILLEGAL => "ILLEGAL",
            TokenKind::EOF => "EOF",
            TokenKind::IDENT => "IDENT",
            TokenKind::INT => "INT",
            TokenKind::FLOAT => "FLOAT",
            TokenKind::STRING => "STRING",
            TokenKind::F_STRING => "F_STRING",
            TokenKind::ASSIGN => "ASSIGN",
            TokenKind::PLUS => "PLUS",
            TokenKind::MINUS => "MINUS",
            TokenKind::ASTERISK => "ASTERISK",
            TokenKind::SLASH => "SLASH",
            TokenKind::SLASH_SLASH => "SLASH_SLASH",
            TokenKind::PERCENT => "PERCENT",
            TokenKind::BANG => "BANG",
            TokenKind::LT => "LT",
            TokenKind::GT => "GT",
            TokenKind::LT_EQ => "LT_EQ",
            TokenKind::GT_EQ => "GT_EQ",
            TokenKind::EQ => "EQ",
            TokenKind::NOT_EQ => "NOT_EQ",
            TokenKind::AND => "AND",
            TokenKind::OR => "OR",
            TokenKind::PLUS_ASSIGN => "PLUS_ASSIGN",
            TokenKind::MINUS_ASSIGN => "MINUS_ASSIGN",
            TokenKind::ASTERISK_ASSIGN => "ASTERISK_ASSIGN",
            TokenKind::SLASH_ASSIGN => "SLASH_ASSIGN",
            TokenKind::COMMA => "COMMA",
            TokenKind::SEMICOLON => "SEMICOLON",
            TokenKind::COLON => "COLON",
            TokenKind::DOT => "DOT",
            TokenKind::LPAREN => "LPAREN",
            TokenKind::RPAREN => "RPAREN",
            TokenKind::LBRACE => "LBRACE",
            TokenKind::RBRACE => "RBRACE",
            TokenKind::LBRACKET => "LBRACKET",
            TokenKind::RBRACKET => "RBRACKET",
            TokenKind::FUNCTION => "FUNCTION",
            TokenKind::LET => "LET",
            TokenKind::CONST => "CONST",
            TokenKind::RETURN => "RETURN",
            TokenKind::IF => "IF",
            TokenKind::ELIF => "ELIF",
            TokenKind::ELSE => "ELSE",
            TokenKind::WHILE => "WHILE",
            TokenKind::FOR => "FOR",
            TokenKind::BREAK => "BREAK",
            TokenKind::CONTINUE => "CONTINUE",
            TokenKind::CLASS => "CLASS",
            TokenKind::EXTENDS => "EXTENDS",
            TokenKind::NEW => "NEW",
            TokenKind::THIS => "THIS",
            TokenKind::SUPER => "SUPER",
            TokenKind::TRUE => "TRUE",
            TokenKind::FALSE => "FALSE",
            TokenKind::NULL => "NULL",
        }
    }

    /// Tokens that begin a fresh statement; used by parser error recovery.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::CLASS
                | TokenKind::FUNCTION
                | TokenKind::LET
                | TokenKind::CONST
                | TokenKind::FOR
                | TokenKind::IF
                | TokenKind::WHILE
                | TokenKind::RETURN
        )
    }

    /// Map a compound assignment operator onto the binary operator it applies.
    pub fn compound_operator(self) -> Option<TokenKind> {
        match self {
            TokenKind::PLUS_ASSIGN => Some(TokenKind::PLUS),
            TokenKind::MINUS_ASSIGN => Some(TokenKind::MINUS),
            TokenKind::ASTERISK_ASSIGN => Some(TokenKind::ASTERISK),
            TokenKind::SLASH_ASSIGN => Some(TokenKind::SLASH),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "fn"       => TokenKind::FUNCTION,
    "let"      => TokenKind::LET,
    "const"    => TokenKind::CONST,
    "return"   => TokenKind::RETURN,
    "if"       => TokenKind::IF,
    "elif"     => TokenKind::ELIF,
    "else"     => TokenKind::ELSE,
    "while"    => TokenKind::WHILE,
    "for"      => TokenKind::FOR,
    "break"    => TokenKind::BREAK,
    "continue" => TokenKind::CONTINUE,
    "class"    => TokenKind::CLASS,
    "extends"  => TokenKind::EXTENDS,
    "new"      => TokenKind::NEW,
    "this"     => TokenKind::THIS,
    "super"    => TokenKind::SUPER,
    "true"     => TokenKind::TRUE,
    "false"    => TokenKind::FALSE,
    "null"     => TokenKind::NULL,
};

/// Resolve a scanned word to its keyword kind, or `IDENT`.
pub fn lookup_ident(word: &str) -> TokenKind {
    KEYWORDS.get(word).copied().unwrap_or(TokenKind::IDENT)
}

/// A scanned token: its kind, its literal text, and where it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,

    /// Source text of the token; for strings and f-strings the contents
    /// between the quotes with escape sequences translated.
    pub literal: String,

    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: Position) -> Self {
        let literal = literal.into();

        trace!("Creating token: kind={}, literal={:?}, at {}", kind, literal, position);

        Self {
            kind,
            literal,
            position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Self::new(TokenKind::EOF, "", position)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}",
            self.kind, self.literal, self.position.line, self.position.column
        )
    }
}
