use std::collections::HashMap;

use crate::token::TokenKind;

/// Binding power of infix operators, lowest first.
///
/// Call and index bind tighter than every binary operator, so `f(x)[0]`
/// and `a + b(c)` group the way they read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Lowest,
    Assign,
    LogicalOr,
    LogicalAnd,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

impl Precedence {
    /// One step looser; `Lowest` stays `Lowest`.
    pub fn lower(self) -> Self {
        match self {
            Precedence::Lowest | Precedence::Assign => Precedence::Lowest,
            Precedence::LogicalOr => Precedence::Assign,
            Precedence::LogicalAnd => Precedence::LogicalOr,
            Precedence::Equals => Precedence::LogicalAnd,
            Precedence::LessGreater => Precedence::Equals,
            Precedence::Sum => Precedence::LessGreater,
            Precedence::Product => Precedence::Sum,
            Precedence::Prefix => Precedence::Product,
            Precedence::Call => Precedence::Prefix,
            Precedence::Index => Precedence::Call,
        }
    }
}

/// The operator-precedence table the parser starts with.
pub fn default_precedences() -> HashMap<TokenKind, Precedence> {
    use TokenKind::*;

    let entries = [
        (ASSIGN, Precedence::Assign),
        (PLUS_ASSIGN, Precedence::Assign),
        (MINUS_ASSIGN, Precedence::Assign),
        (ASTERISK_ASSIGN, Precedence::Assign),
        (SLASH_ASSIGN, Precedence::Assign),
        (OR, Precedence::LogicalOr),
        (AND, Precedence::LogicalAnd),
        (EQ, Precedence::Equals),
        (NOT_EQ, Precedence::Equals),
        (LT, Precedence::LessGreater),
        (GT, Precedence::LessGreater),
        (LT_EQ, Precedence::LessGreater),
        (GT_EQ, Precedence::LessGreater),
        (PLUS, Precedence::Sum),
        (MINUS, Precedence::Sum),
        (ASTERISK, Precedence::Product),
        (SLASH, Precedence::Product),
        (SLASH_SLASH, Precedence::Product),
        (PERCENT, Precedence::Product),
        (LPAREN, Precedence::Call),
        (LBRACKET, Precedence::Index),
        (DOT, Precedence::Index),
    ];

    entries.into_iter().collect()
}
