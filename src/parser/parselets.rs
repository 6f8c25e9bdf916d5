//! The core grammar's prefix and infix parselets.

use std::rc::Rc;

use log::debug;

use super::context::{describe, ParsingContext};
use super::precedence::Precedence;
use super::registry::{InfixParselet, PrefixParselet};
use crate::ast::{
    ArrayLiteral, AssignmentExpression, BooleanLiteral, CallExpression, ConditionalBranch,
    Expression, FStringLiteral, FStringPart, FloatLiteral, HashLiteral, Identifier, IfExpression,
    IndexExpression, InfixExpression, InfixOperator, IntegerLiteral, NewExpression,
    PrefixExpression, PrefixOperator, PropertyExpression, StringLiteral, SuperExpression,
};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub fn default_prefix_parselets() -> Vec<Rc<dyn PrefixParselet>> {
    vec![
        Rc::new(IdentifierParselet),
        Rc::new(IntegerParselet),
        Rc::new(FloatParselet),
        Rc::new(StringParselet),
        Rc::new(FStringParselet),
        Rc::new(BooleanParselet),
        Rc::new(NullParselet),
        Rc::new(PrefixOperatorParselet),
        Rc::new(GroupParselet),
        Rc::new(IfParselet),
        Rc::new(FunctionParselet),
        Rc::new(ArrayParselet),
        Rc::new(HashParselet),
        Rc::new(ThisParselet),
        Rc::new(SuperParselet),
        Rc::new(NewParselet),
    ]
}

pub fn default_infix_parselets() -> Vec<Rc<dyn InfixParselet>> {
    vec![
        Rc::new(BinaryOperatorParselet),
        Rc::new(LogicalParselet),
        Rc::new(AssignParselet),
        Rc::new(CompoundAssignParselet),
        Rc::new(CallParselet),
        Rc::new(IndexParselet),
        Rc::new(PropertyParselet),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────────────

pub struct IdentifierParselet;

impl PrefixParselet for IdentifierParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::IDENT]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        Some(Expression::Identifier(Identifier::new(
            ctx.current.literal.clone(),
            ctx.current.position,
        )))
    }
}

pub struct IntegerParselet;

impl PrefixParselet for IntegerParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::INT]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        match ctx.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(IntegerLiteral {
                position: ctx.current.position,
                value,
            })),
            Err(_) => {
                let message = format!("integer literal {} is out of range", ctx.current.literal);
                ctx.error(message);
                None
            }
        }
    }
}

pub struct FloatParselet;

impl PrefixParselet for FloatParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::FLOAT]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        match ctx.current.literal.parse::<f64>() {
            Ok(value) => Some(Expression::Float(FloatLiteral {
                position: ctx.current.position,
                value,
            })),
            Err(_) => {
                let message = format!("could not parse {} as a float", ctx.current.literal);
                ctx.error(message);
                None
            }
        }
    }
}

pub struct StringParselet;

impl PrefixParselet for StringParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::STRING]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        Some(Expression::String(StringLiteral {
            position: ctx.current.position,
            value: ctx.current.literal.clone(),
        }))
    }
}

pub struct BooleanParselet;

impl PrefixParselet for BooleanParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::TRUE, TokenKind::FALSE]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        Some(Expression::Boolean(BooleanLiteral {
            position: ctx.current.position,
            value: ctx.current_is(TokenKind::TRUE),
        }))
    }
}

pub struct NullParselet;

impl PrefixParselet for NullParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::NULL]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        Some(Expression::Null(ctx.current.position))
    }
}

pub struct ThisParselet;

impl PrefixParselet for ThisParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::THIS]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        Some(Expression::This(ctx.current.position))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// F-strings
// ─────────────────────────────────────────────────────────────────────────────

/// Splits the f-string literal into text and `{...}` sources and parses each
/// interpolation with a nested context sharing this grammar.
pub struct FStringParselet;

impl PrefixParselet for FStringParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::F_STRING]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let token = ctx.current.clone();
        let mut parts = Vec::new();
        let mut failed = false;

        for piece in split_fstring(&token.literal) {
            match piece {
                FStringPiece::Text(text) => parts.push(FStringPart::Text(text)),
                FStringPiece::Source(source) => match parse_interpolation(ctx, &source, &token) {
                    Some(expr) => parts.push(FStringPart::Interpolation(expr)),
                    None => failed = true,
                },
            }
        }

        if failed {
            return None;
        }

        Some(Expression::FString(FStringLiteral {
            position: token.position,
            parts,
        }))
    }
}

#[derive(Debug, PartialEq)]
enum FStringPiece {
    Text(String),
    Source(String),
}

/// Mirrors the lexer's f-string scan: braces open interpolations, nested
/// braces and quoted strings inside them are kept intact.  In static text a
/// backslash makes the next character literal.
fn split_fstring(literal: &str) -> Vec<FStringPiece> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = literal.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
            continue;
        }

        if c != '{' {
            text.push(c);
            continue;
        }

        if !text.is_empty() {
            pieces.push(FStringPiece::Text(std::mem::take(&mut text)));
        }

        let mut source = String::new();
        let mut depth = 1usize;

        while let Some(c) = chars.next() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                '"' => {
                    source.push(c);
                    while let Some(s) = chars.next() {
                        source.push(s);
                        match s {
                            '\\' => {
                                if let Some(escaped) = chars.next() {
                                    source.push(escaped);
                                }
                            }
                            '"' => break,
                            _ => {}
                        }
                    }
                    continue;
                }
                _ => {}
            }

            source.push(c);
        }

        pieces.push(FStringPiece::Source(source));
    }

    if !text.is_empty() {
        pieces.push(FStringPiece::Text(text));
    }

    pieces
}

fn parse_interpolation(
    ctx: &mut ParsingContext<'_>,
    source: &str,
    token: &Token,
) -> Option<Expression> {
    if source.trim().is_empty() {
        ctx.error_at("empty interpolation in f-string", token);
        return None;
    }

    let mut nested = ctx.nested(source);
    let expr = nested.parse_expression(Precedence::Lowest);

    if expr.is_some() && !nested.peek_is(TokenKind::EOF) && nested.fatal().is_none() {
        let message = format!(
            "unexpected {} in f-string interpolation",
            describe(&nested.peek)
        );
        nested.error(message);
    }

    let mut failed = false;

    if let Some(err) = nested.take_fatal() {
        ctx.error_at(format!("in f-string interpolation: {}", err), token);
        failed = true;
    }

    for err in nested.take_errors() {
        debug!("Interpolation error: {}", err);
        ctx.push_error(ParseError::new(
            format!("in f-string interpolation: {}", err.message),
            token,
        ));
        failed = true;
    }

    if failed {
        None
    } else {
        expr
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Prefix forms
// ─────────────────────────────────────────────────────────────────────────────

/// Unary `!` and `-`.
pub struct PrefixOperatorParselet;

impl PrefixParselet for PrefixOperatorParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::BANG, TokenKind::MINUS]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;
        let operator = PrefixOperator::from_token(ctx.current.kind)?;

        ctx.advance();
        let right = ctx.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix(PrefixExpression {
            position,
            operator,
            right: Box::new(right),
        }))
    }
}

/// `( expression )`
pub struct GroupParselet;

impl PrefixParselet for GroupParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::LPAREN]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        ctx.advance();
        let expr = ctx.parse_expression(Precedence::Lowest)?;
        ctx.expect_peek(TokenKind::RPAREN, "')' after expression")?;
        Some(expr)
    }
}

/// `if (c) {..} elif (c) {..} else {..}`; `else if` is read as `elif`.
pub struct IfParselet;

impl IfParselet {
    fn branch(ctx: &mut ParsingContext<'_>) -> Option<ConditionalBranch> {
        ctx.expect_peek(TokenKind::LPAREN, "'(' after 'if'")?;
        ctx.advance();
        let condition = ctx.parse_expression(Precedence::Lowest)?;
        ctx.expect_peek(TokenKind::RPAREN, "')' after condition")?;
        ctx.expect_peek(TokenKind::LBRACE, "'{' before branch body")?;
        let consequence = ctx.parse_block()?;

        Some(ConditionalBranch {
            condition,
            consequence,
        })
    }
}

impl PrefixParselet for IfParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::IF]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;
        let mut branches = vec![Self::branch(ctx)?];
        let mut alternative = None;

        loop {
            if ctx.consume(TokenKind::ELIF) {
                branches.push(Self::branch(ctx)?);
            } else if ctx.consume(TokenKind::ELSE) {
                if ctx.consume(TokenKind::IF) {
                    branches.push(Self::branch(ctx)?);
                    continue;
                }

                ctx.expect_peek(TokenKind::LBRACE, "'{' after 'else'")?;
                alternative = Some(ctx.parse_block()?);
                break;
            } else {
                break;
            }
        }

        Some(Expression::If(IfExpression {
            position,
            branches,
            alternative,
        }))
    }
}

/// `fn (params) { body }`
pub struct FunctionParselet;

impl PrefixParselet for FunctionParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::FUNCTION]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;
        let function = ctx.parse_function_tail(position, None)?;

        Some(Expression::Function(function))
    }
}

/// `[a, b, c]`
pub struct ArrayParselet;

impl PrefixParselet for ArrayParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::LBRACKET]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;
        let elements = ctx.parse_expression_list(TokenKind::RBRACKET, "']' after array elements")?;

        Some(Expression::Array(ArrayLiteral { position, elements }))
    }
}

/// `{ "key": value, name: value, 1: value }`
pub struct HashParselet;

impl PrefixParselet for HashParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::LBRACE]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;
        let mut pairs = Vec::new();

        while !ctx.peek_is(TokenKind::RBRACE) {
            ctx.advance();

            let key = match ctx.current.kind {
                TokenKind::STRING | TokenKind::IDENT => ctx.current.literal.clone(),
                TokenKind::INT => match ctx.current.literal.parse::<i64>() {
                    Ok(n) => n.to_string(),
                    Err(_) => {
                        let message = format!("integer key {} is out of range", ctx.current.literal);
                        ctx.error(message);
                        return None;
                    }
                },
                _ => {
                    let message = format!("invalid hash key {}", describe(&ctx.current));
                    ctx.error(message);
                    return None;
                }
            };

            ctx.expect_peek(TokenKind::COLON, "':' after hash key")?;
            ctx.advance();
            let value = ctx.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !ctx.peek_is(TokenKind::RBRACE) {
                ctx.expect_peek(TokenKind::COMMA, "',' or '}' in hash literal")?;
            }
        }

        ctx.expect_peek(TokenKind::RBRACE, "'}' after hash literal")?;

        Some(Expression::Hash(HashLiteral { position, pairs }))
    }
}

/// `super(args)` or `super.method(args)`
pub struct SuperParselet;

impl PrefixParselet for SuperParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::SUPER]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;

        let method = if ctx.consume(TokenKind::DOT) {
            ctx.expect_peek(TokenKind::IDENT, "method name after 'super.'")?;
            Some(Identifier::new(ctx.current.literal.clone(), ctx.current.position))
        } else {
            None
        };

        ctx.expect_peek(TokenKind::LPAREN, "'(' or '.' after 'super'")?;
        let arguments = ctx.parse_expression_list(TokenKind::RPAREN, "')' after arguments")?;

        Some(Expression::Super(SuperExpression {
            position,
            method,
            arguments,
        }))
    }
}

/// `new ClassExpr(args)`; the class expression stops before the argument
/// list, so `new A(1).m()` calls `m` on the new instance.
pub struct NewParselet;

impl PrefixParselet for NewParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::NEW]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
        let position = ctx.current.position;

        ctx.advance();
        let class = ctx.parse_expression(Precedence::Call)?;

        ctx.expect_peek(TokenKind::LPAREN, "'(' after class in 'new'")?;
        let arguments = ctx.parse_expression_list(TokenKind::RPAREN, "')' after arguments")?;

        Some(Expression::New(NewExpression {
            position,
            class: Box::new(class),
            arguments,
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Infix forms
// ─────────────────────────────────────────────────────────────────────────────

/// Left-associative arithmetic, comparison and equality operators.
pub struct BinaryOperatorParselet;

impl InfixParselet for BinaryOperatorParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[
            TokenKind::PLUS,
            TokenKind::MINUS,
            TokenKind::ASTERISK,
            TokenKind::SLASH,
            TokenKind::SLASH_SLASH,
            TokenKind::PERCENT,
            TokenKind::EQ,
            TokenKind::NOT_EQ,
            TokenKind::LT,
            TokenKind::GT,
            TokenKind::LT_EQ,
            TokenKind::GT_EQ,
        ]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;
        let operator = InfixOperator::from_token(ctx.current.kind)?;
        let precedence = ctx.current_precedence();

        ctx.advance();
        let right = ctx.parse_expression(precedence)?;

        Some(Expression::Infix(InfixExpression {
            position,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }))
    }
}

/// `&&` and `||`: the right operand is parsed one precedence level looser.
pub struct LogicalParselet;

impl InfixParselet for LogicalParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::AND, TokenKind::OR]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;
        let operator = InfixOperator::from_token(ctx.current.kind)?;
        let precedence = ctx.current_precedence().lower();

        ctx.advance();
        let right = ctx.parse_expression(precedence)?;

        Some(Expression::Infix(InfixExpression {
            position,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }))
    }
}

/// `target = value`, right-associative.
pub struct AssignParselet;

impl InfixParselet for AssignParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::ASSIGN]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;

        if !left.is_assignable() {
            ctx.error("invalid assignment target");
            return None;
        }

        ctx.advance();
        let value = ctx.parse_expression(Precedence::Assign.lower())?;

        Some(Expression::Assignment(AssignmentExpression {
            position,
            target: Box::new(left),
            value: Box::new(value),
        }))
    }
}

/// `x += e` and friends, rewritten to `x = x + e` while parsing.
pub struct CompoundAssignParselet;

impl InfixParselet for CompoundAssignParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[
            TokenKind::PLUS_ASSIGN,
            TokenKind::MINUS_ASSIGN,
            TokenKind::ASTERISK_ASSIGN,
            TokenKind::SLASH_ASSIGN,
        ]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;
        let operator = ctx
            .current
            .kind
            .compound_operator()
            .and_then(InfixOperator::from_token)?;

        if !left.is_assignable() {
            ctx.error("invalid assignment target");
            return None;
        }

        ctx.advance();
        let value = ctx.parse_expression(Precedence::Assign.lower())?;

        let combined = Expression::Infix(InfixExpression {
            position,
            left: Box::new(left.clone()),
            operator,
            right: Box::new(value),
        });

        Some(Expression::Assignment(AssignmentExpression {
            position,
            target: Box::new(left),
            value: Box::new(combined),
        }))
    }
}

/// `callee(args)`
pub struct CallParselet;

impl InfixParselet for CallParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::LPAREN]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;
        let arguments = ctx.parse_expression_list(TokenKind::RPAREN, "')' after arguments")?;

        Some(Expression::Call(CallExpression {
            position,
            function: Box::new(left),
            arguments,
        }))
    }
}

/// `collection[index]`
pub struct IndexParselet;

impl InfixParselet for IndexParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::LBRACKET]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        let position = ctx.current.position;

        ctx.advance();
        let index = ctx.parse_expression(Precedence::Lowest)?;
        ctx.expect_peek(TokenKind::RBRACKET, "']' after index")?;

        Some(Expression::Index(IndexExpression {
            position,
            left: Box::new(left),
            index: Box::new(index),
        }))
    }
}

/// `object.name`
pub struct PropertyParselet;

impl InfixParselet for PropertyParselet {
    fn handled_token_kinds(&self) -> &[TokenKind] {
        &[TokenKind::DOT]
    }

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression> {
        ctx.expect_peek(TokenKind::IDENT, "property name after '.'")?;
        let property = Identifier::new(ctx.current.literal.clone(), ctx.current.position);

        Some(Expression::Property(PropertyExpression {
            position: property.position,
            object: Box::new(left),
            property,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fstring_splits_text_and_sources() {
        assert_eq!(
            split_fstring("sum={1+2}!"),
            vec![
                FStringPiece::Text("sum=".into()),
                FStringPiece::Source("1+2".into()),
                FStringPiece::Text("!".into()),
            ]
        );
    }

    #[test]
    fn fstring_keeps_nested_braces_and_strings() {
        assert_eq!(
            split_fstring("{ {\"a\": 1}[\"a\"] }{\"}\"}"),
            vec![
                FStringPiece::Source(" {\"a\": 1}[\"a\"] ".into()),
                FStringPiece::Source("\"}\"".into()),
            ]
        );
    }
}
