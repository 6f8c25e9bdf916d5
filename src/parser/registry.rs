use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use super::context::ParsingContext;
use super::parselets;
use crate::ast::Expression;
use crate::token::TokenKind;

/// Parses an expression that *starts* with one of its handled tokens.
///
/// On entry the context's current token is that starting token; on success
/// the current token is the last token of the parsed expression.  Failures
/// are recorded on the context and signalled with `None`.
pub trait PrefixParselet {
    fn handled_token_kinds(&self) -> &[TokenKind];

    fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression>;
}

/// Continues an already-parsed `left` expression with an operator-like
/// token (binary operators, calls, indexing, property access, assignment).
pub trait InfixParselet {
    fn handled_token_kinds(&self) -> &[TokenKind];

    fn parse(&self, ctx: &mut ParsingContext<'_>, left: Expression) -> Option<Expression>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Prefix,
    Infix,
}

impl fmt::Display for Fixity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fixity::Prefix => f.write_str("prefix"),
            Fixity::Infix => f.write_str("infix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a {fixity} parselet is already registered for {kind}")]
    Duplicate { kind: TokenKind, fixity: Fixity },
}

/// Token kind → parselet tables.  Grammar extensions register additional
/// parselets here instead of touching the expression loop.
#[derive(Clone, Default)]
pub struct ParseletRegistry {
    prefix: HashMap<TokenKind, Rc<dyn PrefixParselet>>,
    infix: HashMap<TokenKind, Rc<dyn InfixParselet>>,
}

impl ParseletRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the core grammar.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        for parselet in parselets::default_prefix_parselets() {
            for kind in parselet.handled_token_kinds() {
                registry.prefix.insert(*kind, Rc::clone(&parselet));
            }
        }

        for parselet in parselets::default_infix_parselets() {
            for kind in parselet.handled_token_kinds() {
                registry.infix.insert(*kind, Rc::clone(&parselet));
            }
        }

        debug!(
            "Parselet registry built: {} prefix, {} infix entries",
            registry.prefix.len(),
            registry.infix.len()
        );

        registry
    }

    /// Register `parselet` for every kind it handles.  Nothing is inserted
    /// if any of those kinds is already taken.
    pub fn register_prefix(&mut self, parselet: Rc<dyn PrefixParselet>) -> Result<(), RegistryError> {
        if let Some(kind) = parselet
            .handled_token_kinds()
            .iter()
            .find(|kind| self.prefix.contains_key(*kind))
        {
            return Err(RegistryError::Duplicate {
                kind: *kind,
                fixity: Fixity::Prefix,
            });
        }

        for kind in parselet.handled_token_kinds() {
            debug!("Registering prefix parselet for {}", kind);
            self.prefix.insert(*kind, Rc::clone(&parselet));
        }

        Ok(())
    }

    pub fn register_infix(&mut self, parselet: Rc<dyn InfixParselet>) -> Result<(), RegistryError> {
        if let Some(kind) = parselet
            .handled_token_kinds()
            .iter()
            .find(|kind| self.infix.contains_key(*kind))
        {
            return Err(RegistryError::Duplicate {
                kind: *kind,
                fixity: Fixity::Infix,
            });
        }

        for kind in parselet.handled_token_kinds() {
            debug!("Registering infix parselet for {}", kind);
            self.infix.insert(*kind, Rc::clone(&parselet));
        }

        Ok(())
    }

    pub fn unregister_prefix(&mut self, kind: TokenKind) -> Option<Rc<dyn PrefixParselet>> {
        self.prefix.remove(&kind)
    }

    pub fn unregister_infix(&mut self, kind: TokenKind) -> Option<Rc<dyn InfixParselet>> {
        self.infix.remove(&kind)
    }

    pub fn prefix(&self, kind: TokenKind) -> Option<Rc<dyn PrefixParselet>> {
        self.prefix.get(&kind).cloned()
    }

    pub fn infix(&self, kind: TokenKind) -> Option<Rc<dyn InfixParselet>> {
        self.infix.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AtParselet;

    impl PrefixParselet for AtParselet {
        fn handled_token_kinds(&self) -> &[TokenKind] {
            &[TokenKind::ILLEGAL]
        }

        fn parse(&self, ctx: &mut ParsingContext<'_>) -> Option<Expression> {
            Some(Expression::Null(ctx.current.position))
        }
    }

    #[test]
    fn duplicate_prefix_registration_is_rejected() {
        let mut registry = ParseletRegistry::with_defaults();

        assert!(registry.register_prefix(Rc::new(AtParselet)).is_ok());
        assert_eq!(
            registry.register_prefix(Rc::new(AtParselet)).err(),
            Some(RegistryError::Duplicate {
                kind: TokenKind::ILLEGAL,
                fixity: Fixity::Prefix
            })
        );
    }

    #[test]
    fn unregistered_kinds_have_no_parselet() {
        let mut registry = ParseletRegistry::with_defaults();

        assert!(registry.prefix(TokenKind::INT).is_some());
        assert!(registry.unregister_prefix(TokenKind::INT).is_some());
        assert!(registry.prefix(TokenKind::INT).is_none());
        assert!(registry.infix(TokenKind::PLUS).is_some());
    }
}
