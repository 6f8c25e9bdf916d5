/*!
Pratt parser for sprig
======================

The parser is split in four pieces:

| Module        | Role                                                          |
|---------------|---------------------------------------------------------------|
| `context`     | token window, error list, precedence table, loop depth, Pratt loop |
| `registry`    | token kind → prefix / infix parselet tables                   |
| `parselets`   | the core grammar's expression parselets                       |
| `statement`   | recursive-descent statement grammar                           |

### Complexity

Each token is consumed once by `advance()`; error recovery only skips
forward.  Parsing is Θ(n) in the number of tokens, the AST is O(n).

### Logging Policy

| Location                       | Level   | Purpose                               |
|--------------------------------|---------|---------------------------------------|
| `Parser::new`, `parse_program` | `info`  | Lifecycle milestones.                 |
| statement dispatch, recovery   | `debug` | Descent into grammar branches.        |
| `advance`                      | `trace` | Token-level progress.                 |

### Expression grammar

```text
expression → prefix ( infix )* ;       // while next binds tighter than min
prefix     → IDENT | INT | FLOAT | STRING | F_STRING | "true" | "false"
           | "null" | "this" | ( "!" | "-" ) expression | "(" expression ")"
           | "if" ... | "fn" ... | "[" list "]" | "{" pairs "}"
           | "super" ( "." IDENT )? "(" list ")" | "new" expression "(" list ")" ;
infix      → binary-op expression | ( "&&" | "||" ) expression
           | ( "=" | "+=" | "-=" | "*=" | "/=" ) expression
           | "(" list ")" | "[" expression "]" | "." IDENT ;
```
*/

mod context;
mod parselets;
mod precedence;
mod registry;
mod statement;

use std::rc::Rc;

use log::info;

pub use context::{describe, ParsingContext};
pub use parselets::*;
pub use precedence::{default_precedences, Precedence};
pub use registry::{Fixity, InfixParselet, ParseletRegistry, PrefixParselet, RegistryError};

use crate::ast::{Expression, Program, Statement};
use crate::error::{LexError, ParseError};
use crate::token::TokenKind;

pub struct Parser<'a> {
    ctx: ParsingContext<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Parser initialized");

        Self {
            ctx: ParsingContext::new(source),
        }
    }

    /// Add a prefix parselet; fails if one of its token kinds is taken.
    pub fn register_prefix(&mut self, parselet: Rc<dyn PrefixParselet>) -> Result<(), RegistryError> {
        self.ctx.registry_mut().register_prefix(parselet)
    }

    /// Add an infix parselet; fails if one of its token kinds is taken.
    pub fn register_infix(&mut self, parselet: Rc<dyn InfixParselet>) -> Result<(), RegistryError> {
        self.ctx.registry_mut().register_infix(parselet)
    }

    pub fn unregister_prefix(&mut self, kind: TokenKind) -> Option<Rc<dyn PrefixParselet>> {
        self.ctx.registry_mut().unregister_prefix(kind)
    }

    pub fn unregister_infix(&mut self, kind: TokenKind) -> Option<Rc<dyn InfixParselet>> {
        self.ctx.registry_mut().unregister_infix(kind)
    }

    pub fn set_precedence(&mut self, kind: TokenKind, precedence: Precedence) {
        self.ctx.set_precedence(kind, precedence);
    }

    pub fn parse_expression(&mut self, min: Precedence) -> Option<Expression> {
        self.ctx.parse_expression(min)
    }

    pub fn parse_statement(&mut self) -> Option<Statement> {
        self.ctx.parse_statement()
    }

    /// Parse statements until end of input, recovering at statement
    /// boundaries so every error in the source is reported.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.ctx.current_is(TokenKind::EOF) {
            match self.ctx.parse_statement() {
                Some(statement) => program.statements.push(statement),
                None => {
                    self.ctx.synchronize();
                }
            }

            self.ctx.advance();
        }

        info!(
            "Parsed {} statements with {} errors",
            program.statements.len(),
            self.ctx.errors().len()
        );

        program
    }

    pub fn errors(&self) -> &[ParseError] {
        self.ctx.errors()
    }

    /// The lexing failure that cut the token stream short, if any.
    pub fn lex_error(&self) -> Option<&LexError> {
        self.ctx.fatal()
    }

    pub fn into_errors(mut self) -> Vec<ParseError> {
        self.ctx.take_errors()
    }
}

/// Result of parsing a whole source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse `source` into a program plus every syntax error found.  A lexing
/// failure aborts the parse.
pub fn parse(source: &str) -> Result<ParseOutput, LexError> {
    let mut parser = Parser::new(source);
    let program = parser.parse_program();

    if let Some(err) = parser.ctx.take_fatal() {
        return Err(err);
    }

    Ok(ParseOutput {
        program,
        errors: parser.into_errors(),
    })
}
