//! Recursive-descent statement grammar, dispatching on the leading token.
//!
//! ```text
//! statement   → letStmt | constStmt | returnStmt | whileStmt | forStmt
//!             | "break" ";"? | "continue" ";"? | classDecl | fnDecl
//!             | block | exprStmt ;
//! letStmt     → "let" IDENT "=" expression ";"? ;
//! constStmt   → "const" IDENT "=" expression ";"? ;
//! returnStmt  → "return" expression? ";"? ;
//! whileStmt   → "while" "(" expression ")" block ;
//! forStmt     → "for" "(" statement? ";" expression? ";" expression? ")" block ;
//! classDecl   → "class" IDENT ( "extends" IDENT )? "{" member* "}" ;
//! member      → IDENT "(" parameters? ")" block ;      // IDENT may be `constructor`
//! fnDecl      → "fn" IDENT "(" parameters? ")" block ;
//! exprStmt    → expression ";"? ;
//! ```
//!
//! Every rule is entered with its first token as the current token and
//! leaves the last consumed token current.

use std::rc::Rc;

use log::debug;

use super::context::{describe, ParsingContext};
use super::precedence::Precedence;
use crate::ast::{
    ClassStatement, Declaration, Expression, ExpressionStatement, ForStatement, FunctionLiteral,
    Identifier, MethodDefinition, ReturnStatement, Statement, WhileStatement,
};
use crate::token::{Position, TokenKind};

impl<'a> ParsingContext<'a> {
    pub fn parse_statement(&mut self) -> Option<Statement> {
        debug!("Parsing statement at {}", self.current);

        match self.current.kind {
            TokenKind::LET => self.parse_declaration(false),
            TokenKind::CONST => self.parse_declaration(true),
            TokenKind::RETURN => self.parse_return(),
            TokenKind::WHILE => self.parse_while(),
            TokenKind::FOR => self.parse_for(),
            TokenKind::BREAK | TokenKind::CONTINUE => self.parse_loop_control(),
            TokenKind::CLASS => self.parse_class(),
            TokenKind::LBRACE => self.parse_block().map(Statement::Block),
            TokenKind::FUNCTION if self.peek_is(TokenKind::IDENT) => self.parse_function_declaration(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_declaration(&mut self, constant: bool) -> Option<Statement> {
        let position = self.current.position;

        self.expect_peek(TokenKind::IDENT, "variable name")?;
        let name = Identifier::new(self.current.literal.clone(), self.current.position);

        self.expect_peek(TokenKind::ASSIGN, "'=' after variable name")?;
        self.advance();

        let mut value = self.parse_expression(Precedence::Lowest)?;

        if let Expression::Function(func) = &mut value {
            if func.name.is_none() {
                func.name = Some(name.name.clone());
            }
        }

        self.consume(TokenKind::SEMICOLON);

        let decl = Declaration {
            position,
            name,
            value,
        };

        Some(if constant {
            Statement::Const(decl)
        } else {
            Statement::Let(decl)
        })
    }

    fn parse_return(&mut self) -> Option<Statement> {
        let position = self.current.position;

        let value = if self.peek_is(TokenKind::SEMICOLON)
            || self.peek_is(TokenKind::RBRACE)
            || self.peek_is(TokenKind::EOF)
        {
            None
        } else {
            self.advance();
            Some(self.parse_expression(Precedence::Lowest)?)
        };

        self.consume(TokenKind::SEMICOLON);

        Some(Statement::Return(ReturnStatement { position, value }))
    }

    fn parse_while(&mut self) -> Option<Statement> {
        let position = self.current.position;

        self.expect_peek(TokenKind::LPAREN, "'(' after 'while'")?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RPAREN, "')' after loop condition")?;
        self.expect_peek(TokenKind::LBRACE, "'{' before loop body")?;

        let body = self.within_loop(|ctx| ctx.parse_block())?;

        Some(Statement::While(WhileStatement {
            position,
            condition,
            body,
        }))
    }

    fn parse_for(&mut self) -> Option<Statement> {
        let position = self.current.position;

        self.expect_peek(TokenKind::LPAREN, "'(' after 'for'")?;
        self.advance();

        let initializer = if self.current_is(TokenKind::SEMICOLON) {
            None
        } else {
            let init = self.parse_statement()?;

            if !self.current_is(TokenKind::SEMICOLON) {
                self.expect_peek(TokenKind::SEMICOLON, "';' after loop initializer")?;
            }

            Some(Box::new(init))
        };

        let condition = if self.peek_is(TokenKind::SEMICOLON) {
            None
        } else {
            self.advance();
            Some(self.parse_expression(Precedence::Lowest)?)
        };

        self.expect_peek(TokenKind::SEMICOLON, "';' after loop condition")?;

        let increment = if self.peek_is(TokenKind::RPAREN) {
            None
        } else {
            self.advance();
            Some(self.parse_expression(Precedence::Lowest)?)
        };

        self.expect_peek(TokenKind::RPAREN, "')' after for clauses")?;
        self.expect_peek(TokenKind::LBRACE, "'{' before loop body")?;

        let body = self.within_loop(|ctx| ctx.parse_block())?;

        Some(Statement::For(ForStatement {
            position,
            initializer,
            condition,
            increment,
            body,
        }))
    }

    fn parse_loop_control(&mut self) -> Option<Statement> {
        let position = self.current.position;
        let is_break = self.current_is(TokenKind::BREAK);

        if !self.in_loop() {
            let keyword = if is_break { "break" } else { "continue" };
            self.error(format!("'{}' outside of a loop", keyword));
            return None;
        }

        self.consume(TokenKind::SEMICOLON);

        Some(if is_break {
            Statement::Break(position)
        } else {
            Statement::Continue(position)
        })
    }

    fn parse_class(&mut self) -> Option<Statement> {
        let position = self.current.position;

        self.expect_peek(TokenKind::IDENT, "class name")?;
        let name = Identifier::new(self.current.literal.clone(), self.current.position);

        let parent = if self.consume(TokenKind::EXTENDS) {
            self.expect_peek(TokenKind::IDENT, "parent class name after 'extends'")?;
            Some(Identifier::new(self.current.literal.clone(), self.current.position))
        } else {
            None
        };

        self.expect_peek(TokenKind::LBRACE, "'{' before class body")?;
        self.advance();

        let mut constructor: Option<FunctionLiteral> = None;
        let mut methods: Vec<MethodDefinition> = Vec::new();

        while !self.current_is(TokenKind::RBRACE) {
            match self.current.kind {
                TokenKind::EOF => {
                    self.error("expected '}' after class body");
                    return None;
                }
                TokenKind::SEMICOLON => {
                    self.advance();
                    continue;
                }
                TokenKind::IDENT => {}
                _ => {
                    let message = format!(
                        "expected method name in class body, found {}",
                        describe(&self.current)
                    );
                    self.error(message);
                    return None;
                }
            }

            let member = Identifier::new(self.current.literal.clone(), self.current.position);
            let function = self.parse_function_tail(member.position, Some(member.name.clone()))?;

            if member.name == "constructor" {
                if constructor.is_some() {
                    self.error(format!("class '{}' declares more than one constructor", name.name));
                    return None;
                }
                constructor = Some(function);
            } else {
                if methods.iter().any(|m| m.name.name == member.name) {
                    self.error(format!(
                        "method '{}' is declared twice in class '{}'",
                        member.name, name.name
                    ));
                    return None;
                }
                methods.push(MethodDefinition {
                    name: member,
                    function,
                });
            }

            self.advance();
        }

        debug!("Parsed class '{}' with {} methods", name.name, methods.len());

        Some(Statement::Class(ClassStatement {
            position,
            name,
            parent,
            constructor,
            methods,
        }))
    }

    /// `fn name(params) { ... }` → `let name = fn(params) { ... };`
    fn parse_function_declaration(&mut self) -> Option<Statement> {
        let position = self.current.position;

        self.advance();
        let name = Identifier::new(self.current.literal.clone(), self.current.position);
        let function = self.parse_function_tail(position, Some(name.name.clone()))?;

        self.consume(TokenKind::SEMICOLON);

        Some(Statement::Let(Declaration {
            position,
            name,
            value: Expression::Function(function),
        }))
    }

    /// Parameters and body of a function; the token before `(` is current.
    pub fn parse_function_tail(
        &mut self,
        position: Position,
        name: Option<String>,
    ) -> Option<FunctionLiteral> {
        self.expect_peek(TokenKind::LPAREN, "'(' before parameters")?;
        let parameters = self.parse_parameters()?;
        self.expect_peek(TokenKind::LBRACE, "'{' before function body")?;

        let body = self.within_function(|ctx| ctx.parse_block())?;

        Some(FunctionLiteral {
            position,
            name,
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let position = self.current.position;

        // An `if` statement ends at its closing brace: `if (c) { } -1` is
        // two statements, not a subtraction.
        let min = if self.current_is(TokenKind::IF) {
            Precedence::Index
        } else {
            Precedence::Lowest
        };
        let expression = self.parse_expression(min)?;

        self.consume(TokenKind::SEMICOLON);

        Some(Statement::Expression(ExpressionStatement {
            position,
            expression,
        }))
    }
}
