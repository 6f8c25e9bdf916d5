use log::debug;

use super::{Flow, Interpreter, Interrupt};
use crate::ast::{BlockStatement, Declaration, ForStatement, ReturnStatement, WhileStatement};
use crate::environment::{BindingError, Env, Environment, ScopeKind};
use crate::object::Object;
use crate::observer::OutputEvent;
use crate::token::Position;

impl Interpreter {
    pub(super) fn eval_declaration(&mut self, decl: &Declaration, constant: bool, env: &Env) -> Flow {
        let value = self.eval_expression(&decl.value, env)?;

        debug!("Declaring '{}' = {}", decl.name.name, value);

        let declared = env
            .borrow_mut()
            .declare(&decl.name.name, value.clone(), constant);

        if let Err(err) = declared {
            return Err(self.binding_error(err, decl.name.position));
        }

        self.emit(OutputEvent::Assignment {
            name: decl.name.name.clone(),
            value: value.inspect(),
        });

        Ok(Object::Null)
    }

    pub(super) fn eval_return(&mut self, ret: &ReturnStatement, env: &Env) -> Flow {
        let value = match &ret.value {
            Some(expr) => self.eval_expression(expr, env)?,
            None => Object::Null,
        };

        debug!("Returning {}", value);

        Err(Interrupt::Return(value))
    }

    /// A block in its own child scope; its value is that of its last
    /// statement.
    pub(super) fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> Flow {
        let scope = Environment::enclosed(env, ScopeKind::Block);
        self.eval_statements(block, &scope)
    }

    fn eval_statements(&mut self, block: &BlockStatement, env: &Env) -> Flow {
        let mut result = Object::Null;

        for statement in &block.statements {
            result = self.eval_statement(statement, env)?;
        }

        Ok(result)
    }

    pub(super) fn eval_while(&mut self, stmt: &WhileStatement, env: &Env) -> Flow {
        debug!("Entering while loop at {}", stmt.position);

        let mut iterations = 0usize;

        loop {
            let condition = self.eval_expression(&stmt.condition, env)?;
            if !condition.is_truthy() {
                break;
            }

            self.count_iteration(&mut iterations, stmt.position)?;

            match self.eval_block(&stmt.body, env) {
                Ok(_) | Err(Interrupt::Continue(_)) => {}
                Err(Interrupt::Break(_)) => break,
                Err(other) => return Err(other),
            }
        }

        debug!("Exited while loop after {} iterations", iterations);

        Ok(Object::Null)
    }

    pub(super) fn eval_for(&mut self, stmt: &ForStatement, env: &Env) -> Flow {
        debug!("Entering for loop at {}", stmt.position);

        let loop_env = Environment::enclosed(env, ScopeKind::Block);

        if let Some(init) = &stmt.initializer {
            self.eval_statement(init, &loop_env)?;
        }

        let mut iterations = 0usize;

        loop {
            if let Some(condition) = &stmt.condition {
                if !self.eval_expression(condition, &loop_env)?.is_truthy() {
                    break;
                }
            }

            self.count_iteration(&mut iterations, stmt.position)?;

            match self.eval_block(&stmt.body, &loop_env) {
                Ok(_) | Err(Interrupt::Continue(_)) => {}
                Err(Interrupt::Break(_)) => break,
                Err(other) => return Err(other),
            }

            if let Some(increment) = &stmt.increment {
                self.eval_expression(increment, &loop_env)?;
            }
        }

        debug!("Exited for loop after {} iterations", iterations);

        Ok(Object::Null)
    }

    fn count_iteration(&self, iterations: &mut usize, position: Position) -> Flow<()> {
        *iterations += 1;

        if *iterations > self.config.max_loop_iterations {
            return Err(self.fail(
                format!(
                    "maximum iterations ({}) exceeded in loop",
                    self.config.max_loop_iterations
                ),
                position,
            ));
        }

        Ok(())
    }

    pub(super) fn binding_error(&self, err: BindingError, position: Position) -> Interrupt {
        let message = match &err {
            BindingError::AlreadyDeclared(name) => {
                format!("'{}' is already declared in this scope", name)
            }
            BindingError::Constant(name) => format!("cannot assign to constant '{}'", name),
            BindingError::Undeclared(name) => {
                format!("cannot assign to undeclared variable '{}'", name)
            }
        };

        self.fail(message, position)
    }
}
