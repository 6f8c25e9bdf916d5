use std::rc::Rc;

use log::{debug, info};

use super::{Flow, Interpreter, Interrupt};
use crate::ast::CallExpression;
use crate::diagnostics::CallFrame;
use crate::environment::{Env, Environment, ScopeKind};
use crate::object::{Builtin, Function, Object};
use crate::token::Position;

impl Interpreter {
    pub(super) fn eval_call(&mut self, expr: &CallExpression, env: &Env) -> Flow {
        let callee = self.eval_expression(&expr.function, env)?;
        let arguments = self.eval_expressions(&expr.arguments, env)?;

        match callee {
            Object::Builtin(builtin) => self.call_builtin(builtin, &arguments, expr.position),
            Object::Function(func) => self.call_function(&func, arguments, expr.position),
            Object::Class(class) => Err(self.fail(
                format!("class {} must be instantiated with 'new'", class.name),
                expr.position,
            )),
            other => Err(self.fail(
                format!("not a function: {}", other.type_tag()),
                expr.position,
            )),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, arguments: &[Object], position: Position) -> Flow {
        debug!("Calling builtin '{}' with {} arguments", builtin.name, arguments.len());

        let result = {
            let mut console = self.console();
            (builtin.func)(&mut console, arguments)
        };

        result.map_err(|msg| self.fail(msg, position))
    }

    /// Invoke a user function: arity check, a parameter scope under the
    /// function's captured environment, then the body as a block inside it.
    /// Falling off the end of the body yields `null`.
    pub(super) fn call_function(&mut self, func: &Rc<Function>, arguments: Vec<Object>, position: Position) -> Flow {
        if arguments.len() != func.arity() {
            return Err(self.fail(
                format!(
                    "wrong number of arguments to '{}': expected {}, got {}",
                    func.display_name(),
                    func.arity(),
                    arguments.len()
                ),
                position,
            ));
        }

        let frame = CallFrame {
            name: func.display_name().to_string(),
            position,
            arguments: arguments.iter().map(Object::repr).collect(),
        };

        if let Err(err) = self.call_stack.push(frame.clone()) {
            return Err(self.raise(err));
        }

        if let Some(observer) = self.observer.as_mut() {
            observer.on_call_push(&frame);
        }

        debug!("Calling '{}' (depth {})", frame.name, self.call_stack.depth());

        let scope = Environment::enclosed(&func.env, ScopeKind::Function);
        let result = self.bind_parameters(func, arguments, &scope, position)
            .and_then(|()| self.eval_block(&func.body, &scope));

        self.call_stack.pop();

        if let Some(observer) = self.observer.as_mut() {
            observer.on_call_pop(&frame);
        }

        match result {
            Ok(_) => Ok(Object::Null),
            Err(Interrupt::Return(value)) => {
                info!("Function '{}' returned {}", frame.name, value.type_tag());
                Ok(value)
            }
            Err(Interrupt::Break(at)) => Err(self.fail("'break' outside of a loop", at)),
            Err(Interrupt::Continue(at)) => Err(self.fail("'continue' outside of a loop", at)),
            Err(err) => Err(err),
        }
    }

    fn bind_parameters(&mut self, func: &Function, arguments: Vec<Object>, scope: &Env, position: Position) -> Flow<()> {
        for (param, value) in func.parameters.iter().zip(arguments) {
            let declared = scope.borrow_mut().declare(&param.name, value, false);

            if let Err(err) = declared {
                return Err(self.binding_error(err, position));
            }
        }

        Ok(())
    }
}
