//! Tree-walking evaluator.
//!
//! Every rule returns a [`Flow`]: `Ok(value)` for normal completion, or an
//! [`Interrupt`] that `?` carries upward until a construct that handles it
//! (loops take `Break`/`Continue`, calls take `Return`).  Runtime errors
//! travel the same way and become an `Object::Error` at the program
//! boundary, so the host always gets a value back.
//!
//! The rules themselves live in the sub-modules:
//!
//! | Module       | Node kinds                                              |
//! |--------------|---------------------------------------------------------|
//! | `statement`  | let, const, return, block, while, for, break, continue  |
//! | `expression` | literals, identifiers, f-strings, if, assignment, index |
//! | `operators`  | prefix and infix operators                              |
//! | `call`       | calls of user functions and builtins                    |
//! | `class`      | class declarations, `new`, properties, `this`, `super`  |

mod call;
mod class;
mod expression;
mod operators;
mod statement;

use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::ast::{Expression, Node, NodeKind, Program, Statement};
use crate::builtins::Console;
use crate::diagnostics::{CallStack, RuntimeError};
use crate::environment::Env;
use crate::object::Object;
use crate::observer::{Observer, OutputEvent, StepPhase};
use crate::stack::ensure_sufficient_stack;
use crate::token::Position;

/// Binding name under which a class body's environment records its class.
/// Not a valid identifier, so programs cannot read or shadow it.
pub(crate) const CLASS_BINDING: &str = "%class";

pub(crate) const THIS_BINDING: &str = "this";

/// Non-local exits carried through the `Err` side of [`Flow`].
#[derive(Debug)]
pub enum Interrupt {
    Return(Object),
    Break(Position),
    Continue(Position),
    Error(Box<RuntimeError>),
}

/// Outcome of evaluating one node.
pub type Flow<T = Object> = Result<T, Interrupt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Iterations a single loop may run before it is aborted.
    pub max_loop_iterations: usize,
    /// Nested user-function calls allowed at once.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 1_000_000,
            max_call_depth: 2_000,
        }
    }
}

pub struct Interpreter {
    config: InterpreterConfig,
    source: Option<Rc<str>>,
    observer: Option<Box<dyn Observer>>,
    output: Box<dyn Write>,
    call_stack: CallStack,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        info!("Initializing Interpreter ({:?})", config);

        Self {
            config,
            source: None,
            observer: None,
            output: Box::new(io::stdout()),
            call_stack: CallStack::new(config.max_call_depth),
        }
    }

    /// Source text used to render snippets in runtime errors.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(Rc::from(source));
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Where `print` writes; stdout by default.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run `program` in `env`.  The result is the value of the last
    /// statement, the value of a top-level `return`, or an `Object::Error`.
    pub fn evaluate(&mut self, program: &Program, env: &Env) -> Object {
        info!("Evaluating program with {} statements", program.statements.len());

        self.step(NodeKind::Program, program.position(), StepPhase::Before);

        let mut result = Object::Null;

        for statement in &program.statements {
            match self.eval_statement(statement, env) {
                Ok(value) => result = value,
                Err(Interrupt::Return(value)) => {
                    result = value;
                    break;
                }
                Err(interrupt) => {
                    let err = self.into_error(interrupt);
                    self.emit(OutputEvent::Error(err.to_string()));
                    self.step(NodeKind::Program, program.position(), StepPhase::After);
                    return err;
                }
            }
        }

        self.emit(OutputEvent::ReturnValue(result.inspect()));
        self.step(NodeKind::Program, program.position(), StepPhase::After);

        info!("Program finished with {}", result.type_tag());

        result
    }

    /// Evaluate one statement outside of a program run.
    pub fn evaluate_statement(&mut self, statement: &Statement, env: &Env) -> Object {
        match self.eval_statement(statement, env) {
            Ok(value) | Err(Interrupt::Return(value)) => value,
            Err(interrupt) => self.into_error(interrupt),
        }
    }

    /// Evaluate one expression outside of a program run.
    pub fn evaluate_expression(&mut self, expression: &Expression, env: &Env) -> Object {
        match self.eval_expression(expression, env) {
            Ok(value) | Err(Interrupt::Return(value)) => value,
            Err(interrupt) => self.into_error(interrupt),
        }
    }

    fn into_error(&mut self, interrupt: Interrupt) -> Object {
        let err = match interrupt {
            Interrupt::Error(err) => *err,
            Interrupt::Break(position) => self.decorate(RuntimeError::new("'break' outside of a loop", position)),
            Interrupt::Continue(position) => {
                self.decorate(RuntimeError::new("'continue' outside of a loop", position))
            }
            Interrupt::Return(value) => return value,
        };

        debug!("Evaluation failed: {}", err.message);

        Object::Error(Rc::new(err))
    }

    // ───────────────────────── dispatch ─────────────────────────────

    pub(crate) fn eval_statement(&mut self, statement: &Statement, env: &Env) -> Flow {
        let (kind, position) = (statement.kind(), statement.position());

        self.step(kind, position, StepPhase::Before);

        let result = ensure_sufficient_stack(|| match statement {
            Statement::Let(decl) => self.eval_declaration(decl, false, env),
            Statement::Const(decl) => self.eval_declaration(decl, true, env),
            Statement::Return(ret) => self.eval_return(ret, env),
            Statement::Expression(stmt) => self.eval_expression(&stmt.expression, env),
            Statement::Block(block) => self.eval_block(block, env),
            Statement::While(stmt) => self.eval_while(stmt, env),
            Statement::For(stmt) => self.eval_for(stmt, env),
            Statement::Break(position) => Err(Interrupt::Break(*position)),
            Statement::Continue(position) => Err(Interrupt::Continue(*position)),
            Statement::Class(class) => self.eval_class(class, env),
        });

        self.step(kind, position, StepPhase::After);

        result
    }

    pub(crate) fn eval_expression(&mut self, expression: &Expression, env: &Env) -> Flow {
        let (kind, position) = (expression.kind(), expression.position());

        self.step(kind, position, StepPhase::Before);

        let result = ensure_sufficient_stack(|| match expression {
            Expression::Identifier(ident) => self.eval_identifier(ident, env),
            Expression::Integer(lit) => Ok(Object::Integer(lit.value)),
            Expression::Float(lit) => Ok(Object::Float(lit.value)),
            Expression::String(lit) => Ok(Object::string(&lit.value)),
            Expression::Boolean(lit) => Ok(Object::Boolean(lit.value)),
            Expression::Null(_) => Ok(Object::Null),
            Expression::FString(lit) => self.eval_fstring(lit, env),
            Expression::Array(lit) => self.eval_array(lit, env),
            Expression::Hash(lit) => self.eval_hash(lit, env),
            Expression::Function(lit) => Ok(self.eval_function_literal(lit, env)),
            Expression::Prefix(e) => self.eval_prefix(e, env),
            Expression::Infix(e) => self.eval_infix(e, env),
            Expression::Assignment(e) => self.eval_assignment(e, env),
            Expression::Call(e) => self.eval_call(e, env),
            Expression::Index(e) => self.eval_index(e, env),
            Expression::If(e) => self.eval_if(e, env),
            Expression::New(e) => self.eval_new(e, env),
            Expression::This(position) => self.eval_this(*position, env),
            Expression::Super(e) => self.eval_super(e, env),
            Expression::Property(e) => self.eval_property(e, env),
        });

        self.step(kind, position, StepPhase::After);

        result
    }

    // ───────────────────────── errors ───────────────────────────────

    /// Attach the live call stack and the source window.
    pub(crate) fn decorate(&self, err: RuntimeError) -> RuntimeError {
        err.with_stack(&self.call_stack)
            .with_source(self.source.as_deref())
    }

    pub(crate) fn raise(&self, err: RuntimeError) -> Interrupt {
        Interrupt::Error(Box::new(self.decorate(err)))
    }

    pub(crate) fn fail<S: Into<String>>(&self, message: S, position: Position) -> Interrupt {
        self.raise(RuntimeError::new(message, position))
    }

    // ───────────────────────── instrumentation ──────────────────────

    fn step(&mut self, kind: NodeKind, position: Position, phase: StepPhase) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_step(kind, position, phase);
        }
    }

    pub(crate) fn emit(&mut self, event: OutputEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_output(&event);
        }
    }

    /// The `print` sink handed to builtins.
    pub(crate) fn console(&mut self) -> Printer<'_> {
        Printer {
            output: &mut self.output,
            observer: &mut self.observer,
        }
    }
}

pub(crate) struct Printer<'a> {
    output: &'a mut Box<dyn Write>,
    observer: &'a mut Option<Box<dyn Observer>>,
}

impl Console for Printer<'_> {
    fn print_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.output, "{}", line).and_then(|_| self.output.flush()) {
            warn!("Could not write program output: {}", err);
        }

        if let Some(observer) = self.observer.as_mut() {
            observer.on_output(&OutputEvent::Log(line.to_string()));
        }
    }
}

impl From<RuntimeError> for Interrupt {
    fn from(err: RuntimeError) -> Self {
        Interrupt::Error(Box::new(err))
    }
}
