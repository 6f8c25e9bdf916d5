//! sprig: a small dynamically typed scripting language with closures and
//! single-inheritance classes.
//!
//! The pipeline is `tokenize` → `parse` → `Interpreter::evaluate`; [`run`]
//! strings the three together for embedders that only want a result.

pub mod ast;
pub mod ast_printer;
pub mod builtins;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod observer;
pub mod parser;
pub mod stack;
pub mod token;

pub use environment::{Env, Environment};
pub use error::{Result, SprigError};
pub use interpreter::{Interpreter, InterpreterConfig};
pub use lexer::tokenize;
pub use object::Object;
pub use parser::{parse, ParseOutput};

/// Parse and evaluate `source` in a fresh global scope.
///
/// Lexing and parse failures, and a runtime error value, are returned as
/// `Err`; anything else is the program's result.
pub fn run(source: &str) -> Result<Object> {
    run_with(Interpreter::new(), source)
}

/// Like [`run`] with a caller-configured interpreter.
pub fn run_with(interpreter: Interpreter, source: &str) -> Result<Object> {
    let output = parse(source)?;

    if !output.errors.is_empty() {
        return Err(SprigError::Parse(output.errors));
    }

    let mut interpreter = interpreter.with_source(source);
    let env = Environment::new();

    match interpreter.evaluate(&output.program, &env) {
        Object::Error(err) => Err(SprigError::Runtime(Box::new((*err).clone()))),
        value => Ok(value),
    }
}
