use std::rc::Rc;

use log::debug;

use super::{Flow, Interpreter, Interrupt, CLASS_BINDING};
use crate::ast::{
    ArrayLiteral, AssignmentExpression, Expression, FStringLiteral, FStringPart, FunctionLiteral,
    HashLiteral, Identifier, IfExpression, IndexExpression, Node,
};
use crate::builtins;
use crate::diagnostics::{did_you_mean, RuntimeError};
use crate::environment::{BindingError, Env};
use crate::object::{Function, HashObject, Object};
use crate::observer::OutputEvent;
use crate::token::Position;

impl Interpreter {
    /// Scope chain first, then the builtin table.
    pub(super) fn eval_identifier(&mut self, ident: &Identifier, env: &Env) -> Flow {
        if let Some(value) = env.borrow().get(&ident.name) {
            return Ok(value);
        }

        if let Some(builtin) = builtins::lookup(&ident.name) {
            return Ok(Object::Builtin(builtin));
        }

        debug!("Identifier '{}' not found", ident.name);

        Err(self.unknown_name(&format!("identifier not found: {}", ident.name), ident, env))
    }

    fn unknown_name(&self, message: &str, ident: &Identifier, env: &Env) -> Interrupt {
        let visible = env.borrow().visible_names();
        let mut candidates: Vec<&str> = visible
            .iter()
            .map(String::as_str)
            .filter(|name| *name != CLASS_BINDING)
            .collect();
        candidates.extend(builtins::names().map(|name| -> &str { name }));

        let mut err = RuntimeError::new(message, ident.position);
        if let Some(hint) = did_you_mean(&ident.name, candidates) {
            err = err.with_hint(hint);
        }

        self.raise(err)
    }

    pub(super) fn eval_fstring(&mut self, lit: &FStringLiteral, env: &Env) -> Flow {
        let mut out = String::new();

        for part in &lit.parts {
            match part {
                FStringPart::Text(text) => out.push_str(text),
                FStringPart::Interpolation(expr) => {
                    let value = self.eval_expression(expr, env)?;
                    out.push_str(&value.inspect());
                }
            }
        }

        Ok(Object::string(out))
    }

    pub(super) fn eval_array(&mut self, lit: &ArrayLiteral, env: &Env) -> Flow {
        let items = self.eval_expressions(&lit.elements, env)?;
        Ok(Object::array(items))
    }

    /// Left to right; the first failure stops evaluation.
    pub(super) fn eval_expressions(&mut self, exprs: &[Expression], env: &Env) -> Flow<Vec<Object>> {
        let mut values = Vec::with_capacity(exprs.len());

        for expr in exprs {
            values.push(self.eval_expression(expr, env)?);
        }

        Ok(values)
    }

    pub(super) fn eval_hash(&mut self, lit: &HashLiteral, env: &Env) -> Flow {
        let mut hash = HashObject::new();

        for (key, value) in &lit.pairs {
            let value = self.eval_expression(value, env)?;
            hash.insert(key.clone(), value);
        }

        Ok(Object::hash(hash))
    }

    pub(super) fn eval_function_literal(&mut self, lit: &FunctionLiteral, env: &Env) -> Object {
        Object::Function(Rc::new(Function {
            name: lit.name.clone(),
            parameters: lit.parameters.clone(),
            body: Rc::clone(&lit.body),
            env: Rc::clone(env),
        }))
    }

    pub(super) fn eval_if(&mut self, expr: &IfExpression, env: &Env) -> Flow {
        for branch in &expr.branches {
            if self.eval_expression(&branch.condition, env)?.is_truthy() {
                return self.eval_block(&branch.consequence, env);
            }
        }

        match &expr.alternative {
            Some(block) => self.eval_block(block, env),
            None => Ok(Object::Null),
        }
    }

    pub(super) fn eval_assignment(&mut self, expr: &AssignmentExpression, env: &Env) -> Flow {
        match expr.target.as_ref() {
            Expression::Identifier(ident) => {
                let value = self.eval_expression(&expr.value, env)?;

                let assigned = env.borrow_mut().assign(&ident.name, value.clone());

                match assigned {
                    Ok(()) => {}
                    Err(BindingError::Undeclared(_)) => {
                        let message = format!("cannot assign to undeclared variable '{}'", ident.name);
                        return Err(self.unknown_name(&message, ident, env));
                    }
                    Err(err) => return Err(self.binding_error(err, ident.position)),
                }

                self.emit(OutputEvent::Assignment {
                    name: ident.name.clone(),
                    value: value.inspect(),
                });

                Ok(value)
            }

            Expression::Index(target) => {
                let collection = self.eval_expression(&target.left, env)?;
                let index = self.eval_expression(&target.index, env)?;
                let value = self.eval_expression(&expr.value, env)?;

                self.assign_index(&collection, &index, value.clone(), target.position)?;

                Ok(value)
            }

            Expression::Property(target) => {
                let object = self.eval_expression(&target.object, env)?;
                let value = self.eval_expression(&expr.value, env)?;

                self.set_property(&object, &target.property, value.clone())?;

                Ok(value)
            }

            other => Err(self.fail("invalid assignment target", other.position())),
        }
    }

    fn assign_index(&self, collection: &Object, index: &Object, value: Object, position: Position) -> Flow<()> {
        match collection {
            Object::Array(items) => {
                let len = items.borrow().len();
                let i = self.array_index(index, len, position)?;
                items.borrow_mut()[i] = value;
                Ok(())
            }

            Object::Hash(hash) => {
                let key = self.hash_key(index, position)?;
                hash.borrow_mut().insert(key, value);
                Ok(())
            }

            other => Err(self.fail(
                format!("index assignment not supported on {}", other.type_tag()),
                position,
            )),
        }
    }

    pub(super) fn eval_index(&mut self, expr: &IndexExpression, env: &Env) -> Flow {
        let collection = self.eval_expression(&expr.left, env)?;
        let index = self.eval_expression(&expr.index, env)?;

        match &collection {
            Object::Array(items) => {
                let items = items.borrow();
                let i = self.array_index(&index, items.len(), expr.position)?;
                Ok(items[i].clone())
            }

            Object::Hash(hash) => {
                let key = self.hash_key(&index, expr.position)?;
                let value = hash.borrow().get(&key).cloned();
                Ok(value.unwrap_or(Object::Null))
            }

            Object::Str(s) => {
                let len = s.chars().count();
                let i = self.array_index(&index, len, expr.position)?;
                Ok(s.chars()
                    .nth(i)
                    .map(|c| Object::string(c.to_string()))
                    .unwrap_or(Object::Null))
            }

            other => Err(self.fail(
                format!("index operator not supported on {}", other.type_tag()),
                expr.position,
            )),
        }
    }

    /// Integer index with `0 <= i < len`.
    fn array_index(&self, index: &Object, len: usize, position: Position) -> Flow<usize> {
        let Object::Integer(n) = index else {
            return Err(self.fail(
                format!("index must be INTEGER, got {}", index.type_tag()),
                position,
            ));
        };

        match usize::try_from(*n) {
            Ok(i) if i < len => Ok(i),
            _ => Err(self.fail(
                format!("index out of bounds: {} (length {})", n, len),
                position,
            )),
        }
    }

    /// Hash keys are strings; integers are converted to their decimal form.
    fn hash_key(&self, key: &Object, position: Position) -> Flow<String> {
        match key {
            Object::Str(s) => Ok(s.to_string()),
            Object::Integer(n) => Ok(n.to_string()),
            other => Err(self.fail(
                format!("unusable as hash key: {}", other.type_tag()),
                position,
            )),
        }
    }
}
