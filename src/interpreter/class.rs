use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use super::{Flow, Interpreter, CLASS_BINDING, THIS_BINDING};
use crate::ast::{
    ClassStatement, FunctionLiteral, Identifier, NewExpression, PropertyExpression, SuperExpression,
};
use crate::diagnostics::{did_you_mean, RuntimeError};
use crate::environment::{Env, Environment, ScopeKind};
use crate::object::{Class, Function, Instance, Object};
use crate::token::Position;

impl Interpreter {
    /// Declares the class in `env`.  Constructor and methods all close over
    /// one class environment, which also records the class itself so that
    /// `super` resolves relative to the class a method was defined in.
    pub(super) fn eval_class(&mut self, stmt: &ClassStatement, env: &Env) -> Flow {
        let name = &stmt.name.name;

        if env.borrow().has_own(name) {
            return Err(self.fail(
                format!("class '{}' is already declared in this scope", name),
                stmt.name.position,
            ));
        }

        let parent = match &stmt.parent {
            Some(parent) => Some(self.resolve_parent(name, parent, env)?),
            None => None,
        };

        let class_env = Environment::enclosed(env, ScopeKind::Function);

        let make = |lit: &FunctionLiteral, member: &str| {
            Rc::new(Function {
                name: Some(format!("{}.{}", name, member)),
                parameters: lit.parameters.clone(),
                body: Rc::clone(&lit.body),
                env: Rc::clone(&class_env),
            })
        };

        let constructor = stmt.constructor.as_ref().map(|ctor| make(ctor, "constructor"));

        let methods: HashMap<String, Rc<Function>> = stmt
            .methods
            .iter()
            .map(|m| (m.name.name.clone(), make(&m.function, &m.name.name)))
            .collect();

        let class = Rc::new(Class {
            name: name.clone(),
            parent,
            constructor,
            methods,
            env: Rc::clone(&class_env),
        });

        let recorded = class_env
            .borrow_mut()
            .declare(CLASS_BINDING, Object::Class(Rc::clone(&class)), true);
        if let Err(err) = recorded {
            return Err(self.binding_error(err, stmt.position));
        }

        let declared = env
            .borrow_mut()
            .declare(name, Object::Class(Rc::clone(&class)), false);
        if let Err(err) = declared {
            return Err(self.binding_error(err, stmt.name.position));
        }

        info!(
            "Class '{}' declared with {} methods",
            name,
            class.methods.len()
        );

        Ok(Object::Null)
    }

    fn resolve_parent(&mut self, name: &str, parent: &Identifier, env: &Env) -> Flow<Rc<Class>> {
        if parent.name == name {
            return Err(self.fail(
                format!("class '{}' cannot inherit from itself", name),
                parent.position,
            ));
        }

        let value = env.borrow().get(&parent.name);

        let class = match value {
            Some(Object::Class(class)) => class,
            Some(other) => {
                return Err(self.fail(
                    format!(
                        "parent of class '{}' must be a class, got {}",
                        name,
                        other.type_tag()
                    ),
                    parent.position,
                ))
            }
            None => {
                return Err(self.fail(
                    format!("parent class '{}' is not defined", parent.name),
                    parent.position,
                ))
            }
        };

        // A class already named like the new one somewhere up the chain
        // would make the hierarchy cyclic once the name is rebound.
        let mut ancestor = Some(Rc::clone(&class));
        while let Some(current) = ancestor {
            if current.name == name {
                return Err(self.fail(
                    format!(
                        "circular inheritance: '{}' is already an ancestor of '{}'",
                        name, parent.name
                    ),
                    parent.position,
                ));
            }
            ancestor = current.parent.clone();
        }

        Ok(class)
    }

    pub(super) fn eval_new(&mut self, expr: &NewExpression, env: &Env) -> Flow {
        let target = self.eval_expression(&expr.class, env)?;

        let Object::Class(class) = target else {
            return Err(self.fail(
                format!("'new' requires a class, got {}", target.type_tag()),
                expr.position,
            ));
        };

        let arguments = self.eval_expressions(&expr.arguments, env)?;
        let instance = Rc::new(Instance::new(Rc::clone(&class)));

        debug!("Instantiating {} with {} arguments", class.name, arguments.len());

        self.construct(&class, &instance, arguments, expr.position)?;

        Ok(Object::Instance(instance))
    }

    /// Run the nearest constructor of `class` for `instance`.
    fn construct(
        &mut self,
        class: &Rc<Class>,
        instance: &Rc<Instance>,
        arguments: Vec<Object>,
        position: Position,
    ) -> Flow<()> {
        match class.find_constructor() {
            Some((_, ctor)) => {
                if ctor.arity() != arguments.len() {
                    return Err(self.fail(
                        format!(
                            "constructor of {} expects {} arguments, got {}",
                            class.name,
                            ctor.arity(),
                            arguments.len()
                        ),
                        position,
                    ));
                }

                let bound = self.bind_method(instance, &ctor, position)?;
                self.call_function(&bound, arguments, position)?;

                Ok(())
            }

            None if arguments.is_empty() => Ok(()),

            None => Err(self.fail(
                format!(
                    "class {} has no constructor but was given {} arguments",
                    class.name,
                    arguments.len()
                ),
                position,
            )),
        }
    }

    /// A copy of `method` whose scope has `this` bound to `instance`.
    fn bind_method(&mut self, instance: &Rc<Instance>, method: &Function, position: Position) -> Flow<Rc<Function>> {
        let scope = Environment::enclosed(&method.env, ScopeKind::Function);

        let declared = scope
            .borrow_mut()
            .declare(THIS_BINDING, Object::Instance(Rc::clone(instance)), true);
        if let Err(err) = declared {
            return Err(self.binding_error(err, position));
        }

        Ok(Rc::new(method.rebind(scope)))
    }

    /// Fields first, then methods along the parent chain.
    pub(super) fn eval_property(&mut self, expr: &PropertyExpression, env: &Env) -> Flow {
        let object = self.eval_expression(&expr.object, env)?;
        let name = &expr.property.name;

        let Object::Instance(instance) = &object else {
            return Err(self.fail(
                format!("cannot read property '{}' of {}", name, object.type_tag()),
                expr.property.position,
            ));
        };

        let field = instance.fields.borrow().get(name).cloned();
        if let Some(value) = field {
            return Ok(value);
        }

        if let Some((_, method)) = instance.class.find_method(name) {
            let bound = self.bind_method(instance, &method, expr.property.position)?;
            return Ok(Object::Function(bound));
        }

        let fields: Vec<String> = instance.fields.borrow().keys().map(str::to_string).collect();
        let methods = instance.class.method_names();
        let candidates = fields.iter().chain(methods.iter()).map(String::as_str);

        let mut err = RuntimeError::new(
            format!(
                "undefined property '{}' on instance of {}",
                name, instance.class.name
            ),
            expr.property.position,
        );
        if let Some(hint) = did_you_mean(name, candidates) {
            err = err.with_hint(hint);
        }

        Err(self.raise(err))
    }

    pub(super) fn set_property(&mut self, object: &Object, property: &Identifier, value: Object) -> Flow<()> {
        match object {
            Object::Instance(instance) => {
                debug!("Setting {}.{}", instance.class.name, property.name);
                instance
                    .fields
                    .borrow_mut()
                    .insert(property.name.clone(), value);
                Ok(())
            }
            other => Err(self.fail(
                format!(
                    "cannot set property '{}' on {}",
                    property.name,
                    other.type_tag()
                ),
                property.position,
            )),
        }
    }

    pub(super) fn eval_this(&mut self, position: Position, env: &Env) -> Flow {
        let value = env.borrow().get(THIS_BINDING);

        value.ok_or_else(|| self.fail("'this' used outside of a method", position))
    }

    /// `super(...)` runs the parent constructor, `super.m(...)` the parent's
    /// `m`; "parent" is relative to the class whose body encloses the call.
    pub(super) fn eval_super(&mut self, expr: &SuperExpression, env: &Env) -> Flow {
        let (current, instance) = {
            let scope = env.borrow();
            (scope.get(CLASS_BINDING), scope.get(THIS_BINDING))
        };

        let (Some(Object::Class(current)), Some(Object::Instance(instance))) = (current, instance) else {
            return Err(self.fail("'super' used outside of a method", expr.position));
        };

        let Some(parent) = current.parent.clone() else {
            return Err(self.fail(
                format!("class '{}' has no parent class", current.name),
                expr.position,
            ));
        };

        let arguments = self.eval_expressions(&expr.arguments, env)?;

        match &expr.method {
            None => {
                self.construct(&parent, &instance, arguments, expr.position)?;
                Ok(Object::Null)
            }

            Some(method) => match parent.find_method(&method.name) {
                Some((_, found)) => {
                    let bound = self.bind_method(&instance, &found, method.position)?;
                    self.call_function(&bound, arguments, expr.position)
                }
                None => {
                    let names = parent.method_names();
                    let mut err = RuntimeError::new(
                        format!(
                            "undefined method '{}' in parent class {}",
                            method.name, parent.name
                        ),
                        method.position,
                    );
                    if let Some(hint) = did_you_mean(&method.name, names.iter().map(String::as_str)) {
                        err = err.with_hint(hint);
                    }
                    Err(self.raise(err))
                }
            },
        }
    }
}
