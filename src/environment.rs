use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::object::Object;

/// Shared handle to one scope frame.  Closures, call frames and nested
/// blocks all hold their parent through this.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `{ ... }`, loop bodies, `if` branches.
    Block,
    /// Function bodies, class bodies and the global scope.
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("'{0}' is already declared in this scope")]
    AlreadyDeclared(String),

    #[error("cannot assign to constant '{0}'")]
    Constant(String),

    #[error("'{0}' is not declared")]
    Undeclared(String),
}

#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Object>,
    constants: HashSet<String>,
    scope: ScopeKind,
    outer: Option<Env>,
}

impl Environment {
    /// A fresh global scope.
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            constants: HashSet::new(),
            scope: ScopeKind::Function,
            outer: None,
        }))
    }

    /// A child scope of `outer`.
    pub fn enclosed(outer: &Env, scope: ScopeKind) -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            constants: HashSet::new(),
            scope,
            outer: Some(Rc::clone(outer)),
        }))
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    pub fn outer(&self) -> Option<Env> {
        self.outer.clone()
    }

    /// Bind `name` in this frame; redeclaring within the same frame fails.
    pub fn declare(&mut self, name: &str, value: Object, constant: bool) -> Result<(), BindingError> {
        if self.store.contains_key(name) {
            debug!("Error: redeclaration of '{}'", name);
            return Err(BindingError::AlreadyDeclared(name.to_string()));
        }

        debug!("Declaring '{}' (constant: {})", name, constant);

        self.store.insert(name.to_string(), value);

        if constant {
            self.constants.insert(name.to_string());
        }

        Ok(())
    }

    /// Rebind an existing name in the frame that declared it.
    pub fn assign(&mut self, name: &str, value: Object) -> Result<(), BindingError> {
        if self.store.contains_key(name) {
            if self.constants.contains(name) {
                debug!("Error: assignment to constant '{}'", name);
                return Err(BindingError::Constant(name.to_string()));
            }

            self.store.insert(name.to_string(), value);
            return Ok(());
        }

        match &self.outer {
            Some(outer) => outer.borrow_mut().assign(name, value),
            None => Err(BindingError::Undeclared(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Whether `name` is bound in this frame (ignoring outer scopes).
    pub fn has_own(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn is_constant(&self, name: &str) -> bool {
        if self.store.contains_key(name) {
            return self.constants.contains(name);
        }

        self.outer
            .as_ref()
            .is_some_and(|outer| outer.borrow().is_constant(name))
    }

    /// Every name visible from this frame, innermost first, without
    /// duplicates.  Used for "did you mean" suggestions.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        let mut own: Vec<&String> = self.store.keys().collect();
        own.sort();

        for name in own {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        if let Some(outer) = &self.outer {
            outer.borrow().collect_names(names);
        }
    }
}
