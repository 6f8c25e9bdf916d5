//! Runtime values.
//!
//! Scalars are stored inline; arrays, hashes, closures, classes and
//! instances are shared handles, so copying an `Object` never copies the
//! underlying data and equality on them is identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{BlockStatement, Identifier};
use crate::builtins::BuiltinFn;
use crate::diagnostics::RuntimeError;
use crate::environment::Env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Array,
    Hash,
    Function,
    Builtin,
    Class,
    Instance,
    Error,
}

impl ObjectType {
    pub fn tag(self) -> &'static str {
        match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::Float => "FLOAT",
            ObjectType::String => "STRING",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::Null => "NULL",
            ObjectType::Array => "ARRAY",
            ObjectType::Hash => "HASH",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::Class => "CLASS",
            ObjectType::Instance => "INSTANCE",
            ObjectType::Error => "ERROR",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone)]
pub enum Object {
    Integer(i64),
    Float(f64),
    Str(Rc<str>),
    Boolean(bool),
    Null,
    Array(Rc<RefCell<Vec<Object>>>),
    Hash(Rc<RefCell<HashObject>>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Error(Rc<RuntimeError>),
}

impl Object {
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        Object::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Object>) -> Self {
        Object::Array(Rc::new(RefCell::new(items)))
    }

    pub fn hash(hash: HashObject) -> Self {
        Object::Hash(Rc::new(RefCell::new(hash)))
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::Float(_) => ObjectType::Float,
            Object::Str(_) => ObjectType::String,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Null => ObjectType::Null,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::Class(_) => ObjectType::Class,
            Object::Instance(_) => ObjectType::Instance,
            Object::Error(_) => ObjectType::Error,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.object_type().tag()
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Boolean(b) => *b,
            Object::Null => false,
            Object::Integer(n) => *n != 0,
            Object::Float(n) => *n != 0.0 && !n.is_nan(),
            Object::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// Language-level `==`: scalars by value (integers and floats compare
    /// numerically), everything else by identity.
    pub fn equals(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Float(a), Object::Float(b)) => a == b,
            (Object::Integer(a), Object::Float(b)) | (Object::Float(b), Object::Integer(a)) => {
                (*a as f64) == *b
            }
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
            (Object::Hash(a), Object::Hash(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
            (Object::Class(a), Object::Class(b)) => Rc::ptr_eq(a, b),
            (Object::Instance(a), Object::Instance(b)) => Rc::ptr_eq(a, b),
            (Object::Error(a), Object::Error(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Display form: strings raw, everything else as in [`Object::repr`].
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.write_to(&mut out, false, &mut seen);
        out
    }

    /// Nested form: strings quoted and escaped.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.write_to(&mut out, true, &mut seen);
        out
    }

    /// `seen` holds the containers currently being printed, so a container
    /// that contains itself prints as `[...]` / `{...}`.
    fn write_to(&self, out: &mut String, nested: bool, seen: &mut Vec<*const ()>) {
        match self {
            Object::Integer(n) => out.push_str(itoa::Buffer::new().format(*n)),

            Object::Float(n) => out.push_str(&format_float(*n)),

            Object::Str(s) => {
                if nested {
                    out.push_str(&format!("{:?}", &**s));
                } else {
                    out.push_str(s);
                }
            }

            Object::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),

            Object::Null => out.push_str("null"),

            Object::Array(items) => {
                let id = Rc::as_ptr(items) as *const ();
                if seen.contains(&id) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(id);

                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_to(out, true, seen);
                }
                out.push(']');

                seen.pop();
            }

            Object::Hash(hash) => {
                let id = Rc::as_ptr(hash) as *const ();
                if seen.contains(&id) {
                    out.push_str("{...}");
                    return;
                }
                seen.push(id);

                out.push('{');
                for (i, (key, value)) in hash.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format!("{:?}: ", key));
                    value.write_to(out, true, seen);
                }
                out.push('}');

                seen.pop();
            }

            Object::Function(func) => {
                let params: Vec<&str> = func.parameters.iter().map(|p| p.name.as_str()).collect();
                out.push_str(&format!("fn({}) {{ ... }}", params.join(", ")));
            }

            Object::Builtin(builtin) => out.push_str(&format!("builtin {}", builtin.name)),

            Object::Class(class) => out.push_str(&format!("class {}", class.name)),

            Object::Instance(instance) => {
                let id = Rc::as_ptr(instance) as *const ();
                if seen.contains(&id) {
                    out.push_str(&format!("{} {{...}}", instance.class.name));
                    return;
                }
                seen.push(id);

                let fields = instance.fields.borrow();
                if fields.is_empty() {
                    out.push_str(&format!("{} {{}}", instance.class.name));
                } else {
                    out.push_str(&format!("{} {{ ", instance.class.name));
                    for (i, (key, value)) in fields.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(key);
                        out.push_str(": ");
                        value.write_to(out, true, seen);
                    }
                    out.push_str(" }");
                }

                seen.pop();
            }

            Object::Error(err) => out.push_str(&err.to_string()),
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".into() } else { "-Infinity".into() }
    } else if n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Object::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Object::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Object::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Object::Null => f.write_str("Null"),
            Object::Error(err) => f.debug_tuple("Error").field(&err.message).finish(),
            other => write!(f, "{}({})", other.type_tag(), other.repr()),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

/// Insertion-ordered string-keyed map.
#[derive(Clone, Default)]
pub struct HashObject {
    entries: Vec<(String, Object)>,
    index: HashMap<String, usize>,
}

impl HashObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Overwrites in place (keeping the original position) or appends.
    pub fn insert(&mut self, key: String, value: Object) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl FromIterator<(String, Object)> for HashObject {
    fn from_iter<I: IntoIterator<Item = (String, Object)>>(iter: I) -> Self {
        let mut hash = HashObject::new();
        for (key, value) in iter {
            hash.insert(key, value);
        }
        hash
    }
}

/// A closure: parameters and body plus the environment it was defined in.
pub struct Function {
    /// Binding or method name; `None` for anonymous literals.
    pub name: Option<String>,
    pub parameters: Vec<Identifier>,
    pub body: Rc<BlockStatement>,
    pub env: Env,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Same code, different captured environment.
    pub fn rebind(&self, env: Env) -> Function {
        Function {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            body: Rc::clone(&self.body),
            env,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

pub struct Class {
    pub name: String,
    pub parent: Option<Rc<Class>>,
    pub constructor: Option<Rc<Function>>,
    pub methods: HashMap<String, Rc<Function>>,
    /// Closure base of the constructor and every method.
    pub env: Env,
}

impl Class {
    /// Method lookup along the parent chain; the nearest definition wins.
    /// Returns the defining class with the method.
    pub fn find_method(self: &Rc<Self>, name: &str) -> Option<(Rc<Class>, Rc<Function>)> {
        let mut class = Some(Rc::clone(self));

        while let Some(current) = class {
            if let Some(method) = current.methods.get(name) {
                return Some((Rc::clone(&current), Rc::clone(method)));
            }
            class = current.parent.clone();
        }

        None
    }

    /// Nearest constructor along the parent chain.
    pub fn find_constructor(self: &Rc<Self>) -> Option<(Rc<Class>, Rc<Function>)> {
        let mut class = Some(Rc::clone(self));

        while let Some(current) = class {
            if let Some(ctor) = &current.constructor {
                return Some((Rc::clone(&current), Rc::clone(ctor)));
            }
            class = current.parent.clone();
        }

        None
    }

    /// Every method name reachable from this class, nearest first.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut own: Vec<&String> = self.methods.keys().collect();
        own.sort();
        names.extend(own.into_iter().cloned());

        if let Some(parent) = &self.parent {
            for name in parent.method_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        names
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashObject>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashObject::new()),
        }
    }
}
