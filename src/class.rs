//! Classes with an ordered superclass list, and their instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Arity, Callable, LoxFunction};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

pub struct LoxClass {
    pub name: String,
    /// Declaration order is lookup order.
    superclasses: Vec<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclasses: Vec<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclasses,
            methods,
        }
    }

    pub fn superclasses(&self) -> &[Rc<LoxClass>] {
        &self.superclasses
    }

    /// Own table first, then each superclass depth‑first in declared order.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.find_method_in_superclasses(name)
    }

    /// Lookup that skips this class's own table (`super.name`).
    pub fn find_method_in_superclasses(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.superclasses
            .iter()
            .find_map(|superclass| superclass.find_method(name))
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> Arity {
        self.find_method("init")
            .map_or(Arity::Fixed(0), |init| init.arity())
    }

    /// Construct an instance and run `init` on it; the instance is the result.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", self.name);

        let instance = Value::Instance(Rc::new(RefCell::new(LoxInstance::new(self.clone()))));

        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments, paren)?;
        }

        Ok(instance)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field(
                "superclasses",
                &self
                    .superclasses
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Fields always live on the instance, never on the class.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Property read: own fields first, then a freshly bound method.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        let (field, class) = {
            let borrowed = instance.borrow();
            (borrowed.field(&name.lexeme), borrowed.class.clone())
        };

        if let Some(value) = field {
            return Ok(value);
        }

        if let Some(method) = class.find_method(&name.lexeme) {
            let bound = method.bind(Value::Instance(instance.clone()));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
