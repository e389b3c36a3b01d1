use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame.  Closures and child frames hold these,
/// so a frame lives as long as its longest‑lived referrer.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope frame.  `enclosing` is fixed at construction and only
/// ever points at a strict ancestor.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Bind `name` in this frame, shadowing or overwriting any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up along the whole chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite an existing binding along the chain; never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }
}

/// The frame exactly `distance` links up from `env`.
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut frame: EnvRef = env.clone();

    for _ in 0..distance {
        let next = frame.borrow().enclosing.clone()?;
        frame = next;
    }

    Some(frame)
}

/// Read `name` from the frame `distance` links up, without searching further.
pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
    ancestor(env, distance)
        .and_then(|frame| {
            let value = frame.borrow().values.get(&name.lexeme).cloned();
            value
        })
        .ok_or_else(|| undefined(name))
}

/// Write `name` in the frame `distance` links up.
pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
    let frame: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let mut frame = frame.borrow_mut();

    match frame.values.get_mut(&name.lexeme) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(undefined(name)),
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_at_reads_only_the_target_frame() {
        let global = Environment::new().into_ref();
        global.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(global.clone()).into_ref();
        inner.borrow_mut().define("a", Value::Number(2.0));

        let name = Token::synthetic("a", 1);
        assert_eq!(get_at(&inner, 0, &name).unwrap(), Value::Number(2.0));
        assert_eq!(get_at(&inner, 1, &name).unwrap(), Value::Number(1.0));
        assert!(get_at(&inner, 2, &name).is_err());
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let global = Environment::new().into_ref();
        let name = Token::synthetic("missing", 7);

        let err = global
            .borrow_mut()
            .assign(&name, Value::Nil)
            .unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 7]");
        assert!(global.borrow().get(&name).is_err());
    }
}
