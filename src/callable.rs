//! The call capability shared by user functions, natives and classes.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{self, EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Number of arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => n == count,
            Arity::Variadic => true,
        }
    }
}

/// Anything that can appear in callee position.
///
/// Arity is checked by the interpreter before `call` runs.
pub trait Callable {
    fn arity(&self) -> Arity;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, paren: &Token)
        -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// User functions and lambdas
// ─────────────────────────────────────────────────────────────────────────────

/// A declaration bundled with the frame active where it was defined.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.display_name()
    }

    /// Method binding: a copy whose closure additionally defines `this`.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", instance);

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: environment.into_ref(),
            is_initializer: self.is_initializer,
        }
    }

    /// `this` as seen by an initializer body.
    fn bound_this(&self) -> Result<Value> {
        let this = Token::synthetic("this", self.declaration.keyword.line);
        environment::get_at(&self.closure, 0, &this)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> Arity {
        Arity::Fixed(self.declaration.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _paren: &Token,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let mut environment = Environment::with_enclosing(self.closure.clone());
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let flow = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        if self.is_initializer {
            return self.bound_this();
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Natives
// ─────────────────────────────────────────────────────────────────────────────

/// Host function signature.  Errors are plain messages; the interpreter
/// attaches the call site.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, String>;

pub struct NativeFunction {
    name: &'static str,
    arity: Arity,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: Arity, func: NativeFn) -> Self {
        Self { name, arity, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> Arity {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(interpreter, &arguments).map_err(|message| LoxError::runtime(paren, message))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
