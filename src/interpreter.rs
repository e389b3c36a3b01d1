//! Tree‑walking evaluator.
//!
//! Statements complete with a [`Flow`]; runtime failures travel separately
//! as `Err(LoxError::Runtime)`, so an early `return` can never be mistaken
//! for an error (or the other way round).

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, LiteralValue, ObjectEntry, Stmt};
use crate::callable::{Arity, LoxFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::compare;
use crate::diagnostics::Diagnostics;
use crate::environment::{self, EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::natives;
use crate::token::{Token, TokenType};
use crate::value::{format_number, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding toward the nearest call boundary.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Hop distances recorded by the resolver; absent ⇒ global.
    ///
    /// Entries of a program or REPL line that created no functions or classes
    /// are dropped once it has run (see [`Interpreter::forget_locals_from`]).
    /// Entries behind function bodies stay for the life of the interpreter,
    /// since a closure may still run them.
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    object_class: Rc<LoxClass>,
}

impl Interpreter {
    /// Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter whose `print` and `log` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();
        let object_class = natives::install(&globals);

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
            object_class,
        }
    }

    /// Called by the resolver for every local reference.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Drop every hop distance recorded for nodes created at or after `from`.
    pub fn forget_locals_from(&mut self, from: ExprId) {
        let before = self.locals.len();
        self.locals.retain(|id, _| *id < from);
        debug!("Forgot {} local(s)", before - self.locals.len());
    }

    /// Number of recorded hop distances.
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Execute a program.  A runtime error abandons only the top‑level
    /// statement it occurred in; it is recorded and execution moves on.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error in top-level statement: {}", e);
                self.environment = self.globals.clone();
                diagnostics.push(e);
            }
        }

        if let Err(e) = self.out.flush() {
            diagnostics.push(e.into());
        }

        info!("Interpretation finished");
    }

    /// Write one line to the output sink (used by `print` and `log`).
    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing value: {}", value);
                self.write_line(&value.to_string())?;
            }

            Stmt::Var(declarators) => {
                for declarator in declarators {
                    let value = match &declarator.initializer {
                        Some(expr) => self.evaluate(expr)?,
                        None => Value::Nil,
                    };
                    debug!("Defining variable '{}' = {}", declarator.name.lexeme, value);
                    self.environment
                        .borrow_mut()
                        .define(&declarator.name.lexeme, value);
                }
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                return self.execute_block(statements, environment.into_ref());
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(declaration.clone(), self.environment.clone(), false);
                debug!("Defining function '{}'", function.name());
                self.environment.borrow_mut().define(
                    declaration.display_name(),
                    Value::Function(Rc::new(function)),
                );
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }

            Stmt::Class(class) => self.execute_class(class)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` inside `environment`, restoring the current frame
    /// afterwards no matter how the block ends.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(&mut self, class: &ClassDecl) -> Result<()> {
        let mut superclasses: Vec<Rc<LoxClass>> = Vec::with_capacity(class.superclasses.len());
        for superclass in &class.superclasses {
            match self.evaluate(superclass)? {
                Value::Class(resolved) => superclasses.push(resolved),
                _ => {
                    let token = match superclass {
                        Expr::Variable { name, .. } => name,
                        _ => &class.name,
                    };
                    return Err(LoxError::runtime(token, "Superclass must be a class."));
                }
            }
        }

        self.environment
            .borrow_mut()
            .define(&class.name.lexeme, Value::Nil);

        // Methods of a subclass close over a frame holding `super`: a class
        // with the same superclass list and no methods of its own.
        let closure: EnvRef = if superclasses.is_empty() {
            self.environment.clone()
        } else {
            let view = LoxClass::new(class.name.lexeme.clone(), superclasses.clone(), HashMap::new());
            let mut frame = Environment::with_enclosing(self.environment.clone());
            frame.define("super", Value::Class(Rc::new(view)));
            frame.into_ref()
        };

        let methods: HashMap<String, Rc<LoxFunction>> = class
            .methods
            .iter()
            .map(|method| {
                let name = method.display_name().to_string();
                let is_initializer = name == "init";
                let function = LoxFunction::new(method.clone(), closure.clone(), is_initializer);
                (name, Rc::new(function))
            })
            .collect();

        debug!(
            "Defining class '{}' with {} superclass(es) and {} method(s)",
            class.name.lexeme,
            superclasses.len(),
            methods.len()
        );

        let klass = LoxClass::new(class.name.lexeme.clone(), superclasses, methods);
        self.environment
            .borrow_mut()
            .assign(&class.name, Value::Class(Rc::new(klass)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let value = match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            },

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Value::Number(-n),
                        _ => return Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Value::Bool(!right.is_truthy()),
                    _ => return Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)?
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuits {
                    left
                } else {
                    self.evaluate(right)?
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name)?,

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call(&callee, values, paren)?
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name)?,
                _ => return Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                value
            }

            Expr::Index {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_get(bracket, &object, &index)?
            }

            Expr::IndexSet {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                index_set(bracket, &object, &index, value.clone())?;
                value
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword)?,

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method)?,

            Expr::Function(declaration) => Value::Function(Rc::new(LoxFunction::new(
                declaration.clone(),
                self.environment.clone(),
                false,
            ))),

            Expr::Array { elements, .. } => {
                let mut items: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Value::Array(Rc::new(RefCell::new(items)))
            }

            Expr::Object { entries, .. } => self.evaluate_object(entries)?,
        };

        debug!("Expression evaluated to: {}", value);
        Ok(value)
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn call(&mut self, callee: &Value, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        let Some(callable) = callee.as_callable() else {
            return Err(LoxError::runtime(paren, "Can only call functions and classes."));
        };

        let arity = callable.arity();
        if !arity.accepts(arguments.len()) {
            let expected = match arity {
                Arity::Fixed(n) => n,
                Arity::Variadic => arguments.len(),
            };
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    expected,
                    arguments.len()
                ),
            ));
        }

        callable.call(self, arguments, paren)
    }

    /// `super.method`: search the superclass list of the enclosing class,
    /// then bind the result to the current `this`.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(LoxError::runtime(keyword, "Can't use 'super' outside of a class."));
        };

        let Value::Class(view) = environment::get_at(&self.environment, distance, keyword)? else {
            return Err(LoxError::runtime(keyword, "Superclass must be a class."));
        };

        // `this` always lives one frame inside the `super` frame.
        let this_token = Token::synthetic("this", keyword.line);
        let this = environment::get_at(&self.environment, distance.saturating_sub(1), &this_token)?;

        match view.find_method_in_superclasses(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(this)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn evaluate_object(&mut self, entries: &[ObjectEntry]) -> Result<Value> {
        let mut instance = LoxInstance::new(self.object_class.clone());

        for entry in entries {
            let value = self.evaluate(&entry.value)?;
            instance.set(&entry.key_name(), value);
        }

        Ok(Value::Instance(Rc::new(RefCell::new(instance))))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let value = match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
                Value::String(format!("{}{}", left, right))
            }
            _ => {
                return Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                ))
            }
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a - b)
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a * b)
        }

        // IEEE‑754: dividing by zero yields ±inf or NaN.
        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a / b)
        }

        TokenType::EQUAL_EQUAL => Value::Bool(left == right),
        TokenType::BANG_EQUAL => Value::Bool(left != right),

        TokenType::LESS => Value::Bool(compare::less(&left, &right)),
        TokenType::LESS_EQUAL => Value::Bool(compare::less_equal(&left, &right)),
        TokenType::GREATER => Value::Bool(compare::greater(&left, &right)),
        TokenType::GREATER_EQUAL => Value::Bool(compare::greater_equal(&left, &right)),

        _ => return Err(LoxError::runtime(operator, "Invalid binary operator.")),
    };

    Ok(value)
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Indexing
// ─────────────────────────────────────────────────────────────────────────────

/// Integral, in‑range position into a sequence of `len` elements.
fn position(bracket: &Token, index: &Value, len: usize) -> Result<usize> {
    let Value::Number(n) = index else {
        return Err(LoxError::runtime(bracket, "Index must be a number."));
    };

    if n.fract() != 0.0 {
        return Err(LoxError::runtime(bracket, "Index must be an integer."));
    }

    if *n < 0.0 || *n >= len as f64 {
        return Err(LoxError::runtime(
            bracket,
            format!("Index {} out of bounds for length {}.", format_number(*n), len),
        ));
    }

    Ok(*n as usize)
}

/// Instance subscripts name a field: strings as‑is, numbers canonically.
fn field_key(bracket: &Token, index: &Value) -> Result<String> {
    match index {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        _ => Err(LoxError::runtime(bracket, "Property key must be a string or number.")),
    }
}

fn index_get(bracket: &Token, object: &Value, index: &Value) -> Result<Value> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let at = position(bracket, index, items.len())?;
            Ok(items[at].clone())
        }

        Value::String(s) => {
            let at = position(bracket, index, s.chars().count())?;
            Ok(s.chars()
                .nth(at)
                .map_or(Value::Nil, |c| Value::String(c.to_string())))
        }

        Value::Instance(instance) => {
            let key = field_key(bracket, index)?;
            instance.borrow().field(&key).ok_or_else(|| {
                LoxError::runtime(bracket, format!("Undefined property '{}'.", key))
            })
        }

        _ => Err(LoxError::runtime(
            bracket,
            "Only arrays, strings and instances can be indexed.",
        )),
    }
}

fn index_set(bracket: &Token, object: &Value, index: &Value, value: Value) -> Result<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let at = position(bracket, index, items.len())?;
            items[at] = value;
            Ok(())
        }

        Value::Instance(instance) => {
            let key = field_key(bracket, index)?;
            instance.borrow_mut().set(&key, value);
            Ok(())
        }

        _ => Err(LoxError::runtime(
            bracket,
            "Only arrays and instances support index assignment.",
        )),
    }
}
