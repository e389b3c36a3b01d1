//! Built‑in globals defined before any user code runs.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::callable::{Arity, NativeFn, NativeFunction};
use crate::class::LoxClass;
use crate::environment::EnvRef;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Name of the class every object literal instantiates.
pub const OBJECT_CLASS: &str = "Object";

/// Populate `globals` and return the `Object` class used for object literals.
pub fn install(globals: &EnvRef) -> Rc<LoxClass> {
    let natives: [(&'static str, Arity, NativeFn); 3] = [
        ("log", Arity::Variadic, log_values),
        ("clock", Arity::Fixed(0), clock),
        ("len", Arity::Fixed(1), len),
    ];

    let mut frame = globals.borrow_mut();

    for (name, arity, func) in natives {
        debug!("Defining native function '{}'", name);
        frame.define(name, Value::Native(Rc::new(NativeFunction::new(name, arity, func))));
    }

    let object_class = Rc::new(LoxClass::new(OBJECT_CLASS, Vec::new(), HashMap::new()));
    frame.define(OBJECT_CLASS, Value::Class(object_class.clone()));

    info!("Installed {} native function(s) and '{}'", natives.len(), OBJECT_CLASS);

    object_class
}

/// `log(a, b, ...)`: canonical strings joined by a space, then a newline.
fn log_values(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    interpreter
        .write_line(&line)
        .map_err(|e| format!("log failed: {}", e))?;

    Ok(Value::Nil)
}

fn clock(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
        .as_secs_f64();

    info!("Native function 'clock' returned: {}", timestamp);

    Ok(Value::Number(timestamp))
}

fn len(_interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
        Some(Value::Array(items)) => Ok(Value::Number(items.borrow().len() as f64)),
        Some(other) => Err(format!("Can't take the length of a {}.", other.type_name())),
        None => Err("Expected 1 arguments but got 0.".to_string()),
    }
}
