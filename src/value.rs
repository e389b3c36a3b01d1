use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};

/// Dynamically‑typed runtime value.
///
/// Heap objects are reference counted; cloning a `Value` never deep‑copies
/// an instance, array or closure.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<LoxFunction>),
    Native(Rc<NativeFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else (including `0` and `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// The call capability, if this value has one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Function(f) => Some(f.as_ref()),
            Value::Native(n) => Some(n.as_ref()),
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
        }
    }
}

/// Strict equality: same type and same value, heap objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Canonical number rendering: integral values drop the trailing `.0`, and
/// magnitudes from `1e21` up switch to exponent form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else if n.is_finite() && n.abs() >= 1e21 {
        format!("{:e}", n)
    } else {
        n.to_string()
    }
}

/// Arrays currently being rendered, by address.
type OpenArrays = Vec<*const RefCell<Vec<Value>>>;

fn render(value: &Value, f: &mut fmt::Formatter<'_>, open: &mut OpenArrays) -> fmt::Result {
    match value {
        Value::Nil => write!(f, "nil"),

        Value::Bool(b) => write!(f, "{}", b),

        Value::Number(n) => write!(f, "{}", format_number(*n)),

        Value::String(s) => write!(f, "{}", s),

        Value::Function(func) => write!(f, "<fn {}>", func.name()),

        Value::Native(native) => write!(f, "<native fn {}>", native.name()),

        Value::Class(class) => write!(f, "{}", class.name),

        Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),

        Value::Array(items) => {
            // An array reachable from itself prints as `[...]` on the way back in.
            let address = Rc::as_ptr(items);
            if open.contains(&address) {
                return write!(f, "[...]");
            }

            open.push(address);
            write!(f, "[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match item {
                    Value::String(s) => write!(f, "\"{}\"", s)?,
                    other => render(other, f, open)?,
                }
            }
            open.pop();
            write!(f, "]")
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, &mut OpenArrays::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-12.0).to_string(), "-12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn huge_numbers_use_exponent_form() {
        assert_eq!(format_number(1e21), "1e21");
        assert_eq!(format_number(1e300), "1e300");
        assert_eq!(format_number(-1.5e22), "-1.5e22");
        assert_eq!(format_number(123456789012345.0), "123456789012345");
        assert_eq!(format_number(2e15), "2000000000000000");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn self_containing_array_renders_placeholder() {
        let array = Rc::new(RefCell::new(vec![Value::Number(1.0)]));
        array.borrow_mut().push(Value::Array(array.clone()));

        assert_eq!(Value::Array(array.clone()).to_string(), "[1, [...]]");

        // Break the cycle so the test does not leak.
        array.borrow_mut().clear();
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
    }

    #[test]
    fn arrays_quote_their_strings() {
        let array = Value::Array(Rc::new(RefCell::new(vec![
            Value::Number(1.0),
            Value::String("a".into()),
            Value::Nil,
        ])));
        assert_eq!(array.to_string(), "[1, \"a\", nil]");
    }
}
