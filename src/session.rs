//! Drives one source buffer (or REPL line) through every pass.
//!
//! A [`Session`] owns a single interpreter, so globals, functions and
//! classes defined by one `run` stay visible to the next.

use std::io::Write;

use log::{debug, info};

use crate::ast::{ExprId, Stmt};
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner;
use crate::value::Value;

/// Result of feeding one REPL line.
#[derive(Debug)]
pub struct LineOutcome {
    /// The value of a bare expression line, if the line was one and it
    /// evaluated without error.
    pub value: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Session whose program output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Scan, parse, resolve and interpret `source`.
    ///
    /// Static errors stop the pipeline before anything executes; runtime
    /// errors are collected per top‑level statement.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        info!("Running {} byte(s) of source", source.len());

        let mut diagnostics = Diagnostics::new();
        let watermark = ExprId::watermark();

        let tokens = scanner::tokenize(source, &mut diagnostics);
        let statements = Parser::new(tokens).parse(&mut diagnostics);
        if diagnostics.had_static_error() {
            info!("Skipping execution: {} syntax error(s)", diagnostics.len());
            return diagnostics;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut diagnostics);
        if diagnostics.had_static_error() {
            info!("Skipping execution: {} resolution error(s)", diagnostics.len());
            self.interpreter.forget_locals_from(watermark);
            return diagnostics;
        }

        self.interpreter.interpret(&statements, &mut diagnostics);

        if !statements.iter().any(Stmt::creates_closure) {
            self.interpreter.forget_locals_from(watermark);
        }

        diagnostics
    }

    /// Feed one REPL line.
    ///
    /// A line without a trailing `;` is first tried as a bare expression
    /// whose value is returned for printing.  If that attempt fails to scan
    /// or parse, its diagnostics are thrown away and the line is run as an
    /// ordinary program.
    pub fn run_repl_line(&mut self, line: &str) -> LineOutcome {
        let trimmed = line.trim_end();

        if !trimmed.is_empty() && !trimmed.ends_with(';') {
            let watermark = ExprId::watermark();
            let mut scratch = Diagnostics::new();
            let tokens = scanner::tokenize(trimmed, &mut scratch);

            if scratch.is_empty() {
                if let Some(expr) = Parser::new(tokens).parse_expression() {
                    debug!("REPL line parsed as a bare expression");

                    let mut diagnostics = Diagnostics::new();
                    Resolver::new(&mut self.interpreter).resolve_expression(&expr, &mut diagnostics);
                    if diagnostics.had_static_error() {
                        self.interpreter.forget_locals_from(watermark);
                        return LineOutcome {
                            value: None,
                            diagnostics,
                        };
                    }

                    let value = match self.interpreter.evaluate(&expr) {
                        Ok(value) => Some(value),
                        Err(e) => {
                            diagnostics.push(e);
                            None
                        }
                    };

                    if !expr.creates_closure() {
                        self.interpreter.forget_locals_from(watermark);
                    }

                    return LineOutcome { value, diagnostics };
                }
            }
        }

        LineOutcome {
            value: None,
            diagnostics: self.run(line),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
