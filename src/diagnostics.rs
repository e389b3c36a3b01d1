//! Per‑run accumulation of errors from every pass.
//!
//! Each stage (scan, parse, resolve, interpret) pushes into the same
//! [`Diagnostics`] value, which the caller inspects afterwards to decide
//! whether to continue and which exit status to report.

use std::io::{self, Write};

use log::debug;

use crate::error::LoxError;

/// Invalid command‑line invocation.
pub const EXIT_USAGE: i32 = 64;

/// Scan, parse or resolve error.
pub const EXIT_DATAERR: i32 = 65;

/// Uncaught runtime error.
pub const EXIT_SOFTWARE: i32 = 70;

#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LoxError) {
        debug!("Diagnostic recorded: {}", error);

        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<LoxError> {
        self.errors
    }

    pub fn had_static_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_static)
    }

    pub fn had_runtime_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_runtime)
    }

    /// Process exit status implied by the recorded errors, static errors first.
    pub fn exit_code(&self) -> Option<i32> {
        if self.had_static_error() {
            Some(EXIT_DATAERR)
        } else if self.had_runtime_error() {
            Some(EXIT_SOFTWARE)
        } else {
            None
        }
    }

    /// Write every error on its own line.
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for error in &self.errors {
            writeln!(out, "{}", error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    #[test]
    fn static_errors_take_precedence_over_runtime() {
        let mut diagnostics = Diagnostics::new();
        let token = Token::synthetic("x", 3);

        diagnostics.push(LoxError::runtime(&token, "boom"));
        assert_eq!(diagnostics.exit_code(), Some(EXIT_SOFTWARE));

        diagnostics.push(LoxError::lex(1, 1, "Unexpected character: $"));
        assert_eq!(diagnostics.exit_code(), Some(EXIT_DATAERR));
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn clean_run_has_no_exit_code() {
        assert_eq!(Diagnostics::new().exit_code(), None);
    }

    #[test]
    fn report_writes_one_line_per_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(LoxError::lex(2, 5, "Unterminated string."));
        diagnostics.push(LoxError::parse(&Token::synthetic("x", 4), "Expect ';'."));

        let mut out: Vec<u8> = Vec::new();
        diagnostics.report(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "[line 2:5] Error: Unterminated string.\n[line 4] Error at 'x': Expect ';'.\n"
        );
    }
}
