#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::diagnostics::Diagnostics;
use rox::session::Session;

/// `Write` sink whose contents stay readable after the interpreter owns a clone.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `source` in a fresh session; returns program output and diagnostics.
pub fn run(source: &str) -> (String, Diagnostics) {
    let buffer = SharedBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone()));
    let diagnostics = session.run(source);
    (buffer.contents(), diagnostics)
}

/// Run `source`, asserting that no diagnostics were produced.
pub fn run_ok(source: &str) -> String {
    let (output, diagnostics) = run(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        messages(&diagnostics)
    );
    output
}

pub fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.iter().map(|e| e.to_string()).collect()
}
