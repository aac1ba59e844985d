#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use wagago::session::{RunOutcome, Session};

/// In‑memory sink shared between a session and the test that inspects it.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session writing into a fresh buffer.
pub fn session() -> (Session, SharedOutput) {
    let output = SharedOutput::default();
    (Session::with_output(Box::new(output.clone())), output)
}

/// Run `source` in a fresh session, returning what it printed and how it
/// ended.
pub fn run(source: &str) -> (String, RunOutcome) {
    let (mut session, output) = session();
    let outcome = session.run(source);
    (output.contents(), outcome)
}

/// Diagnostics rendered the way the driver prints them.
pub fn messages(outcome: &RunOutcome) -> Vec<String> {
    outcome.diagnostics().iter().map(|e| e.to_string()).collect()
}
