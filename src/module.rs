use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::callable::Function;
use crate::error::{Result, WagagoError};
use crate::token::Token;
use crate::value::Value;

/// An inline `import` block: a flat, read‑only namespace of functions.
#[derive(Debug)]
pub struct Module {
    name: String,
    members: HashMap<String, Rc<Function>>,
}

impl Module {
    pub fn new(name: String, members: HashMap<String, Rc<Function>>) -> Module {
        Module { name, members }
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        self.members
            .get(&name.lexeme)
            .map(|member| Value::Function(Rc::clone(member)))
            .ok_or_else(|| {
                WagagoError::runtime(
                    name,
                    format!("Undefined module function '{}'.", name.lexeme),
                )
            })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' module", self.name)
    }
}
