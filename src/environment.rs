use crate::error::{Result, WagagoError};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures, nested blocks and call frames all
/// hold these; a scope lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical scope: a name table plus an optional link outward.  Links
/// only ever point to enclosing scopes, so the chain is acyclic.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a fresh shared handle.
    pub fn shared(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Insert into this scope unconditionally (re‑definition shadows).
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup walking outward; used for globals.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

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

/// The scope exactly `distance` links outward from `env` (0 is `env` itself).
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut current: EnvRef = Rc::clone(env);

    for _ in 0..distance {
        let next: EnvRef = current.borrow().enclosing()?;
        current = next;
    }

    Some(current)
}

/// Read `name` from the scope exactly `distance` links out.  No fallback
/// walk: the resolver promised the binding lives there.
pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
    debug!("get_at '{}' distance {}", name.lexeme, distance);

    let scope: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let value: Option<Value> = scope.borrow().values.get(&name.lexeme).cloned();

    value.ok_or_else(|| undefined(name))
}

/// Like [`get_at`] but keyed by a bare name, for the implicit `this`/`super`.
pub fn get_name_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
    let scope: EnvRef = ancestor(env, distance)?;
    let value: Option<Value> = scope.borrow().values.get(name).cloned();
    value
}

/// Write `name` in the scope exactly `distance` links out.
pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
    debug!("assign_at '{}' distance {}", name.lexeme, distance);

    let scope: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let mut scope = scope.borrow_mut();

    match scope.values.get_mut(&name.lexeme) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(undefined(name)),
    }
}

fn undefined(name: &Token) -> WagagoError {
    WagagoError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    fn chain(depth: usize) -> (EnvRef, Vec<EnvRef>) {
        let root: EnvRef = Environment::new().shared();
        let mut scopes: Vec<EnvRef> = vec![Rc::clone(&root)];

        for _ in 0..depth {
            let parent = Rc::clone(scopes.last().unwrap_or(&root));
            scopes.push(Environment::with_enclosing(parent).shared());
        }

        (root, scopes)
    }

    #[test]
    fn get_walks_out_to_the_global_scope() {
        let (root, scopes) = chain(2);
        root.borrow_mut().define("a", Value::Number(1.0));

        let inner = scopes.last().unwrap();
        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn missing_name_is_a_fault_not_nil() {
        let env = Environment::new();
        let err = env.get(&ident("nope")).unwrap_err();

        assert_eq!(err.to_string(), "Undefined variable 'nope'.\n[line 1]");
    }

    #[test]
    fn get_at_reads_exactly_that_many_links_out() {
        let (_, scopes) = chain(3);
        for (depth, scope) in scopes.iter().enumerate() {
            scope.borrow_mut().define("x", Value::Number(depth as f64));
        }

        let inner = scopes.last().unwrap();
        for distance in 0..=3 {
            let expected = Value::Number((3 - distance) as f64);
            assert_eq!(get_at(inner, distance, &ident("x")).unwrap(), expected);
        }
    }

    #[test]
    fn get_at_does_not_fall_back_to_outer_scopes() {
        let (root, scopes) = chain(1);
        root.borrow_mut().define("only_global", Value::Nil);

        let inner = scopes.last().unwrap();
        assert!(get_at(inner, 0, &ident("only_global")).is_err());
        assert!(get_at(inner, 5, &ident("only_global")).is_err());
    }

    #[test]
    fn assign_at_writes_the_shadowed_binding_only() {
        let (_, scopes) = chain(1);
        let (outer, inner) = (&scopes[0], &scopes[1]);
        outer.borrow_mut().define("a", Value::Number(1.0));
        inner.borrow_mut().define("a", Value::Number(2.0));

        assign_at(inner, 1, &ident("a"), Value::Number(10.0)).unwrap();

        assert_eq!(get_at(inner, 0, &ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(get_at(inner, 1, &ident("a")).unwrap(), Value::Number(10.0));
    }

    #[test]
    fn assign_to_undeclared_global_fails() {
        let mut env = Environment::new();
        assert!(env.assign(&ident("ghost"), Value::Nil).is_err());
    }
}
