use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::prelude::*;

/// One lexical scope. A binding holding `None` was declared without an
/// initializer and hasn't been assigned yet; reading it is an error.
#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<Shared<Environment>>,
    values: HashMap<String, Option<Object>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Shared<Environment>) -> Self {
        Self { enclosing: Some(enclosing), ..self }
    }

    pub fn as_shared(self) -> Shared<Self> {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<Shared<Environment>> {
        self.enclosing.clone()
    }

    pub fn define(&mut self, name: &str, value: Object) {
        self.values.insert(name.to_owned(), Some(value));
    }

    /// Introduce `name` in this scope without giving it a value.
    pub fn declare(&mut self, name: &str) {
        self.values.insert(name.to_owned(), None);
    }

    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        match self.values.get(&name.lexeme) {
            Some(value) => Self::initialized(name, value),
            // Ask one level above if possible
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined_variable(name)),
            },
        }
    }

    pub fn assign(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = Some(value);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined_variable(name)),
        }
    }

    /// Read `name` from the scope exactly `distance` hops up. No name search
    /// happens beyond that scope.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        if distance == 0 {
            return match self.values.get(&name.lexeme) {
                Some(value) => Self::initialized(name, value),
                None => Err(unresolved(name, distance)),
            };
        }

        self.ancestor(distance, name)?.borrow().get_at(0, name)
    }

    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &Token,
        value: Object,
    ) -> Result<(), RuntimeError> {
        if distance == 0 {
            return match self.values.get_mut(&name.lexeme) {
                Some(slot) => {
                    *slot = Some(value);
                    Ok(())
                }
                None => Err(unresolved(name, distance)),
            };
        }

        self.ancestor(distance, name)?.borrow_mut().assign_at(0, name, value)
    }

    fn ancestor(&self, distance: usize, name: &Token) -> Result<Shared<Environment>, RuntimeError> {
        let mut env = self.enclosing.clone().ok_or_else(|| unresolved(name, distance))?;

        for _ in 1..distance {
            let parent = env.borrow().enclosing.clone().ok_or_else(|| unresolved(name, distance))?;
            env = parent;
        }

        Ok(env)
    }

    fn initialized(name: &Token, value: &Option<Object>) -> Result<Object, RuntimeError> {
        value.clone().ok_or_else(|| RuntimeError::Uninitialized { name: name.clone() })
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.clone(),
        msg: format!("Undefined variable '{}'.", name.lexeme),
    }
}

fn unresolved(name: &Token, distance: usize) -> RuntimeError {
    RuntimeError::Internal {
        name: name.clone(),
        msg: format!("No binding for '{}' at distance {distance}", name.lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(lexeme: &str) -> Token {
        Token::synthetic(lexeme, 1)
    }

    #[test]
    fn get_searches_enclosing_scopes() {
        let globals = Environment::new().as_shared();
        globals.borrow_mut().define("a", Object::Number(1.0));
        let local = Environment::new().with_enclosing(globals).as_shared();

        assert_eq!(local.borrow().get(&name("a")).unwrap(), Object::Number(1.0));
        assert!(matches!(
            local.borrow().get(&name("b")),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn redefinition_overwrites() {
        let mut env = Environment::new();
        env.define("a", Object::Number(1.0));
        env.define("a", Object::Boolean(true));
        assert_eq!(env.get(&name("a")).unwrap(), Object::Boolean(true));
    }

    #[test]
    fn declared_binding_is_uninitialized_until_assigned() {
        let mut env = Environment::new();
        env.declare("a");
        assert!(matches!(env.get(&name("a")), Err(RuntimeError::Uninitialized { .. })));

        env.assign(&name("a"), Object::Null).unwrap();
        assert_eq!(env.get(&name("a")).unwrap(), Object::Null);
    }

    #[test]
    fn get_at_reads_exactly_one_scope() {
        let outer = Environment::new().as_shared();
        outer.borrow_mut().define("a", Object::Number(1.0));
        let middle = Environment::new().with_enclosing(outer).as_shared();
        let inner = Environment::new().with_enclosing(middle).as_shared();

        assert_eq!(inner.borrow().get_at(2, &name("a")).unwrap(), Object::Number(1.0));
        // The name lives further up, but distance 1 must not search for it.
        assert!(matches!(inner.borrow().get_at(1, &name("a")), Err(RuntimeError::Internal { .. })));
        assert!(matches!(inner.borrow().get_at(3, &name("a")), Err(RuntimeError::Internal { .. })));
    }

    #[test]
    fn assign_at_targets_the_ancestor() {
        let outer = Environment::new().as_shared();
        outer.borrow_mut().define("a", Object::Number(1.0));
        let inner = Environment::new().with_enclosing(outer.clone()).as_shared();
        inner.borrow_mut().define("a", Object::Number(2.0));

        inner.borrow_mut().assign_at(1, &name("a"), Object::Number(3.0)).unwrap();
        assert_eq!(outer.borrow().get(&name("a")).unwrap(), Object::Number(3.0));
        assert_eq!(inner.borrow().get_at(0, &name("a")).unwrap(), Object::Number(2.0));
    }
}
