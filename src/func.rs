use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::prelude::*;

/// A user function, method or lambda closed over the environment it was
/// declared in.
#[derive(Clone)]
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Shared<Environment>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Shared<Environment>,
        is_initializer: bool,
    ) -> Self {
        Self { declaration, closure, is_initializer }
    }

    /// A copy of this function whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Object) -> Rc<Function> {
        let env = Environment::new().with_enclosing(self.closure.clone()).as_shared();
        env.borrow_mut().define("this", instance);

        Rc::new(Function::new(self.declaration.clone(), env, self.is_initializer))
    }

    fn bound_this(&self) -> Result<Object, RuntimeError> {
        let this = Token::synthetic("this", self.declaration.name.line);
        self.closure.borrow().get_at(0, &this)
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        let environment = Environment::new().with_enclosing(self.closure.clone()).as_shared();

        {
            let mut env = environment.borrow_mut();
            for (param, arg) in self.declaration.params.iter().zip(arguments) {
                env.define(&param.lexeme, arg);
            }
        }

        let value = match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Normal => Object::Null,
            Flow::Return(value) => value,
            Flow::Break => {
                return Err(RuntimeError::Break { token: self.declaration.name.clone() })
            }
        };

        // Initializers always hand back the instance, whatever they return.
        if self.is_initializer {
            return self.bound_this();
        }

        Ok(value)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// A computed property. Runs with no arguments whenever the property is read
/// through `.`.
#[derive(Clone)]
pub struct Getter {
    declaration: Rc<GetterDecl>,
    closure: Shared<Environment>,
}

impl Getter {
    pub fn new(declaration: Rc<GetterDecl>, closure: Shared<Environment>) -> Self {
        Self { declaration, closure }
    }

    pub fn bind(&self, instance: Object) -> Rc<Getter> {
        let env = Environment::new().with_enclosing(self.closure.clone()).as_shared();
        env.borrow_mut().define("this", instance);

        Rc::new(Getter::new(self.declaration.clone(), env))
    }
}

impl Callable for Getter {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        let environment = Environment::new().with_enclosing(self.closure.clone()).as_shared();

        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Normal => Ok(Object::Null),
            Flow::Return(value) => Ok(value),
            Flow::Break => Err(RuntimeError::Break { token: self.declaration.name.clone() }),
        }
    }

    fn is_getter(&self) -> bool {
        true
    }
}

impl Display for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<getter {}>", self.declaration.name.lexeme)
    }
}

impl Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getter").field("name", &self.declaration.name.lexeme).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(source: &str) -> Rc<FunctionDecl> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        match Parser::new(tokens).parse().unwrap().pop() {
            Some(Stmt::Function(decl)) => decl,
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn bind_leaves_the_original_untouched() {
        let closure = Environment::new().as_shared();
        let declaration = declaration("fun m() { return this }");
        let function = Function::new(declaration, closure.clone(), false);

        let first = function.bind(Object::Number(1.0));
        let second = function.bind(Object::Number(2.0));

        let this = Token::synthetic("this", 1);
        assert!(closure.borrow().get_at(0, &this).is_err());
        assert_eq!(first.closure.borrow().get_at(0, &this).unwrap(), Object::Number(1.0));
        assert_eq!(second.closure.borrow().get_at(0, &this).unwrap(), Object::Number(2.0));
    }

    #[test]
    fn display_names_the_function() {
        let function =
            Function::new(declaration("fun add(a, b) { }"), Environment::new().as_shared(), false);
        assert_eq!(function.to_string(), "<fn add>");
        assert_eq!(function.arity(), 2);
    }
}
