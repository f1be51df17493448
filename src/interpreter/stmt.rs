use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use super::Flow;
use crate::prelude::*;

type StmtResult = Result<Flow, RuntimeError>;

impl Interpreter {
    /// Run a program. The first runtime error aborts the remaining
    /// statements.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal | Flow::Return(_) => {}
                // Only reachable when the resolver was skipped.
                Flow::Break => {
                    return Err(RuntimeError::Break { token: Token::synthetic("break", 0) })
                }
            }
        }

        Ok(())
    }

    /// Execute `statements` in `environment`, restoring the current
    /// environment on every exit path.
    pub fn execute_block<I, R>(
        &mut self,
        statements: I,
        environment: Shared<Environment>,
    ) -> StmtResult
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Flow::Normal);
        for stmt in statements {
            result = self.execute(stmt.as_ref());
            if !matches!(result, Ok(Flow::Normal)) {
                break;
            }
        }

        self.environment = previous;
        result
    }

    pub fn execute(&mut self, stmt: &Stmt) -> StmtResult {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate_expr(expr)?;
            }
            Stmt::Print { keyword, expr } => {
                let value = self.evaluate_expr(expr)?;
                writeln!(self.output, "{value}")
                    .map_err(|source| RuntimeError::Output { token: keyword.clone(), source })?;
            }
            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => {
                    let value = self.evaluate_expr(expr)?;
                    self.environment.borrow_mut().define(&name.lexeme, value);
                }
                None => self.environment.borrow_mut().declare(&name.lexeme),
            },
            Stmt::Block { statements } => {
                let env = Environment::new().with_enclosing(self.environment.clone()).as_shared();
                return self.execute_block(statements, env);
            }
            Stmt::Function(declaration) => {
                // The closure is the environment active where the function is
                // declared, not where it will be called.
                let function =
                    Function::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Object::Callable(Rc::new(function)));
            }
            Stmt::Getter(declaration) => {
                let getter = Getter::new(declaration.clone(), self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Object::Callable(Rc::new(getter)));
            }
            Stmt::Class { name, superclass, methods, getters } => {
                self.execute_class(name, superclass.as_ref(), methods, getters)?;
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(stmt) = else_branch {
                    return self.execute(stmt);
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate_expr(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Stmt::Break { .. } => return Ok(Flow::Break),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr)?,
                    None => Object::Null,
                };
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        getters: &[Rc<GetterDecl>],
    ) -> Result<(), RuntimeError> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate_expr(expr)? {
                Object::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expr::Variable { name: super_name, .. } => super_name,
                        _ => name,
                    };
                    return Err(RuntimeError::generic(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // Bound first so methods can refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Object::Null);

        let enclosing = self.environment.clone();
        if let Some(superclass) = &superclass {
            self.environment = Environment::new().with_enclosing(enclosing.clone()).as_shared();
            self.environment.borrow_mut().define("super", Object::Class(superclass.clone()));
        }

        let methods: HashMap<_, _> = methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.lexeme == "init";
                let function =
                    Function::new(method.clone(), self.environment.clone(), is_initializer);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let getters: HashMap<_, _> = getters
            .iter()
            .map(|getter| {
                let closure = Getter::new(getter.clone(), self.environment.clone());
                (getter.name.lexeme.clone(), Rc::new(closure))
            })
            .collect();

        let class = Class::new(&name.lexeme, superclass, methods, getters);

        self.environment = enclosing;
        self.environment.borrow_mut().assign(name, Object::Class(Rc::new(class)))
    }
}
