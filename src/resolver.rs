use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use log::debug;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Copy)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, PartialEq, Copy)]
enum ClassType {
    None,
    Class,
    SubClass,
}

/// Resolver uses static analysis to bind local variables to the correct
/// environment. Every local reference gets its scope distance recorded in the
/// interpreter; globals are left out and looked up dynamically.
pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    resolved: usize,
    errors: Vec<ResolverError>,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            resolved: 0,
            errors: vec![],
        }
    }

    /// Resolve a whole program, collecting every static error on the way.
    pub fn resolve<I, R>(&mut self, statements: I) -> Result<(), Vec<ResolverError>>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        self.resolve_stmts(statements);
        debug!("resolver: {} local references, {} errors", self.resolved, self.errors.len());

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

impl<'i> Resolver<'i> {
    fn visit_stmt(&mut self, input: &Stmt) {
        match input {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::Var { name, initializer } => {
                // declare -> initialize -> define, so an initializer can't see
                // the variable it initializes.
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::Class { name, superclass, methods, getters } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if let Expr::Variable { name: super_name, .. } = superclass {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }
                    }

                    self.current_class = ClassType::SubClass;
                    self.resolve_expr(superclass);

                    self.begin_scope();
                    self.define_synthetic("super");
                }

                self.begin_scope();
                self.define_synthetic("this");

                for method in methods {
                    let func_type = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(&method.params, &method.body, func_type);
                }

                for getter in getters {
                    self.resolve_function(&[], &getter.body, FunctionType::Method);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
            Stmt::Function(declaration) => {
                // Unlike variables, functions are defined before their body is
                // resolved so they can call themselves.
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(
                    &declaration.params,
                    &declaration.body,
                    FunctionType::Function,
                );
            }
            Stmt::Getter(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(&[], &declaration.body, FunctionType::Function);
            }
            Stmt::Expression { expr } => self.resolve_expr(expr),
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.visit_stmt(then_branch);
                if let Some(stmt) = else_branch {
                    self.visit_stmt(stmt);
                }
            }
            Stmt::Print { expr, .. } => self.resolve_expr(expr),
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                // A value returned from `init` is discarded at runtime.
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
            }
            Stmt::Break { token } => {
                if self.loop_depth == 0 {
                    self.error(token, "Can't break outside of a loop.");
                }
            }
        }
    }

    fn visit_expr(&mut self, input: &Expr) {
        match input {
            Expr::Variable { id, name } => {
                if let Some(false) = self.scopes.last().and_then(|s| s.get(&name.lexeme)) {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }
            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::SubClass => self.resolve_local(*id, keyword),
            },
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Ternary { first, second, third } => {
                self.resolve_expr(first);
                self.resolve_expr(second);
                self.resolve_expr(third);
            }
            Expr::Call { callee, arguments, .. } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } | Expr::NilGet { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            Expr::Grouping { expr } => self.resolve_expr(expr),
            Expr::Literal { .. } => {}
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Lambda { declaration } => {
                self.resolve_function(
                    &declaration.params,
                    &declaration.body,
                    FunctionType::Function,
                );
            }
        }
    }
}

impl<'i> Resolver<'i> {
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn define_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    fn resolve_stmts<I, R>(&mut self, statements: I)
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        for stmt in statements {
            self.visit_stmt(stmt.as_ref());
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        self.visit_expr(expr)
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], func_type: FunctionType) {
        let enclosing_func = std::mem::replace(&mut self.current_function, func_type);
        // A loop around the declaration doesn't make `break` legal inside it.
        let enclosing_loops = std::mem::take(&mut self.loop_depth);

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(body);
        self.end_scope();

        self.loop_depth = enclosing_loops;
        self.current_function = enclosing_func;
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, self.scopes.len() - i - 1);
                self.resolved += 1;
                return;
            }
        }
    }

    fn error(&mut self, token: &Token, msg: &str) {
        self.errors.push(ResolverError { token: Some(token.clone()), msg: msg.to_owned() });
    }
}

#[derive(Debug)]
pub struct ResolverError {
    pub token: Option<Token>,
    pub msg: String,
}

impl Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.token {
            Some(token) if token.token_type == TokenType::EOF => {
                write!(f, "[line {}] Error at end: {}", token.line, self.msg)
            }
            Some(token) => {
                write!(f, "[line {}] Error at '{}': {}", token.line, token.lexeme, self.msg)
            }
            None => write!(f, "{}", self.msg),
        }
    }
}

impl Error for ResolverError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(source: &str) -> Result<(), Vec<String>> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn valid_program_resolves() {
        let source = r#"
            class A { m() { return 1 } }
            class B < A { m() { return super.m() + 1 } get { return this.m() } }
            fun f(x) { while (true) { if (x) break; return x } }
            var g = fun (a) { return a }
        "#;
        assert_eq!(resolve(source), Ok(()));
    }

    #[test]
    fn own_initializer_is_rejected() {
        assert_eq!(
            resolve("{ var a = a; }"),
            Err(vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."
                .to_owned()])
        );
    }

    #[test]
    fn break_needs_an_enclosing_loop() {
        let errors = resolve("break; while (true) { fun f() { break } }").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.ends_with("Can't break outside of a loop.")));
    }

    #[test]
    fn every_error_is_collected() {
        let source = r#"
            return 1
            print this
            class A < A { m() { return super.m() } }
            class C { m() { return super.m() } }
        "#;
        let errors = resolve(source).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "[line 2] Error at 'return': Can't return from top-level code.",
                "[line 3] Error at 'this': Can't use 'this' outside of a class.",
                "[line 4] Error at 'A': A class can't inherit from itself.",
                "[line 5] Error at 'super': Can't use 'super' in a class with no superclass.",
            ]
        );
    }

    #[test]
    fn redeclaring_in_the_same_scope_is_allowed() {
        assert_eq!(resolve("{ var a = 1; var a = 2; }"), Ok(()));
    }
}
