use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prelude::*;

/// Identity of a resolvable expression node. Distances computed by the
/// resolver are keyed by this id, never by variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub enum Expr {
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    NilGet {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This {
        id: ExprId,
        keyword: Token,
    },
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
    Ternary {
        first: Box<Expr>,
        second: Box<Expr>,
        third: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Grouping {
        expr: Box<Expr>,
    },
    Literal {
        value: Object,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
    Lambda {
        declaration: Rc<FunctionDecl>,
    },
}

impl Expr {
    pub fn number_literal(v: f64) -> Expr {
        Expr::Literal { value: Object::Number(v) }
    }

    pub fn str_literal(s: &str) -> Expr {
        Expr::Literal { value: Object::String(s.to_owned()) }
    }

    pub fn variable(name: Token) -> Expr {
        Expr::Variable { id: ExprId::fresh(), name }
    }
}

/// A named function, a method or a lambda. Shared between the AST and every
/// closure created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// A parameterless computed property, invoked on plain property access.
#[derive(Debug)]
pub struct GetterDecl {
    pub name: Token,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Block {
        statements: Vec<Stmt>,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Function(Rc<FunctionDecl>),
    Getter(Rc<GetterDecl>),
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
        getters: Vec<Rc<GetterDecl>>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Break {
        token: Token,
    },
    Print {
        keyword: Token,
        expr: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Expression {
        expr: Expr,
    },
}

impl AsRef<Stmt> for Stmt {
    fn as_ref(&self) -> &Stmt {
        self
    }
}
