use crate::prelude::*;

/// Renders the AST as parenthesised prefix text, one line per top-level
/// statement. Used by `--dump-ast`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn to_string(expr: &Expr) -> String {
        match expr {
            Expr::Binary { left, operator, right } | Expr::Logical { left, operator, right } => {
                Self::parenthesize(&operator.lexeme, [left.as_ref(), right.as_ref()])
            }
            Expr::Grouping { expr } => Self::parenthesize("group", [expr.as_ref()]),
            Expr::Literal { value: Object::String(s) } => format!("{s:?}"),
            Expr::Literal { value } => format!("{value}"),
            Expr::Unary { operator, right } => {
                Self::parenthesize(&operator.lexeme, [right.as_ref()])
            }
            Expr::Variable { name, .. } => name.lexeme.clone(),
            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::to_string(value))
            }
            Expr::Ternary { first, second, third } => {
                Self::parenthesize("?", [first.as_ref(), second.as_ref(), third.as_ref()])
            }
            Expr::Call { callee, arguments, .. } => {
                let mut parts = vec![Self::to_string(callee)];
                parts.extend(arguments.iter().map(Self::to_string));
                format!("(call {})", parts.join(" "))
            }
            Expr::This { .. } => "this".to_owned(),
            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
            Expr::Get { object, name } => {
                format!("(. {} {})", Self::to_string(object), name.lexeme)
            }
            Expr::NilGet { object, name } => {
                format!("(?. {} {})", Self::to_string(object), name.lexeme)
            }
            Expr::Set { object, name, value } => {
                let (object, value) = (Self::to_string(object), Self::to_string(value));
                format!("(.= {object} {} {value})", name.lexeme)
            }
            Expr::Lambda { declaration } => {
                format!("(lambda {})", Self::function_tail(&declaration.params, &declaration.body))
            }
        }
    }

    pub fn stmt_to_string(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression { expr } => format!("(; {})", Self::to_string(expr)),
            Stmt::Print { expr, .. } => format!("(print {})", Self::to_string(expr)),
            Stmt::Var { name, initializer: Some(expr) } => {
                format!("(var {} {})", name.lexeme, Self::to_string(expr))
            }
            Stmt::Var { name, initializer: None } => format!("(var {})", name.lexeme),
            Stmt::Block { statements } => Self::block(statements),
            Stmt::Function(declaration) => Self::function(declaration),
            Stmt::Getter(declaration) => Self::getter(declaration),
            Stmt::Class { name, superclass, methods, getters } => {
                let mut out = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", Self::to_string(superclass)));
                }
                for method in methods {
                    out.push(' ');
                    out.push_str(&Self::function(method));
                }
                for getter in getters {
                    out.push(' ');
                    out.push_str(&Self::getter(getter));
                }
                out.push(')');
                out
            }
            Stmt::If { condition, then_branch, else_branch } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::to_string(condition),
                    Self::stmt_to_string(then_branch),
                    Self::stmt_to_string(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::to_string(condition),
                    Self::stmt_to_string(then_branch)
                ),
            },
            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::to_string(condition), Self::stmt_to_string(body))
            }
            Stmt::Break { .. } => "(break)".to_owned(),
            Stmt::Return { value: Some(value), .. } => {
                format!("(return {})", Self::to_string(value))
            }
            Stmt::Return { value: None, .. } => "(return)".to_owned(),
        }
    }

    fn parenthesize<'a>(name: &str, exprs: impl IntoIterator<Item = &'a Expr>) -> String {
        let mut out = format!("({name}");
        for expr in exprs {
            out.push(' ');
            out.push_str(&Self::to_string(expr));
        }
        out.push(')');
        out
    }

    fn block(statements: &[Stmt]) -> String {
        let inner: Vec<_> = statements.iter().map(Self::stmt_to_string).collect();
        format!("{{{}}}", inner.join(" "))
    }

    fn function(declaration: &FunctionDecl) -> String {
        format!(
            "(fun {} {})",
            declaration.name.lexeme,
            Self::function_tail(&declaration.params, &declaration.body)
        )
    }

    fn getter(declaration: &GetterDecl) -> String {
        format!("(getter {} {})", declaration.name.lexeme, Self::block(&declaration.body))
    }

    fn function_tail(params: &[Token], body: &[Stmt]) -> String {
        let params: Vec<_> = params.iter().map(|p| p.lexeme.as_str()).collect();
        format!("({}) {}", params.join(" "), Self::block(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn dump(source: &str) -> Vec<String> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap().iter().map(AstPrinter::stmt_to_string).collect()
    }

    #[test]
    fn print_an_ast() {
        // This is '-123 * (45.67)'
        let expr = Expr::Binary {
            left: Box::new(Expr::Unary {
                operator: Token::new(TokenType::Minus, "-", None, 1),
                right: Box::new(Expr::number_literal(123.0)),
            }),
            operator: Token::new(TokenType::Star, "*", None, 1),
            right: Box::new(Expr::Grouping { expr: Box::new(Expr::number_literal(45.67)) }),
        };

        let res = AstPrinter::to_string(&expr);
        assert_eq!(res, "(* (- 123) (group 45.67))".to_owned());
    }

    #[test]
    fn print_statements() {
        assert_eq!(
            dump("var a = b ? \"x\" : c ?: 1; fun f(x, y) { return x?.y }"),
            vec![
                "(var a (? b \"x\" (?: c 1)))",
                "(fun f (x y) {(return (?. x y))})",
            ]
        );
    }

    #[test]
    fn print_classes() {
        assert_eq!(
            dump("class B < A { init(v) { this.v = v } size { return super.size } }"),
            vec![concat!(
                "(class B < A (fun init (v) {(; (.= this v v))})",
                " (getter size {(return (super size))}))"
            )]
        );
    }
}
