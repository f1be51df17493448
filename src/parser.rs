use std::fmt::Display;
use std::rc::Rc;

use crate::prelude::*;

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug)]
pub struct ParserError {
    pub token: Token,
    pub message: String,
}

impl ParserError {
    fn new(token: Token, message: impl AsRef<str>) -> Self {
        Self { token, message: message.as_ref().to_owned() }
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.token.token_type == TokenType::EOF {
            write!(f, "[line {}] Error at end: {}", self.token.line, self.message)
        } else {
            let Token { line, lexeme, .. } = &self.token;
            write!(f, "[line {line}] Error at '{lexeme}': {}", self.message)
        }
    }
}

impl std::error::Error for ParserError {}

type ParseResult<T> = Result<T, ParserError>;

enum Member {
    Function(Rc<FunctionDecl>),
    Getter(Rc<GetterDecl>),
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0, errors: vec![] }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, Vec<ParserError>> {
        let mut statements = vec![];
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_tt(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.check(TokenType::Fun) && self.check_next(TokenType::Identifier) {
            self.advance();
            Ok(match self.member("function")? {
                Member::Function(function) => Stmt::Function(function),
                Member::Getter(getter) => Stmt::Getter(getter),
            })
        } else if self.match_tt(&[TokenType::Var]) {
            let stmt = self.var_declaration()?;
            self.end_statement();
            Ok(stmt)
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;

        let superclass = if self.match_tt(&[TokenType::Less]) {
            let super_name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            Some(Expr::variable(super_name))
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = vec![];
        let mut getters = vec![];
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            match self.member("method")? {
                Member::Function(method) => methods.push(method),
                Member::Getter(getter) => getters.push(getter),
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;
        Ok(Stmt::Class { name, superclass, methods, getters })
    }

    /// `name(params) { ... }` is a function, `name { ... }` is a getter.
    fn member(&mut self, kind: &str) -> ParseResult<Member> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;

        if self.check(TokenType::LeftBrace) {
            self.advance();
            let body = self.block()?;
            return Ok(Member::Getter(Rc::new(GetterDecl { name, body })));
        }

        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let (params, body) = self.function_rest(kind)?;
        Ok(Member::Function(Rc::new(FunctionDecl { name, params, body })))
    }

    /// Parameters and body, starting right after the opening parenthesis.
    fn function_rest(&mut self, kind: &str) -> ParseResult<(Vec<Token>, Vec<Stmt>)> {
        let mut parameters = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if parameters.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    let error = ParserError::new(token, "Can't have more than 255 parameters.");
                    self.errors.push(error);
                }

                parameters.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;

        Ok((parameters, self.block()?))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer =
            if self.match_tt(&[TokenType::Equal]) { Some(self.expression()?) } else { None };

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_tt(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_tt(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_tt(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_tt(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_tt(&[TokenType::Print]) {
            let keyword = self.previous();
            let expr = self.expression()?;
            self.end_statement();
            Ok(Stmt::Print { keyword, expr })
        } else if self.match_tt(&[TokenType::Break]) {
            let token = self.previous();
            self.end_statement();
            Ok(Stmt::Break { token })
        } else if self.match_tt(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block { statements: self.block()? })
        } else {
            let stmt = self.expression_statement()?;
            self.end_statement();
            Ok(stmt)
        }
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_tt(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous();
        let value = if self.check(TokenType::Semicolon)
            || self.check(TokenType::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };

        self.end_statement();
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after while condition.")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_tt(&[TokenType::Semicolon]) {
            None
        } else if self.match_tt(&[TokenType::Var]) {
            let stmt = self.var_declaration()?;
            self.consume(TokenType::Semicolon, "Expect ';' after loop initializer.")?;
            Some(stmt)
        } else {
            let stmt = self.expression_statement()?;
            self.consume(TokenType::Semicolon, "Expect ';' after loop initializer.")?;
            Some(stmt)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            self.expression()?
        } else {
            Expr::Literal { value: Object::Boolean(true) }
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment =
            if !self.check(TokenType::RightParen) { Some(self.expression()?) } else { None };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        // Now reconstruct all those parts as a while loop
        if let Some(increment) = increment {
            body = Stmt::Block { statements: vec![body, Stmt::Expression { expr: increment }] };
        }

        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block { statements: vec![initializer, body] };
        }

        Ok(body)
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        Ok(Stmt::Expression { expr })
    }

    /// Semicolons are optional statement terminators.
    fn end_statement(&mut self) {
        self.match_tt(&[TokenType::Semicolon]);
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.ternary()?;

        if self.match_tt(&[TokenType::Equal]) {
            let equals = self.previous();
            let value = Box::new(self.assignment()?);

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(Expr::Assign { id: ExprId::fresh(), name, value });
                }
                Expr::Get { object, name } => return Ok(Expr::Set { object, name, value }),
                _ => self.errors.push(ParserError::new(equals, "Invalid assignment target.")),
            }

            return Ok(*value);
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let first = self.elvis()?;

        if self.match_tt(&[TokenType::Question]) {
            let second = self.expression()?;
            self.consume(TokenType::Colon, "Expect ':' in ternary expression.")?;
            let third = self.ternary()?;

            return Ok(Expr::Ternary {
                first: Box::new(first),
                second: Box::new(second),
                third: Box::new(third),
            });
        }

        Ok(first)
    }

    fn elvis(&mut self) -> ParseResult<Expr> {
        self.binary_left_assoc(&[TokenType::Elvis], Self::or)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while self.match_tt(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_tt(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_left_assoc(&[TokenType::BangEqual, TokenType::EqualEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_left_assoc(
            &[TokenType::GreaterEqual, TokenType::Greater, TokenType::LessEqual, TokenType::Less],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_left_assoc(&[TokenType::Minus, TokenType::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_left_assoc(&[TokenType::Slash, TokenType::Star], Self::unary)
    }

    fn binary_left_assoc(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while self.match_tt(operators) {
            let operator = self.previous();
            let right = operand(self)?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.unary()?;
            return Ok(Expr::Unary { operator, right: Box::new(right) });
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tt(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tt(&[TokenType::Dot]) {
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get { object: Box::new(expr), name };
            } else if self.match_tt(&[TokenType::QuestionDot]) {
                let name =
                    self.consume(TokenType::Identifier, "Expect property name after '?.'.")?;
                expr = Expr::NilGet { object: Box::new(expr), name };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    // Just report the error, keep parsing
                    let token = self.peek().clone();
                    let error = ParserError::new(token, "Can't have more than 255 arguments.");
                    self.errors.push(error);
                }

                arguments.push(self.expression()?);

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, arguments })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::False]) {
            return Ok(Expr::Literal { value: Object::Boolean(false) });
        }
        if self.match_tt(&[TokenType::True]) {
            return Ok(Expr::Literal { value: Object::Boolean(true) });
        }
        if self.match_tt(&[TokenType::Nil]) {
            return Ok(Expr::Literal { value: Object::Null });
        }
        if self.match_tt(&[TokenType::Number, TokenType::StringLiteral]) {
            let token = self.previous();
            let value = token.literal.clone().unwrap_or(Object::Null);
            return Ok(Expr::Literal { value });
        }
        if self.match_tt(&[TokenType::This]) {
            return Ok(Expr::This { id: ExprId::fresh(), keyword: self.previous() });
        }
        if self.match_tt(&[TokenType::Super]) {
            let keyword = self.previous();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::Super { id: ExprId::fresh(), keyword, method });
        }
        if self.match_tt(&[TokenType::Identifier]) {
            return Ok(Expr::variable(self.previous()));
        }
        if self.match_tt(&[TokenType::Fun]) {
            let keyword = self.previous();
            self.consume(TokenType::LeftParen, "Expect '(' after 'fun'.")?;
            let (params, body) = self.function_rest("lambda")?;
            let name = Token::new(TokenType::Fun, "lambda", None, keyword.line);
            return Ok(Expr::Lambda { declaration: Rc::new(FunctionDecl { name, params, body }) });
        }
        if self.match_tt(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping { expr: Box::new(expr) });
        }

        Err(ParserError::new(self.peek().clone(), "Expect expression."))
    }

    /// Return the next token if its `token_type` matches the given type.
    /// Otherwise, return an error carrying the given message.
    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(token_type) {
            return Ok(self.advance());
        }

        Err(ParserError::new(self.peek().clone(), message))
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(*tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Check to see if the next token's type matches the given `token_type`.
    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == token_type
    }

    fn check_next(&self, token_type: TokenType) -> bool {
        self.tokens.get(self.current + 1).is_some_and(|t| t.token_type == token_type)
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        // The scanner always terminates the stream with EOF, and `advance`
        // never moves past it.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    fn synchronize(&mut self) {
        self.advance();

        // Move and discard tokens until we find a statement boundary
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Break
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<ParserError>> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse()
    }

    #[test]
    fn semicolons_are_optional() {
        let stmts = parse("var a = 1 print a\nclass A { m() { return 1 } }").unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn bare_return_before_closing_brace() {
        let stmts = parse("fun f() { return }").unwrap();
        match &stmts[0] {
            Stmt::Function(decl) => {
                assert!(matches!(decl.body[0], Stmt::Return { value: None, .. }))
            }
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn class_members_split_into_methods_and_getters() {
        let stmts = parse("class Circle < Shape { init(r) { this.r = r } area { return 3 } }")
            .unwrap();
        match &stmts[0] {
            Stmt::Class { superclass, methods, getters, .. } => {
                assert!(superclass.is_some());
                assert_eq!(methods[0].name.lexeme, "init");
                assert_eq!(getters[0].name.lexeme, "area");
            }
            other => panic!("expected a class, got {other:?}"),
        }
    }

    #[test]
    fn top_level_getter_and_lambda() {
        let stmts = parse("fun answer { return 42 } var f = fun (x) { return x }").unwrap();
        assert!(matches!(stmts[0], Stmt::Getter(_)));
        assert!(matches!(
            stmts[1],
            Stmt::Var { initializer: Some(Expr::Lambda { .. }), .. }
        ));
    }

    #[test]
    fn ternary_binds_looser_than_elvis() {
        let stmts = parse("a ?: b ? c : d;").unwrap();
        match &stmts[0] {
            Stmt::Expression { expr: Expr::Ternary { first, .. } } => {
                assert!(matches!(
                    first.as_ref(),
                    Expr::Binary { operator: Token { token_type: TokenType::Elvis, .. }, .. }
                ));
            }
            other => panic!("expected a ternary, got {other:?}"),
        }
    }

    #[test]
    fn property_assignment_becomes_set() {
        let stmts = parse("a.b = 1;").unwrap();
        assert!(matches!(stmts[0], Stmt::Expression { expr: Expr::Set { .. } }));
    }

    #[test]
    fn reports_every_error() {
        let errors = parse("var = 1;\nprint ;\n1 = 2;").unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].to_string(), "[line 1] Error at '=': Expect variable name.");
        assert_eq!(errors[2].message, "Invalid assignment target.");
    }
}
