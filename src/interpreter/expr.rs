use std::rc::Rc;

use super::InterpreterResult;
use crate::prelude::*;

impl Interpreter {
    pub fn evaluate_expr(&mut self, expr: &Expr) -> InterpreterResult {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Grouping { expr: inner } => self.evaluate_expr(inner),
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, operator, right),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate_expr(value)?;

                if let Some(&distance) = self.locals.get(id) {
                    self.environment.borrow_mut().assign_at(distance, name, value.clone())?;
                } else {
                    self.globals.borrow_mut().assign(name, value.clone())?;
                }

                Ok(value)
            }
            Expr::Logical { left, operator, right } => {
                let left_val = self.evaluate_expr(left)?;

                if operator.token_type == TokenType::Or {
                    if left_val.is_truthy() {
                        return Ok(left_val);
                    }
                } else if !left_val.is_truthy() {
                    // TokenType::And
                    return Ok(left_val);
                }

                self.evaluate_expr(right)
            }
            Expr::Ternary { first, second, third } => {
                // Only the boolean `true` picks the second branch; other
                // truthy values fall through to the third.
                if matches!(self.evaluate_expr(first)?, Object::Boolean(true)) {
                    self.evaluate_expr(second)
                } else {
                    self.evaluate_expr(third)
                }
            }
            Expr::Call { callee, paren, arguments } => {
                let callee = self.evaluate_expr(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate_expr(arg)?);
                }

                self.call(callee, paren, args)
            }
            Expr::Get { object, name } => match self.evaluate_expr(object)? {
                Object::Instance(instance) => match Instance::get(&instance, name)? {
                    Object::Callable(getter) if getter.is_getter() => getter.call(self, vec![]),
                    property => Ok(property),
                },
                _ => Err(RuntimeError::generic(name, "Only instances have properties.")),
            },
            Expr::NilGet { object, name } => match self.evaluate_expr(object)? {
                Object::Null => Ok(Object::Null),
                // Getters are handed back as-is, not invoked.
                Object::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::generic(name, "Only instances have properties.")),
            },
            Expr::Set { object, name, value } => {
                let Object::Instance(instance) = self.evaluate_expr(object)? else {
                    return Err(RuntimeError::generic(name, "Only instances have fields."));
                };

                let value = self.evaluate_expr(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
            Expr::Lambda { declaration } => {
                let function = Function::new(declaration.clone(), self.environment.clone(), false);
                Ok(Object::Callable(Rc::new(function)))
            }
        }
    }

    fn call(
        &mut self,
        callee: Object,
        paren: &Token,
        arguments: Vec<Object>,
    ) -> InterpreterResult {
        let arity = match &callee {
            Object::Callable(callable) => callable.arity(),
            Object::Class(class) => class.arity(),
            _ => return Err(RuntimeError::NotCallable { paren: paren.clone() }),
        };

        if arguments.len() != arity {
            return Err(RuntimeError::ArityMismatch {
                paren: paren.clone(),
                expected: arity,
                got: arguments.len(),
            });
        }

        match callee {
            Object::Class(class) => Class::construct(&class, self, arguments),
            Object::Callable(callable) => callable.call(self, arguments),
            _ => Err(RuntimeError::NotCallable { paren: paren.clone() }),
        }
    }

    /// `super.method` finds the method on the superclass stored one scope
    /// above the one holding `this`, then binds it to the current instance.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> InterpreterResult {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::Internal {
                name: keyword.clone(),
                msg: "'super' was not resolved".to_owned(),
            });
        };

        let superclass = match self.environment.borrow().get_at(distance, keyword)? {
            Object::Class(class) => class,
            other => {
                return Err(RuntimeError::Internal {
                    name: keyword.clone(),
                    msg: format!("'super' is bound to {other}, not a class"),
                })
            }
        };

        let this = Token::synthetic("this", keyword.line);
        let instance = self.environment.borrow().get_at(distance - 1, &this)?;

        match superclass.find_method(&method.lexeme) {
            Some(function) => Ok(Object::Callable(function.bind(instance))),
            None => Err(RuntimeError::undefined_property(method)),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> InterpreterResult {
        let value = self.evaluate_expr(right)?;
        match operator.token_type {
            TokenType::Minus => match value {
                Object::Number(n) => Ok(Object::Number(-n)),
                _ => Err(RuntimeError::operand(operator, "Operand must be a number.")),
            },
            TokenType::Bang => Ok(Object::Boolean(!value.is_truthy())),
            _ => Err(RuntimeError::operand(operator, "Unknown unary operator.")),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> InterpreterResult {
        let left_value = self.evaluate_expr(left)?;
        let right_value = self.evaluate_expr(right)?;

        match operator.token_type {
            TokenType::EqualEqual => Ok(Object::Boolean(left_value == right_value)),
            TokenType::BangEqual => Ok(Object::Boolean(left_value != right_value)),
            TokenType::Greater => {
                self.compare(operator, &left_value, &right_value, |o| o.is_gt())
            }
            TokenType::GreaterEqual => {
                self.compare(operator, &left_value, &right_value, |o| o.is_ge())
            }
            TokenType::Less => self.compare(operator, &left_value, &right_value, |o| o.is_lt()),
            TokenType::LessEqual => {
                self.compare(operator, &left_value, &right_value, |o| o.is_le())
            }
            TokenType::Minus => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Object::Number(l - r)),
            TokenType::Star => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Object::Number(l * r)),
            TokenType::Slash => {
                let (l, r) = self.check_number_operands(operator, &left_value, &right_value)?;
                if r == 0.0 {
                    return Err(RuntimeError::operand(operator, "Zero division error"));
                }
                Ok(Object::Number(l / r))
            }
            TokenType::Plus => match (left_value, right_value) {
                (Object::Number(l), Object::Number(r)) => Ok(Object::Number(l + r)),
                (Object::String(l), Object::String(r)) => Ok(Object::String(l + &r)),
                (Object::String(l), r) => Ok(Object::String(format!("{l}{r}"))),
                (l, Object::String(r)) => Ok(Object::String(format!("{l}{r}"))),
                _ => Err(RuntimeError::operand(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenType::Elvis => match left_value {
                Object::Null => Ok(right_value),
                value => Ok(value),
            },
            _ => Err(RuntimeError::operand(operator, "Unknown binary operator.")),
        }
    }

    /// Numbers compare numerically, strings lexicographically and booleans
    /// with `false < true`. Mixed or other operands are an error.
    fn compare(
        &self,
        operator: &Token,
        left: &Object,
        right: &Object,
        test: fn(std::cmp::Ordering) -> bool,
    ) -> InterpreterResult {
        let ordering = match (left, right) {
            (Object::Number(l), Object::Number(r)) => l.partial_cmp(r),
            (Object::String(l), Object::String(r)) => Some(l.cmp(r)),
            (Object::Boolean(l), Object::Boolean(r)) => Some(l.cmp(r)),
            _ => {
                return Err(RuntimeError::operand(
                    operator,
                    "Both operands must be numbers, strings or booleans.",
                ))
            }
        };

        // NaN is unordered: every comparison with it is false.
        Ok(Object::Boolean(ordering.is_some_and(test)))
    }

    fn check_number_operands(
        &self,
        operator: &Token,
        left: &Object,
        right: &Object,
    ) -> Result<(f64, f64), RuntimeError> {
        if let (Some(l), Some(r)) = (left.number(), right.number()) {
            Ok((l, r))
        } else {
            Err(RuntimeError::operand(operator, "Operands must be numbers."))
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> InterpreterResult {
        if let Some(&distance) = self.locals.get(&id) {
            self.environment.borrow().get_at(distance, name)
        } else {
            self.globals.borrow().get(name)
        }
    }
}
