use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {}] {msg}", .operator.line)]
    InvalidOperand { operator: Token, msg: String },

    #[error("[line {}] {msg}", .name.line)]
    UndefinedVariable { name: Token, msg: String },

    #[error("[line {}] Accessing undefined value.", .name.line)]
    Uninitialized { name: Token },

    #[error("[line {}] Can only call functions and classes.", .paren.line)]
    NotCallable { paren: Token },

    #[error("[line {}] Expected {expected} arguments but got {got}.", .paren.line)]
    ArityMismatch { paren: Token, expected: usize, got: usize },

    #[error("[line {}] {msg}", .name.line)]
    Generic { name: Token, msg: String },

    #[error("[line {}] Unexpected break statement", .token.line)]
    Break { token: Token },

    #[error("[line {}] Failed to write output: {source}", .token.line)]
    Output {
        token: Token,
        #[source]
        source: std::io::Error,
    },

    /// Lookups that disagree with the resolver's distance table.
    #[error("[line {}] Internal error: {msg}", .name.line)]
    Internal { name: Token, msg: String },
}

impl RuntimeError {
    pub fn operand(operator: &Token, msg: impl AsRef<str>) -> Self {
        Self::InvalidOperand { operator: operator.clone(), msg: msg.as_ref().to_owned() }
    }

    pub fn generic(name: &Token, msg: impl AsRef<str>) -> Self {
        Self::Generic { name: name.clone(), msg: msg.as_ref().to_owned() }
    }

    pub fn undefined_property(name: &Token) -> Self {
        Self::UndefinedVariable {
            name: name.clone(),
            msg: format!("Undefined property '{}'.", name.lexeme),
        }
    }

    pub fn line(&self) -> i32 {
        match self {
            Self::InvalidOperand { operator: token, .. }
            | Self::UndefinedVariable { name: token, .. }
            | Self::Uninitialized { name: token }
            | Self::NotCallable { paren: token }
            | Self::ArityMismatch { paren: token, .. }
            | Self::Generic { name: token, .. }
            | Self::Break { token }
            | Self::Output { token, .. }
            | Self::Internal { name: token, .. } => token.line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    #[test]
    fn messages_carry_the_line() {
        let paren = Token::new(TokenType::RightParen, ")", None, 7);
        let e = RuntimeError::ArityMismatch { paren, expected: 2, got: 1 };
        assert_eq!(e.to_string(), "[line 7] Expected 2 arguments but got 1.");
        assert_eq!(e.line(), 7);
    }
}
