use thiserror::Error;

use crate::prelude::*;

#[derive(Debug, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScannerError {
    pub line: i32,
    pub message: String,
}

#[derive(Debug)]
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ScannerError>,
    start: usize,
    current: usize,
    line: i32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, Vec<ScannerError>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }

        self.tokens.push(Token::new(TokenType::EOF, "", None, self.line));

        // Take our temporary tokens out. It will be replaced by the default()
        // value for the vector
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            ':' => self.add_token(TokenType::Colon),
            '?' => {
                let token_type = if self.match_next(':') {
                    TokenType::Elvis
                } else if self.match_next('.') {
                    TokenType::QuestionDot
                } else {
                    TokenType::Question
                };
                self.add_token(token_type);
            }
            '!' => {
                let token_type =
                    if self.match_next('=') { TokenType::BangEqual } else { TokenType::Bang };
                self.add_token(token_type);
            }
            '=' => {
                let token_type =
                    if self.match_next('=') { TokenType::EqualEqual } else { TokenType::Equal };
                self.add_token(token_type);
            }
            '<' => {
                let token_type =
                    if self.match_next('=') { TokenType::LessEqual } else { TokenType::Less };
                self.add_token(token_type);
            }
            '>' => {
                let token_type =
                    if self.match_next('=') { TokenType::GreaterEqual } else { TokenType::Greater };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_next('/') {
                    // Go until end of the commented line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
            }
            '"' => self.string(),
            '0'..='9' => self.number(),
            c if is_alpha(c) => self.identifier(),
            _ => self.error("Unexpected character."),
        }
    }

    fn error(&mut self, message: &str) {
        self.errors.push(ScannerError { line: self.line, message: message.to_owned() });
    }

    fn advance(&mut self) -> char {
        let ch = self.source_chars.get(self.current).copied().unwrap_or('\0');
        self.current += 1;
        ch
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn source_substring(&self, start: usize, end: usize) -> String {
        self.source_chars[start..end].iter().collect()
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal_value: Option<Object>) {
        let text = self.source_substring(self.start, self.current);
        let token = Token::new(token_type, &text, literal_value, self.line);
        self.tokens.push(token);
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.current += 1;
            return true;
        }

        false
    }

    fn peek(&self) -> char {
        self.source_chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source_chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        // The closing "
        self.advance();

        // Skip the quote marks
        let text = self.source_substring(self.start + 1, self.current - 1);
        self.add_token_with_literal(TokenType::StringLiteral, Some(Object::String(text)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            // Consume '.'
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.source_substring(self.start, self.current);
        match text.parse::<f64>() {
            Ok(value) => {
                self.add_token_with_literal(TokenType::Number, Some(Object::Number(value)))
            }
            Err(_) => self.error(&format!("Invalid number literal '{text}'.")),
        }
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_substring(self.start, self.current);
        let token_type = get_keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

fn get_keyword(text: &str) -> Option<TokenType> {
    match text {
        "and" => Some(TokenType::And),
        "break" => Some(TokenType::Break),
        "class" => Some(TokenType::Class),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "for" => Some(TokenType::For),
        "fun" => Some(TokenType::Fun),
        "if" => Some(TokenType::If),
        "nil" => Some(TokenType::Nil),
        "or" => Some(TokenType::Or),
        "print" => Some(TokenType::Print),
        "return" => Some(TokenType::Return),
        "super" => Some(TokenType::Super),
        "this" => Some(TokenType::This),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens().unwrap().into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn question_mark_operators() {
        assert_eq!(
            token_types("a ?: b ? c : d?.e"),
            vec![
                TokenType::Identifier,
                TokenType::Elvis,
                TokenType::Identifier,
                TokenType::Question,
                TokenType::Identifier,
                TokenType::Colon,
                TokenType::Identifier,
                TokenType::QuestionDot,
                TokenType::Identifier,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn literals_carry_values() {
        let mut scanner = Scanner::new(r#"12.5 "hi""#);
        let tokens = scanner.scan_tokens().unwrap();
        assert_eq!(tokens[0].literal, Some(Object::Number(12.5)));
        assert_eq!(tokens[1].literal, Some(Object::String("hi".to_owned())));
    }

    #[test]
    fn collects_every_error() {
        let mut scanner = Scanner::new("@\n#\n\"open");
        let errors = scanner.scan_tokens().unwrap_err();
        let lines: Vec<_> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert_eq!(errors[2].message, "Unterminated string.");
    }

    #[test]
    fn tracks_lines_through_comments() {
        let mut scanner = Scanner::new("// nothing here\nbreak");
        let tokens = scanner.scan_tokens().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Break);
        assert_eq!(tokens[0].line, 2);
    }
}
