use mgr::prelude::{Scanner, TokenType};

#[test]
fn scanner_works() {
    let input = "2 and 3";
    let tokens = Scanner::new(input).scan_tokens().unwrap();
    assert_eq!(tokens.len(), 4);
}

#[test]
fn scanner_knows_the_nil_safe_operators() {
    let tokens = Scanner::new("a?.b ?: c ? d : e").scan_tokens().unwrap();
    let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();

    assert_eq!(
        types,
        vec![
            TokenType::Identifier,
            TokenType::QuestionDot,
            TokenType::Identifier,
            TokenType::Elvis,
            TokenType::Identifier,
            TokenType::Question,
            TokenType::Identifier,
            TokenType::Colon,
            TokenType::Identifier,
            TokenType::EOF,
        ]
    );
}

#[test]
fn strings_may_span_lines() {
    let tokens = Scanner::new("\"one\ntwo\" next").scan_tokens().unwrap();
    assert_eq!(tokens[0].lexeme, "\"one\ntwo\"");
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn every_token_kind_is_produced() {
    use TokenType::*;

    let source = r#"( ) { } , . - + ; / * ? : ! != = == > >= < <= ?: ?.
        name "text" 12.5
        and break class else false fun for if nil or print return super this true var while"#;
    let tokens = Scanner::new(source).scan_tokens().unwrap();
    let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();

    assert_eq!(
        types,
        vec![
            LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Minus, Plus, Semicolon,
            Slash, Star, Question, Colon, Bang, BangEqual, Equal, EqualEqual, Greater,
            GreaterEqual, Less, LessEqual, Elvis, QuestionDot, Identifier, StringLiteral, Number,
            And, Break, Class, Else, False, Fun, For, If, Nil, Or, Print, Return, Super, This,
            True, Var, While, EOF,
        ]
    );
}
