//! Lexer behavior: token kinds, literals, delimiters, annotations and the
//! persistent buffer model.

use mindscript_core::lexer::{LexError, Lexer};
use mindscript_core::tokens::{Literal, TokenKind};

fn kinds(code: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new();
    match lexer.scan(code, "test") {
        Ok(tokens) => tokens.iter().map(|t| t.kind).collect(),
        Err(e) => panic!("lexing {:?} failed: {:?}", code, e),
    }
}

#[test]
fn scans_integer() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("123", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[0].literal, Some(Literal::Int(123)));
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}

#[test]
fn scans_float() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("3.14", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].literal, Some(Literal::Num(3.14)));
}

#[test]
fn scans_float_with_exponent() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("1.5e2", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].literal, Some(Literal::Num(150.0)));
}

#[test]
fn scans_strings_with_both_delimiters() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("'hello' \"world\"", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].literal, Some(Literal::Str("hello".to_string())));
    assert_eq!(tokens[1].literal, Some(Literal::Str("world".to_string())));
}

#[test]
fn decodes_escape_sequences() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan(r#""a\nb\t\\""#, "test").unwrap();
    assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb\t\\".to_string())));
}

#[test]
fn decodes_unicode_escape() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan(r#""\u0041""#, "test").unwrap();
    assert_eq!(tokens[0].literal, Some(Literal::Str("A".to_string())));
}

#[test]
fn unterminated_string_is_an_error() {
    let mut lexer = Lexer::new();
    assert!(matches!(
        lexer.scan("\"abc", "test"),
        Err(LexError::Lexical(_))
    ));
}

#[test]
fn scans_boolean_keywords() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("true false", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Boolean);
    assert_eq!(tokens[0].literal, Some(Literal::Bool(true)));
    assert_eq!(tokens[1].literal, Some(Literal::Bool(false)));
}

#[test]
fn scans_null_keyword() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("null", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Null);
    assert_eq!(tokens[0].literal, None);
}

#[test]
fn scans_identifier_and_keywords() {
    assert_eq!(
        kinds("let x = fun do end"),
        vec![
            TokenKind::Let,
            TokenKind::Id,
            TokenKind::Assign,
            TokenKind::Function,
            TokenKind::Do,
            TokenKind::End,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn type_names_lex_as_type_tokens() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("Int Num Str Bool Null Any Type", "test").unwrap();
    for token in &tokens[..7] {
        assert_eq!(token.kind, TokenKind::Type);
    }
}

#[test]
fn adjacent_delimiters_lex_as_closed_forms() {
    assert_eq!(
        kinds("f(x) (y)"),
        vec![
            TokenKind::Id,
            TokenKind::ClRound,
            TokenKind::Id,
            TokenKind::RRound,
            TokenKind::LRound,
            TokenKind::Id,
            TokenKind::RRound,
            TokenKind::Eof,
        ]
    );
    assert_eq!(
        kinds("a[0] [1]"),
        vec![
            TokenKind::Id,
            TokenKind::ClSquare,
            TokenKind::Integer,
            TokenKind::RSquare,
            TokenKind::LSquare,
            TokenKind::Integer,
            TokenKind::RSquare,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn two_character_operators() {
    assert_eq!(
        kinds("-> == != <= >= ="),
        vec![
            TokenKind::Arrow,
            TokenKind::Eq,
            TokenKind::Neq,
            TokenKind::LessEq,
            TokenKind::GreaterEq,
            TokenKind::Assign,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn annotation_token_carries_trimmed_text() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("# hello\nx", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Hash);
    assert_eq!(tokens[0].literal, Some(Literal::Str("hello".to_string())));
    assert_eq!(tokens[1].kind, TokenKind::Id);
}

#[test]
fn annotation_spans_continuation_lines() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("# a\n# b\nx", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Hash);
    assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".to_string())));
}

#[test]
fn lone_annotation_degenerates_to_null() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("# lonely\n\nx", "test").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Null);
}

#[test]
fn double_hash_is_a_silent_comment() {
    assert_eq!(
        kinds("## just a comment\n1"),
        vec![TokenKind::Integer, TokenKind::Eof]
    );
}

#[test]
fn keyword_after_period_lexes_as_identifier() {
    assert_eq!(
        kinds("a.type"),
        vec![
            TokenKind::Id,
            TokenKind::Period,
            TokenKind::Id,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn buffers_accumulate_across_scans() {
    let mut lexer = Lexer::new();
    lexer.scan("let", "session").unwrap();
    let tokens = lexer.scan(" x", "session").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Id);
    // The buffer now holds "let x"; the new token's index points past the
    // earlier input.
    assert_eq!(tokens[0].index, 4);
}

#[test]
fn tabs_normalize_to_four_spaces() {
    let mut lexer = Lexer::new();
    let tokens = lexer.scan("\tx", "test").unwrap();
    assert_eq!(tokens[0].index, 4);
}

#[test]
fn unexpected_character_is_an_error() {
    let mut lexer = Lexer::new();
    assert!(matches!(
        lexer.scan("€", "test"),
        Err(LexError::Lexical(_))
    ));
}
