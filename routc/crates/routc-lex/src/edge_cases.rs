//! Cross-cutting lexer tests: tricky inputs and stream-level properties.

use proptest::prelude::*;

use crate::lexer::tokenize;
use crate::token::TokenKind;
use routc_util::Symbol;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_whitespace_only_input() {
    assert_eq!(kinds("   \t  \n \n "), vec![TokenKind::Eof]);
}

#[test]
fn test_comment_only_input() {
    assert_eq!(kinds("-- nothing here\n-- or here"), vec![TokenKind::Eof]);
}

#[test]
fn test_comment_at_eof_without_newline() {
    assert_eq!(
        kinds("x -- trailing"),
        vec![
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_no_asi_when_line_is_blank_from_start() {
    // Nothing emitted yet, so nothing to terminate.
    assert_eq!(
        kinds("\n\nx"),
        vec![TokenKind::Ident(Symbol::intern("x")), TokenKind::Eof]
    );
}

#[test]
fn test_explicit_semicolons_still_emitted() {
    assert_eq!(
        kinds("x;;y"),
        vec![
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Semicolon,
            TokenKind::Semicolon,
            TokenKind::Ident(Symbol::intern("y")),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_explicit_semicolon_then_newline_no_double() {
    // `;` is not in the trigger set, so the newline inserts nothing.
    assert_eq!(
        kinds("x;\ny"),
        vec![
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Semicolon,
            TokenKind::Ident(Symbol::intern("y")),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_unbalanced_close_bracket_does_not_underflow() {
    // Depth saturates at zero; the newline after `x` still inserts.
    assert_eq!(
        kinds(")]}\nx\ny"),
        vec![
            TokenKind::RParen,
            TokenKind::RBracket,
            TokenKind::RBrace,
            TokenKind::Semicolon,
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Semicolon,
            TokenKind::Ident(Symbol::intern("y")),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_nested_brackets_suppress_asi_until_all_closed() {
    assert_eq!(
        kinds("f([1,\n2],\n{x:\n3})\ny"),
        vec![
            TokenKind::Ident(Symbol::intern("f")),
            TokenKind::LParen,
            TokenKind::LBracket,
            TokenKind::Int(1),
            TokenKind::Comma,
            TokenKind::Int(2),
            TokenKind::RBracket,
            TokenKind::Comma,
            TokenKind::LBrace,
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Colon,
            TokenKind::Int(3),
            TokenKind::RBrace,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Ident(Symbol::intern("y")),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_keyword_then_newline_no_asi() {
    // `then` is not a terminator kind.
    assert_eq!(
        kinds("if x then\ny end"),
        vec![
            TokenKind::If,
            TokenKind::Ident(Symbol::intern("x")),
            TokenKind::Then,
            TokenKind::Ident(Symbol::intern("y")),
            TokenKind::Semicolon,
            TokenKind::End,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_error_token_position() {
    let tokens = tokenize("ok\n  @");
    let err = tokens
        .iter()
        .find(|t| matches!(t.kind, TokenKind::Error(_)))
        .unwrap();
    assert_eq!((err.span.line, err.span.column), (2, 3));
}

proptest! {
    /// Lexing is a pure function of the input: two runs agree token for
    /// token, including synthesized semicolons.
    #[test]
    fn prop_lexing_is_deterministic(source in ".{0,200}") {
        let first = tokenize(&source);
        let second = tokenize(&source);
        prop_assert_eq!(first, second);
    }

    /// No semicolon is synthesized while any bracket depth is open. Inputs
    /// contain no `;`, so every semicolon in the output is synthesized.
    #[test]
    fn prop_no_asi_inside_brackets(source in "[a-c0-9 \n()\\[\\]{}+,]{0,120}") {
        let mut parens = 0i32;
        let mut brackets = 0i32;
        let mut braces = 0i32;
        for token in tokenize(&source) {
            match token.kind {
                TokenKind::Semicolon => {
                    prop_assert!(parens == 0 && brackets == 0 && braces == 0);
                }
                TokenKind::LParen => parens += 1,
                TokenKind::RParen => parens = (parens - 1).max(0),
                TokenKind::LBracket => brackets += 1,
                TokenKind::RBracket => brackets = (brackets - 1).max(0),
                TokenKind::LBrace => braces += 1,
                TokenKind::RBrace => braces = (braces - 1).max(0),
                _ => {}
            }
        }
    }

    /// The token stream always terminates with exactly one Eof.
    #[test]
    fn prop_single_trailing_eof(source in ".{0,200}") {
        let tokens = tokenize(&source);
        let eof_count = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
        prop_assert_eq!(eof_count, 1);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}
