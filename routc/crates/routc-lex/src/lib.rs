//! routc-lex - lexical analysis for the Rout language.
//!
//! Turns a UTF-8 source string into a token stream. Two things distinguish
//! this lexer from a textbook one:
//!
//! - **Automatic semicolon insertion**: a newline crossed outside any
//!   bracket pair, after a token that can end a statement, synthesizes a
//!   `;` token. Source can therefore use line breaks or semicolons as
//!   statement separators interchangeably.
//! - **No fatal errors**: unknown characters and out-of-range literals
//!   become `TokenKind::Error` tokens carried forward for the parser to
//!   reject with a proper location.

pub mod cursor;
mod lexer;
mod token;

#[cfg(test)]
mod edge_cases;

pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, Token, TokenKind};
