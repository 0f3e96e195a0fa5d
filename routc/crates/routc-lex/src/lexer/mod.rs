//! The Rout lexer.
//!
//! [`Lexer::next_token`] classifies the next piece of input and advances.
//! Unknown characters become [`TokenKind::Error`] tokens; the lexer itself
//! never fails. Statement separators may be written as `;` or as line
//! breaks: when the scanner crosses a newline outside any bracket pair and
//! the previous token could end a statement, it synthesizes a semicolon
//! (automatic semicolon insertion).

mod ident;
mod number;
mod operator;
mod string;

use routc_util::Span;

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    pub(crate) cursor: Cursor<'a>,

    /// Start of the token being scanned (byte offset).
    pub(crate) token_start: usize,
    token_line: u32,
    token_column: u32,

    /// Kind of the most recently emitted token, for semicolon insertion.
    last_kind: Option<TokenKind>,

    // Open-bracket depths, tracked independently. Insertion only happens
    // when all three are zero.
    paren_depth: u32,
    bracket_depth: u32,
    brace_depth: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
            token_line: 1,
            token_column: 1,
            last_kind: None,
            paren_depth: 0,
            bracket_depth: 0,
            brace_depth: 0,
        }
    }

    /// Returns the next token and advances. After end of input this keeps
    /// returning [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Token {
        let newline = self.skip_trivia();

        if let Some((pos, line, column)) = newline {
            if self.at_bracket_depth_zero()
                && self.last_kind.is_some_and(|kind| kind.ends_statement())
            {
                return self.emit(TokenKind::Semicolon, Span::new(pos, pos, line, column));
            }
        }

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();
        self.token_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return self.emit(TokenKind::Eof, self.token_span());
        }

        let kind = match self.cursor.current_char() {
            '(' => {
                self.cursor.advance();
                self.paren_depth += 1;
                TokenKind::LParen
            },
            ')' => {
                self.cursor.advance();
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenKind::RParen
            },
            '[' => {
                self.cursor.advance();
                self.bracket_depth += 1;
                TokenKind::LBracket
            },
            ']' => {
                self.cursor.advance();
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                TokenKind::RBracket
            },
            '{' => {
                self.cursor.advance();
                self.brace_depth += 1;
                TokenKind::LBrace
            },
            '}' => {
                self.cursor.advance();
                self.brace_depth = self.brace_depth.saturating_sub(1);
                TokenKind::RBrace
            },
            ',' => {
                self.cursor.advance();
                TokenKind::Comma
            },
            ';' => {
                self.cursor.advance();
                TokenKind::Semicolon
            },
            '"' => self.lex_string(),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_number(),
            _ => self.lex_operator(),
        };

        let span = self.token_span();
        self.emit(kind, span)
    }

    /// Span from the recorded token start to the current cursor position.
    pub(crate) fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_line,
            self.token_column,
        )
    }

    fn emit(&mut self, kind: TokenKind, span: Span) -> Token {
        self.last_kind = Some(kind);
        Token::new(kind, span)
    }

    fn at_bracket_depth_zero(&self) -> bool {
        self.paren_depth == 0 && self.bracket_depth == 0 && self.brace_depth == 0
    }

    /// Skips whitespace and `--` line comments. Returns the location of the
    /// first newline crossed, if any.
    fn skip_trivia(&mut self) -> Option<(usize, u32, u32)> {
        let mut newline = None;
        loop {
            let c = self.cursor.current_char();
            if c == '\n' {
                if newline.is_none() {
                    newline = Some((
                        self.cursor.position(),
                        self.cursor.line(),
                        self.cursor.column(),
                    ));
                }
                self.cursor.advance();
            } else if c.is_whitespace() {
                self.cursor.advance();
            } else if c == '-' && self.cursor.peek_char(1) == '-' {
                // Line comment: runs to end of line; the newline itself is
                // handled by the whitespace branch so insertion still sees it.
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
            } else {
                break;
            }
        }
        newline
    }
}

/// Lexes an entire source string, including the final `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
