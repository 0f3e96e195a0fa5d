//! Operator and punctuation lexing.

use routc_util::Symbol;

use crate::lexer::Lexer;
use crate::token::TokenKind;

impl<'a> Lexer<'a> {
    /// Lexes operators and remaining punctuation.
    ///
    /// Two-character operators (`:=`, `<=`, `>=`, `/=`, `..`, `=>`) are
    /// checked before their single-character prefixes. Anything
    /// unrecognized becomes an error token carrying the character.
    pub(crate) fn lex_operator(&mut self) -> TokenKind {
        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            ':' => {
                if self.cursor.match_char('=') {
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            },
            '<' => {
                if self.cursor.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            },
            '>' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            },
            '/' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ne
                } else {
                    TokenKind::Slash
                }
            },
            '.' => {
                if self.cursor.match_char('.') {
                    TokenKind::Range
                } else {
                    TokenKind::Dot
                }
            },
            '=' => {
                if self.cursor.match_char('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Eq
                }
            },
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            other => {
                let mut buf = [0u8; 4];
                TokenKind::Error(Symbol::intern(other.encode_utf8(&mut buf)))
            },
        }
    }
}
