//! String literal lexing.

use routc_util::Symbol;

use crate::lexer::Lexer;
use crate::token::TokenKind;

impl<'a> Lexer<'a> {
    /// Lexes a `"`-delimited string literal.
    ///
    /// The body is taken verbatim until the closing quote or end of input;
    /// there are no escape sequences.
    pub(crate) fn lex_string(&mut self) -> TokenKind {
        self.cursor.advance(); // opening quote

        let body_start = self.cursor.position();
        while !self.cursor.is_at_end() && self.cursor.current_char() != '"' {
            self.cursor.advance();
        }
        let body = self.cursor.slice_from(body_start);

        // Consume the closing quote if present; an unterminated literal
        // simply runs to end of input.
        self.cursor.match_char('"');

        TokenKind::Str(Symbol::intern(body))
    }
}
