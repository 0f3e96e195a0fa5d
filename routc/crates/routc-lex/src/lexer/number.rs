//! Numeric literal lexing.

use routc_util::Symbol;

use crate::lexer::Lexer;
use crate::token::TokenKind;

impl<'a> Lexer<'a> {
    /// Lexes an integer or real literal.
    ///
    /// A real requires a `.` immediately followed by a digit, so `1..10`
    /// lexes as integer, range, integer rather than as a real. There are no
    /// exponents or digit separators in Rout.
    pub(crate) fn lex_number(&mut self) -> TokenKind {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        let is_real =
            self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit();

        if is_real {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }

            let text = self.cursor.slice_from(self.token_start);
            match text.parse::<f64>() {
                Ok(value) => TokenKind::Real(value),
                Err(_) => TokenKind::Error(Symbol::intern(text)),
            }
        } else {
            let text = self.cursor.slice_from(self.token_start);
            match text.parse::<i32>() {
                Ok(value) => TokenKind::Int(value),
                // Out-of-range literal; carried forward for the parser to reject.
                Err(_) => TokenKind::Error(Symbol::intern(text)),
            }
        }
    }
}
