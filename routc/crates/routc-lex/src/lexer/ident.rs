//! Identifier and keyword lexing.

use routc_util::Symbol;

use crate::lexer::Lexer;
use crate::token::{keyword_from_ident, TokenKind};

impl<'a> Lexer<'a> {
    /// Lexes `[A-Za-z_][A-Za-z0-9_]*` and reclassifies keywords.
    ///
    /// Keyword matching is case-insensitive; `true`/`false` come back as
    /// boolean literals.
    pub(crate) fn lex_identifier(&mut self) -> TokenKind {
        loop {
            let c = self.cursor.current_char();
            if c.is_ascii_alphanumeric() || c == '_' {
                self.cursor.advance();
            } else {
                break;
            }
        }

        let text = self.cursor.slice_from(self.token_start);
        keyword_from_ident(text).unwrap_or_else(|| TokenKind::Ident(Symbol::intern(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn first_kind(source: &str) -> TokenKind {
        tokenize(source)[0].kind
    }

    #[test]
    fn test_plain_identifier() {
        assert_eq!(
            first_kind("counter"),
            TokenKind::Ident(Symbol::intern("counter"))
        );
    }

    #[test]
    fn test_underscore_and_digits() {
        assert_eq!(
            first_kind("_tmp_2"),
            TokenKind::Ident(Symbol::intern("_tmp_2"))
        );
    }

    #[test]
    fn test_keyword_reclassified() {
        assert_eq!(first_kind("while"), TokenKind::While);
        assert_eq!(first_kind("Reverse"), TokenKind::Reverse);
    }

    #[test]
    fn test_identifier_casing_preserved() {
        // Only keywords fold case; identifiers stay distinct.
        assert_eq!(
            first_kind("Counter"),
            TokenKind::Ident(Symbol::intern("Counter"))
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            first_kind("iffy"),
            TokenKind::Ident(Symbol::intern("iffy"))
        );
        assert_eq!(
            first_kind("ending"),
            TokenKind::Ident(Symbol::intern("ending"))
        );
    }
}
