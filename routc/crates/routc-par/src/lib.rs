//! routc-par - recursive-descent parser for the Rout language.
//!
//! Hand-written, single-token lookahead. The grammar is laid out as an
//! explicit precedence cascade and every binary level is built iteratively,
//! so deeply chained operators cannot blow the stack. The first syntax
//! error aborts parsing; there is no recovery.

pub mod ast;
mod decl;
mod expr;
mod stmt;
mod types;

#[cfg(test)]
mod edge_cases;

use thiserror::Error;

use routc_lex::{Token, TokenKind};
use routc_util::Span;

use crate::ast::{Decl, Program};

/// A fatal syntax error: what the parser wanted, what it found, and where.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found `{found}` at {span}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        span: Span,
    },

    #[error("unrecognized input `{lexeme}` at {span}")]
    InvalidToken { lexeme: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidToken { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive descent parser over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Creates a parser. The stream must end with an `Eof` token, which
    /// [`routc_lex::tokenize`] guarantees.
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses a whole program: declarations until end of input.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut decls = Vec::new();

        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.kind() == TokenKind::Eof {
                break;
            }
            decls.push(self.parse_decl()?);
        }

        Ok(Program { decls })
    }

    /// Dispatches a top-level declaration on its first token.
    fn parse_decl(&mut self) -> ParseResult<Decl> {
        match self.kind() {
            TokenKind::Var => Ok(Decl::Var(self.parse_var_decl()?)),
            TokenKind::Type => Ok(Decl::Type(self.parse_type_decl()?)),
            TokenKind::Routine => Ok(Decl::Routine(self.parse_routine_decl()?)),
            _ => Err(self.unexpected("a declaration (`var`, `type`, or `routine`)")),
        }
    }

    // ------------------------------------------------------------------
    // Token stream helpers
    // ------------------------------------------------------------------

    pub(crate) fn current(&self) -> Token {
        self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.position == 0 {
            self.span()
        } else {
            self.tokens[self.position - 1].span
        }
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// Consumes the current token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the expected token or fails.
    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consumes an identifier, returning its symbol and span.
    pub(crate) fn expect_ident(
        &mut self,
        expected: &str,
    ) -> ParseResult<(routc_util::Symbol, Span)> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let span = self.span();
                self.advance();
                Ok((name, span))
            },
            _ => Err(self.unexpected(expected)),
        }
    }

    /// A statement or declaration terminator: an explicit or inserted `;`,
    /// or the closing keyword of the enclosing construct.
    pub(crate) fn finish_item(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        match self.kind() {
            TokenKind::End | TokenKind::Else | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("`;`")),
        }
    }

    /// Builds the fatal error for the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        if let TokenKind::Error(lexeme) = token.kind {
            ParseError::InvalidToken {
                lexeme: lexeme.as_str().to_string(),
                span: token.span,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind,
                span: token.span,
            }
        }
    }
}

/// Convenience entry point: lex and parse a source string.
pub fn parse_source(source: &str) -> ParseResult<Program> {
    Parser::new(routc_lex::tokenize(source)).parse_program()
}
