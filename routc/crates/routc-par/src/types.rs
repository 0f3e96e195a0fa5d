//! Type expression parsing.

use routc_lex::TokenKind;

use crate::ast::*;
use crate::{ParseResult, Parser};

impl Parser {
    /// `integer | real | boolean | string | array [Expr?] Type
    ///  | record VarDecl* end | NAME`
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let span = self.span();
        match self.kind() {
            TokenKind::IntegerKw => {
                self.advance();
                Ok(TypeExpr::Primitive(Primitive::Integer, span))
            },
            TokenKind::RealKw => {
                self.advance();
                Ok(TypeExpr::Primitive(Primitive::Real, span))
            },
            TokenKind::BooleanKw => {
                self.advance();
                Ok(TypeExpr::Primitive(Primitive::Boolean, span))
            },
            TokenKind::StringKw => {
                self.advance();
                Ok(TypeExpr::Primitive(Primitive::Str, span))
            },
            TokenKind::Array => self.parse_array_type(),
            TokenKind::Record => self.parse_record_type(),
            TokenKind::Ident(name) => {
                self.advance();
                Ok(TypeExpr::Named(name, span))
            },
            _ => Err(self.unexpected("a type")),
        }
    }

    /// `array [ Expr? ] ElemType` — the size is optional (parameters take
    /// unsized arrays).
    fn parse_array_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.expect(TokenKind::Array, "`array`")?.span;
        self.expect(TokenKind::LBracket, "`[`")?;

        let size = if self.kind() == TokenKind::RBracket {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        self.expect(TokenKind::RBracket, "`]`")?;
        let elem = Box::new(self.parse_type()?);

        Ok(TypeExpr::Array {
            size,
            elem,
            span: start.merge(self.prev_span()),
        })
    }

    /// `record VarDecl* end`
    fn parse_record_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.expect(TokenKind::Record, "`record`")?.span;

        let mut fields = Vec::new();
        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.kind() == TokenKind::End {
                break;
            }
            fields.push(self.parse_var_decl()?);
        }

        self.expect(TokenKind::End, "`end`")?;
        Ok(TypeExpr::Record {
            fields,
            span: start.merge(self.prev_span()),
        })
    }
}
