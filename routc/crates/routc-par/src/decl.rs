//! Declaration parsing: variables, type aliases, routines.

use routc_lex::TokenKind;

use crate::ast::*;
use crate::{ParseResult, Parser};

impl Parser {
    /// `var NAME (: Type)? (is Expr)? ;`
    ///
    /// Well-formed source supplies a type, an initializer, or both; the
    /// parser accepts either absent and leaves enforcement to analysis.
    pub(crate) fn parse_var_decl(&mut self) -> ParseResult<VarDecl> {
        let start = self.expect(TokenKind::Var, "`var`")?.span;
        let (name, _) = self.expect_ident("a variable name")?;

        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.eat(TokenKind::Is) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.finish_item()?;

        Ok(VarDecl {
            name,
            ty,
            init,
            span: start.merge(self.prev_span()),
        })
    }

    /// `type NAME is Type ;`
    pub(crate) fn parse_type_decl(&mut self) -> ParseResult<TypeDecl> {
        let start = self.expect(TokenKind::Type, "`type`")?.span;
        let (name, _) = self.expect_ident("a type name")?;
        self.expect(TokenKind::Is, "`is`")?;
        let aliased = self.parse_type()?;
        self.finish_item()?;

        Ok(TypeDecl {
            name,
            aliased,
            span: start.merge(self.prev_span()),
        })
    }

    /// `routine NAME ( Params? ) (: Type)? (is Body end | => Expr ;)`
    pub(crate) fn parse_routine_decl(&mut self) -> ParseResult<RoutineDecl> {
        let start = self.expect(TokenKind::Routine, "`routine`")?.span;
        let (name, _) = self.expect_ident("a routine name")?;

        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen, "`)`")?;

        let ret = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = if self.eat(TokenKind::FatArrow) {
            let expr = self.parse_expr()?;
            self.finish_item()?;
            RoutineBody::Expr(expr)
        } else {
            self.expect(TokenKind::Is, "`is` or `=>`")?;
            let body = self.parse_body()?;
            self.expect(TokenKind::End, "`end`")?;
            RoutineBody::Block(body)
        };

        Ok(RoutineDecl {
            name,
            params,
            ret,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    /// Comma-separated `(ref)? NAME : Type`, possibly empty.
    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.kind() == TokenKind::RParen {
            return Ok(params);
        }

        loop {
            let start = self.span();
            let by_ref = self.eat(TokenKind::Ref);
            let (name, _) = self.expect_ident("a parameter name")?;
            self.expect(TokenKind::Colon, "`:`")?;
            let ty = self.parse_type()?;

            params.push(Param {
                name,
                ty,
                by_ref,
                span: start.merge(self.prev_span()),
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }
}
