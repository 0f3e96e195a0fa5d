//! Expression parsing.
//!
//! An explicit precedence cascade, lowest binding first:
//! `or`/`xor` → `and` → comparison → additive → multiplicative → unary →
//! primary. Each binary level is left-associative and consumes its
//! operators iteratively.

use routc_lex::TokenKind;
use routc_util::{Span, Symbol};

use crate::ast::*;
use crate::{ParseResult, Parser};

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        loop {
            let op = match self.kind() {
                TokenKind::Or => BinOp::Or,
                TokenKind::Xor => BinOp::Xor,
                _ => break,
            };
            self.advance();
            let right = self.parse_and()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.kind() == TokenKind::And {
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.kind() {
            TokenKind::Not => UnOp::Not,
            TokenKind::Minus => UnOp::Neg,
            _ => return self.parse_primary(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span());
        Ok(Expr::Unary(Box::new(UnaryExpr { op, operand, span })))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.span();
        match self.kind() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Int(value, span))
            },
            TokenKind::Real(value) => {
                self.advance();
                Ok(Expr::Real(value, span))
            },
            TokenKind::Bool(value) => {
                self.advance();
                Ok(Expr::Bool(value, span))
            },
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Str(value, span))
            },
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            },
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_record_literal(),
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_ident_usage(name, span)
            },
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// A bare identifier, a call, or an access chain.
    fn parse_ident_usage(&mut self, name: Symbol, start: Span) -> ParseResult<Expr> {
        if self.kind() == TokenKind::LParen {
            self.advance();
            let args = self.parse_arg_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(Expr::Call(Box::new(CallExpr {
                name,
                args,
                span: start.merge(self.prev_span()),
            })));
        }

        if matches!(self.kind(), TokenKind::Dot | TokenKind::LBracket) {
            let place = self.parse_place_from(name, start)?;
            return Ok(Expr::Place(Box::new(place)));
        }

        Ok(Expr::Ident(name, start))
    }

    /// Continues an access chain (`.name` or `[expr]`) after a base name.
    pub(crate) fn parse_place_from(&mut self, base: Symbol, start: Span) -> ParseResult<Place> {
        let mut accesses = Vec::new();

        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let (field, field_span) = self.expect_ident("a field name")?;
                    accesses.push(Access::Field(field, field_span));
                },
                TokenKind::LBracket => {
                    let open = self.advance().span;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    accesses.push(Access::Index(index, open.merge(self.prev_span())));
                },
                _ => break,
            }
        }

        Ok(Place {
            base,
            accesses,
            span: start.merge(self.prev_span()),
        })
    }

    /// `[e1, …, eN]`
    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let start = self.expect(TokenKind::LBracket, "`[`")?.span;
        let elements = self.parse_arg_list()?;
        self.expect(TokenKind::RBracket, "`]`")?;

        Ok(Expr::ArrayLit(ArrayLit {
            elements,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `{name: expr, …}`
    fn parse_record_literal(&mut self) -> ParseResult<Expr> {
        let start = self.expect(TokenKind::LBrace, "`{`")?.span;

        let mut fields = Vec::new();
        if self.kind() != TokenKind::RBrace {
            loop {
                let (name, _) = self.expect_ident("a field name")?;
                self.expect(TokenKind::Colon, "`:`")?;
                let value = self.parse_expr()?;
                fields.push((name, value));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(Expr::RecordLit(RecordLit {
            fields,
            span: start.merge(self.prev_span()),
        }))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span().merge(right.span());
    Expr::Binary(Box::new(BinaryExpr {
        op,
        left,
        right,
        span,
    }))
}
