//! Statement and body parsing.

use routc_lex::TokenKind;

use crate::ast::*;
use crate::{ParseResult, Parser};

impl Parser {
    /// Parses body items until `end` or `else`, consuming neither.
    ///
    /// Bodies alternate declarations and statements freely; stray
    /// semicolons between items are skipped.
    pub(crate) fn parse_body(&mut self) -> ParseResult<Body> {
        let mut items = Vec::new();

        loop {
            while self.eat(TokenKind::Semicolon) {}
            match self.kind() {
                TokenKind::End | TokenKind::Else | TokenKind::Eof => break,
                TokenKind::Var => items.push(BodyItem::Decl(Decl::Var(self.parse_var_decl()?))),
                TokenKind::Type => items.push(BodyItem::Decl(Decl::Type(self.parse_type_decl()?))),
                // Routines exist only at program top level.
                TokenKind::Routine => {
                    return Err(self.unexpected("a statement (routines must be top-level)"))
                },
                _ => items.push(BodyItem::Stmt(self.parse_stmt()?)),
            }
        }

        Ok(items)
    }

    /// Dispatches a statement on its first token.
    pub(crate) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.kind() {
            TokenKind::Ident(_) => self.parse_assign_or_call(),
            TokenKind::Print => self.parse_print_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// `NAME(args);`  or  `NAME access* := expr;`
    ///
    /// Both forms start with an identifier; one token of lookahead after it
    /// decides which we are in.
    fn parse_assign_or_call(&mut self) -> ParseResult<Stmt> {
        let (name, start) = self.expect_ident("a name")?;

        if self.kind() == TokenKind::LParen {
            self.advance();
            let args = self.parse_arg_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            self.finish_item()?;
            return Ok(Stmt::Call(CallStmt {
                name,
                args,
                span: start.merge(self.prev_span()),
            }));
        }

        let target = self.parse_place_from(name, start)?;
        self.expect(TokenKind::Assign, "`:=`")?;
        let value = self.parse_expr()?;
        self.finish_item()?;

        Ok(Stmt::Assign(Assignment {
            target,
            value,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `print (e1, …)? ;`  — parenthesized or bare expression list.
    fn parse_print_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Print, "`print`")?.span;

        let args = if self.eat(TokenKind::LParen) {
            let args = self.parse_arg_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            args
        } else if matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::End | TokenKind::Else | TokenKind::Eof
        ) {
            Vec::new()
        } else {
            let mut args = vec![self.parse_expr()?];
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
            args
        };

        self.finish_item()?;
        Ok(Stmt::Print(PrintStmt {
            args,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `if Expr then Body (else Body)? end`
    fn parse_if_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::If, "`if`")?.span;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then, "`then`")?;
        let then_body = self.parse_body()?;

        let else_body = if self.eat(TokenKind::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };

        self.expect(TokenKind::End, "`end`")?;

        Ok(Stmt::If(IfStmt {
            cond,
            then_body,
            else_body,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `while Expr loop Body end`
    fn parse_while_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::While, "`while`")?.span;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Loop, "`loop`")?;
        let body = self.parse_body()?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(Stmt::While(WhileStmt {
            cond,
            body,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `for NAME in Expr (.. Expr)? (reverse)? loop Body end`
    ///
    /// A `..` makes it a range loop; otherwise the expression names an
    /// array to iterate over.
    fn parse_for_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::For, "`for`")?.span;
        let (var, _) = self.expect_ident("a loop variable")?;
        self.expect(TokenKind::In, "`in`")?;

        let first = self.parse_expr()?;
        let source = if self.eat(TokenKind::Range) {
            let end = self.parse_expr()?;
            ForSource::Range { start: first, end }
        } else {
            ForSource::Each(first)
        };

        let reverse = self.eat(TokenKind::Reverse);

        self.expect(TokenKind::Loop, "`loop`")?;
        let body = self.parse_body()?;
        self.expect(TokenKind::End, "`end`")?;

        Ok(Stmt::For(ForStmt {
            var,
            source,
            reverse,
            body,
            span: start.merge(self.prev_span()),
        }))
    }

    /// `return Expr? ;`
    fn parse_return_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Return, "`return`")?.span;

        let value = if matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::End | TokenKind::Else | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_expr()?)
        };

        self.finish_item()?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: start.merge(self.prev_span()),
        }))
    }

    /// Comma-separated expressions, possibly empty (caller holds the
    /// closing bracket).
    pub(crate) fn parse_arg_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.kind(), TokenKind::RParen | TokenKind::RBracket) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }
}
