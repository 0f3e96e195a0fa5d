//! routc-sem - semantic analysis for the Rout language.
//!
//! Two passes over the parsed tree. Pass 1 records every top-level name
//! (variables, type aliases, routine signatures) without descending into
//! bodies, which is what makes forward routine references work. Pass 2
//! walks bodies with nested scopes, checking name resolution, call arity,
//! and return context.
//!
//! Problems are accumulated into a [`Handler`] rather than aborting: the
//! whole program is always walked, scopes always unwind to their initial
//! depth, and the first error (if any) is then promoted to a fatal
//! [`SemanticError`]. Warnings (unused variables) never halt compilation.

pub mod context;

#[cfg(test)]
mod edge_cases;

use thiserror::Error;

use routc_par::ast::*;
use routc_util::{Handler, Span, Symbol};

pub use context::{FxIndexMap, ParamSig, RoutineSig, SymbolContext, Symbols, VarEntry};

/// The first semantic error, promoted to a fatal failure after the walk.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} at {span}")]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

pub struct SemanticAnalyzer<'a> {
    context: SymbolContext,
    handler: &'a Handler,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            context: SymbolContext::new(),
            handler,
        }
    }

    /// Runs both passes. On success the symbol context collapses into the
    /// read-only [`Symbols`] view consumed by the code generator.
    pub fn analyze(mut self, program: &Program) -> Result<Symbols, SemanticError> {
        self.collect_top_level(program);

        for decl in &program.decls {
            self.check_decl(decl);
        }

        let globals = self.context.global_entries();
        self.warn_unused(&globals);

        debug_assert_eq!(self.context.depth(), 1, "scope stack must be restored");

        if let Some(first) = self.handler.first_error() {
            return Err(SemanticError {
                message: first.message,
                span: first.span,
            });
        }

        Ok(self.context.into_symbols())
    }

    // ------------------------------------------------------------------
    // Pass 1 — top-level names only, no bodies
    // ------------------------------------------------------------------

    fn collect_top_level(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(var) => {
                    let entry = VarEntry {
                        ty: var.ty.clone(),
                        span: var.span,
                        used: false,
                    };
                    if self.context.declare_var(var.name, entry).is_some() {
                        self.duplicate_var(var.name, var.span);
                    }
                },
                Decl::Type(alias) => {
                    if self
                        .context
                        .declare_type(alias.name, alias.aliased.clone())
                        .is_some()
                    {
                        self.handler.error(
                            format!("Type '{}' is already declared", alias.name),
                            alias.span,
                        );
                    }
                },
                Decl::Routine(routine) => {
                    let sig = RoutineSig {
                        name: routine.name,
                        params: routine
                            .params
                            .iter()
                            .map(|p| ParamSig {
                                name: p.name,
                                ty: p.ty.clone(),
                                by_ref: p.by_ref,
                            })
                            .collect(),
                        ret: routine.ret.clone(),
                        span: routine.span,
                    };
                    if self.context.declare_routine(sig).is_some() {
                        self.handler.error(
                            format!("Routine '{}' is already declared", routine.name),
                            routine.span,
                        );
                    }
                },
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 2 — full walk
    // ------------------------------------------------------------------

    fn check_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(var) => {
                // Top-level variables were declared in pass 1; only their
                // annotation and initializer need checking here.
                self.check_var_shape(var);
                if let Some(init) = &var.init {
                    self.check_expr(init);
                }
                if let Some(ty) = &var.ty {
                    self.check_type_expr(ty);
                }
            },
            Decl::Type(alias) => self.check_type_expr(&alias.aliased),
            Decl::Routine(routine) => self.check_routine(routine),
        }
    }

    fn check_routine(&mut self, routine: &RoutineDecl) {
        self.context.push_routine_scope(routine.name);

        for param in &routine.params {
            self.check_type_expr(&param.ty);
            let entry = VarEntry {
                ty: Some(param.ty.clone()),
                span: param.span,
                used: false,
            };
            if self.context.declare_var(param.name, entry).is_some() {
                self.duplicate_var(param.name, param.span);
            }
        }

        match &routine.body {
            RoutineBody::Block(body) => self.check_body(body),
            RoutineBody::Expr(expr) => self.check_expr(expr),
        }

        let entries = self.context.pop_routine_scope();
        self.warn_unused(&entries);
    }

    fn check_body(&mut self, body: &Body) {
        for item in body {
            match item {
                BodyItem::Decl(Decl::Var(var)) => {
                    // The initializer is checked before the name exists; a
                    // variable cannot refer to itself in its initializer.
                    if let Some(init) = &var.init {
                        self.check_expr(init);
                    }
                    if let Some(ty) = &var.ty {
                        self.check_type_expr(ty);
                    }
                    self.check_var_shape(var);

                    let entry = VarEntry {
                        ty: var.ty.clone(),
                        span: var.span,
                        used: false,
                    };
                    if self.context.declare_var(var.name, entry).is_some() {
                        self.duplicate_var(var.name, var.span);
                    }
                },
                BodyItem::Decl(Decl::Type(alias)) => {
                    self.check_type_expr(&alias.aliased);
                    if self
                        .context
                        .declare_type(alias.name, alias.aliased.clone())
                        .is_some()
                    {
                        self.handler.error(
                            format!("Type '{}' is already declared", alias.name),
                            alias.span,
                        );
                    }
                },
                BodyItem::Decl(Decl::Routine(nested)) => {
                    // The parser rejects this form; keep analysis total anyway.
                    self.handler.error(
                        format!(
                            "Routine '{}' must be declared at the top level",
                            nested.name
                        ),
                        nested.span,
                    );
                },
                BodyItem::Stmt(stmt) => self.check_stmt(stmt),
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign(assign) => {
                self.check_place(&assign.target);
                self.check_expr(&assign.value);
            },
            Stmt::Call(call) => self.check_call(call.name, &call.args, call.span),
            Stmt::Print(print) => {
                for arg in &print.args {
                    self.check_expr(arg);
                }
            },
            Stmt::Return(ret) => {
                if self.context.current_routine().is_none() {
                    self.handler.error("return outside of a routine", ret.span);
                }
                if let Some(value) = &ret.value {
                    self.check_expr(value);
                }
            },
            Stmt::If(if_stmt) => {
                self.check_expr(&if_stmt.cond);
                self.with_var_scope(|this| this.check_body(&if_stmt.then_body));
                if let Some(else_body) = &if_stmt.else_body {
                    self.with_var_scope(|this| this.check_body(else_body));
                }
            },
            Stmt::While(while_stmt) => {
                self.check_expr(&while_stmt.cond);
                self.context.enter_loop();
                self.with_var_scope(|this| this.check_body(&while_stmt.body));
                self.context.exit_loop();
            },
            Stmt::For(for_stmt) => self.check_for(for_stmt),
        }
    }

    fn check_for(&mut self, for_stmt: &ForStmt) {
        // Bounds and iteration source are checked before the loop variable
        // exists.
        match &for_stmt.source {
            ForSource::Range { start, end } => {
                self.check_expr(start);
                self.check_expr(end);
            },
            ForSource::Each(source) => self.check_for_each_source(source),
        }

        self.context.push_var_scope();
        self.context.declare_var(
            for_stmt.var,
            VarEntry {
                ty: None,
                span: for_stmt.span,
                used: false,
            },
        );
        self.context.enter_loop();
        self.check_body(&for_stmt.body);
        self.context.exit_loop();
        let entries = self.context.pop_var_scope();
        self.warn_unused(&entries);
    }

    /// A for-each iterates an array variable; the source must be a bare
    /// identifier.
    fn check_for_each_source(&mut self, source: &Expr) {
        let Expr::Ident(name, span) = source else {
            self.handler.error(
                "for-each source must name an array variable",
                source.span(),
            );
            return;
        };

        if self.context.lookup_var(*name).is_none() {
            self.handler
                .error(format!("Variable {name} is not declared"), *span);
            return;
        }

        if let Some(declared) = self.context.var_type(*name).cloned() {
            match self.context.resolve_type(&declared) {
                Some(TypeExpr::Array { .. }) | None => {},
                Some(_) => self
                    .handler
                    .error(format!("Variable {name} is not an array"), *span),
            }
        }
    }

    fn check_place(&mut self, place: &Place) {
        if self.context.lookup_var(place.base).is_none() {
            self.handler.error(
                format!("Variable {} is not declared", place.base),
                place.span,
            );
        }
        for access in &place.accesses {
            if let Access::Index(index, _) = access {
                self.check_expr(index);
            }
        }
    }

    fn check_call(&mut self, name: Symbol, args: &[Expr], span: Span) {
        match self.context.lookup_routine(name) {
            None => {
                self.handler
                    .error(format!("Routine {name} is not declared"), span);
            },
            Some(sig) => {
                let expected = sig.params.len();
                if expected != args.len() {
                    self.handler.error(
                        format!(
                            "Routine {name} expects {expected} argument(s), found {}",
                            args.len()
                        ),
                        span,
                    );
                }
            },
        }
        for arg in args {
            self.check_expr(arg);
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(..) | Expr::Real(..) | Expr::Bool(..) | Expr::Str(..) => {},
            Expr::Ident(name, span) => {
                if self.context.lookup_var(*name).is_none() {
                    self.handler
                        .error(format!("Variable {name} is not declared"), *span);
                }
            },
            Expr::Place(place) => self.check_place(place),
            Expr::Call(call) => self.check_call(call.name, &call.args, call.span),
            Expr::Binary(binary) => {
                self.check_expr(&binary.left);
                self.check_expr(&binary.right);
            },
            Expr::Unary(unary) => self.check_expr(&unary.operand),
            Expr::ArrayLit(lit) => {
                for element in &lit.elements {
                    self.check_expr(element);
                }
            },
            Expr::RecordLit(lit) => {
                for (_, value) in &lit.fields {
                    self.check_expr(value);
                }
            },
        }
    }

    fn check_type_expr(&mut self, ty: &TypeExpr) {
        match ty {
            TypeExpr::Primitive(..) => {},
            TypeExpr::Array { size, elem, .. } => {
                if let Some(size) = size {
                    self.check_expr(size);
                }
                self.check_type_expr(elem);
            },
            TypeExpr::Record { fields, .. } => {
                let mut seen = Vec::new();
                for field in fields {
                    if seen.contains(&field.name) {
                        self.handler.error(
                            format!("Field '{}' is already declared in this record", field.name),
                            field.span,
                        );
                    }
                    seen.push(field.name);
                    if let Some(field_ty) = &field.ty {
                        self.check_type_expr(field_ty);
                    }
                    if let Some(init) = &field.init {
                        self.check_expr(init);
                    }
                    if field.ty.is_none() && field.init.is_none() {
                        self.needs_type_or_init(field.name, field.span);
                    }
                }
            },
            TypeExpr::Named(name, span) => {
                if self.context.lookup_type(*name).is_none() {
                    self.handler
                        .error(format!("Type {name} is not declared"), *span);
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// A declaration with neither annotation nor initializer has no type
    /// to give the variable.
    fn check_var_shape(&mut self, var: &VarDecl) {
        if var.ty.is_none() && var.init.is_none() {
            self.needs_type_or_init(var.name, var.span);
        }
    }

    fn needs_type_or_init(&mut self, name: Symbol, span: Span) {
        self.handler.error(
            format!("Variable '{name}' needs a type or an initializer"),
            span,
        );
    }

    fn duplicate_var(&mut self, name: Symbol, span: Span) {
        self.handler.error(
            format!("Variable '{name}' is already declared in this scope"),
            span,
        );
    }

    fn with_var_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.context.push_var_scope();
        f(self);
        let entries = self.context.pop_var_scope();
        self.warn_unused(&entries);
    }

    fn warn_unused(&mut self, entries: &[(Symbol, VarEntry)]) {
        for (name, entry) in entries {
            if !entry.used {
                self.handler.emit(routc_util::Diagnostic::warning(
                    format!(
                        "Variable '{name}' declared at {}:{} is never used",
                        entry.span.line, entry.span.column
                    ),
                    entry.span,
                ));
            }
        }
    }

    /// Scope depth of the underlying context, exposed for invariants.
    pub fn depth(&self) -> usize {
        self.context.depth()
    }
}

/// Convenience entry point. The caller owns the handler so it can report
/// warnings after analysis succeeds.
pub fn analyze(program: &Program, handler: &Handler) -> Result<Symbols, SemanticError> {
    SemanticAnalyzer::new(handler).analyze(program)
}
