//! Function, statement, and expression emission.
//!
//! Expressions lower to a WASM value stack. The effective numeric type of
//! a binary operation is f64 when either side infers to f64, else i32;
//! comparisons yield i32 booleans. Control flow uses `block`/`loop` pairs
//! with function-unique labels.

use routc_par::ast::*;
use routc_util::Symbol;

use crate::error::{GenError, GenResult};
use crate::types::{field_offset, kind_of_type, synthesize_type, wat_f64, Kind};
use crate::{Generator, VarInfo};

impl Generator<'_> {
    /// Resets all per-function state and pins the return type.
    pub(crate) fn begin_function(&mut self, ret: Option<&TypeExpr>) {
        self.locals.clear();
        self.local_types.clear();
        self.helper_locals.clear();
        self.label_count = 0;
        self.foreach_count = 0;
        self.needs_fscratch = false;
        self.code.clear();
        let resolved = ret.map(|ty| self.resolve_ty(ty));
        self.ret_kind = resolved.as_ref().map(kind_of_type);
        self.ret_ty = resolved;
    }

    pub(crate) fn emit_routine(&mut self, routine: &RoutineDecl) -> GenResult<String> {
        self.begin_function(routine.ret.as_ref());

        for param in &routine.params {
            let ty = self.resolve_ty(&param.ty);
            let kind = kind_of_type(&ty);
            self.locals.insert(
                param.name,
                VarInfo {
                    kind,
                    ty: Some(ty),
                    size_twin: false,
                },
            );
        }
        let param_count = routine.params.len();

        if let RoutineBody::Block(body) = &routine.body {
            self.collect_locals_body(body);
        }
        // The collection pass consumed the for-each counter; emission
        // numbers its helpers the same way, so restart it.
        self.foreach_count = 0;

        match &routine.body {
            RoutineBody::Block(body) => {
                self.emit_body(body)?;
                // A result-typed function must not fall off the end with
                // an empty stack; the default is dead code when every
                // path returns.
                match self.ret_kind {
                    Some(Kind::Real) => self.push("f64.const 0.0"),
                    Some(_) => self.push("i32.const 0"),
                    None => {},
                }
            },
            RoutineBody::Expr(expr) => {
                let ret_ty = self.ret_ty.clone();
                match self.ret_kind {
                    Some(ret_kind) => {
                        let kind = self.emit_expr(expr, ret_ty.as_ref())?;
                        self.emit_convert(kind, ret_kind);
                    },
                    None => {
                        if let Some(_pushed) = self.emit_expr_maybe_void(expr)? {
                            self.push("drop");
                        }
                    },
                }
            },
        }

        let mut out = format!("  (func ${}", routine.name);
        for param in &routine.params {
            let kind = self.locals[&param.name].kind;
            out.push_str(&format!(" (param ${} {})", param.name, kind.wasm()));
        }
        if let Some(kind) = self.ret_kind {
            out.push_str(&format!(" (result {})", kind.wasm()));
        }
        out.push('\n');

        for (name, info) in self.locals.iter().skip(param_count) {
            out.push_str(&format!("    (local ${name} {})\n", info.kind.wasm()));
        }
        for helper in &self.helper_locals {
            out.push_str(&format!("    (local {helper} i32)\n"));
        }
        if !self.locals.contains_key(&Symbol::intern("temp")) {
            out.push_str("    (local $temp i32)\n");
        }
        if self.needs_fscratch {
            out.push_str("    (local $ftmp0 f64)\n    (local $ftmp1 f64)\n");
        }

        out.push_str(&self.code);
        out.push_str("  )\n");
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Locals collection
    // ------------------------------------------------------------------

    /// Gathers every variable declared anywhere in the body, including
    /// loop variables and the per-loop for-each helpers. First declaration
    /// of a name wins; sibling scopes reusing a name share the slot.
    fn collect_locals_body(&mut self, body: &Body) {
        for item in body {
            match item {
                BodyItem::Decl(Decl::Var(var)) => {
                    let structural = var
                        .ty
                        .as_ref()
                        .map(|ty| self.resolve_ty(ty))
                        .or_else(|| var.init.as_ref().and_then(synthesize_type));
                    let kind = structural.as_ref().map(kind_of_type).unwrap_or(Kind::Int);
                    if !self.locals.contains_key(&var.name) {
                        self.locals.insert(
                            var.name,
                            VarInfo {
                                kind,
                                ty: structural,
                                size_twin: false,
                            },
                        );
                    }
                },
                BodyItem::Decl(Decl::Type(alias)) => {
                    self.local_types.insert(alias.name, alias.aliased.clone());
                },
                BodyItem::Decl(Decl::Routine(_)) => {},
                BodyItem::Stmt(stmt) => self.collect_locals_stmt(stmt),
            }
        }
    }

    fn collect_locals_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(if_stmt) => {
                self.collect_locals_body(&if_stmt.then_body);
                if let Some(else_body) = &if_stmt.else_body {
                    self.collect_locals_body(else_body);
                }
            },
            Stmt::While(while_stmt) => self.collect_locals_body(&while_stmt.body),
            Stmt::For(for_stmt) => {
                match &for_stmt.source {
                    ForSource::Range { .. } => {
                        if !self.locals.contains_key(&for_stmt.var) {
                            self.locals.insert(
                                for_stmt.var,
                                VarInfo {
                                    kind: Kind::Int,
                                    ty: None,
                                    size_twin: false,
                                },
                            );
                        }
                    },
                    ForSource::Each(source) => {
                        let n = self.foreach_count;
                        self.foreach_count += 1;
                        self.helper_locals.push(format!("$fe_idx_{n}"));
                        self.helper_locals.push(format!("$fe_size_{n}"));

                        let elem = self.foreach_elem_type(source);
                        let kind = elem.as_ref().map(kind_of_type).unwrap_or(Kind::Int);
                        if !self.locals.contains_key(&for_stmt.var) {
                            self.locals.insert(
                                for_stmt.var,
                                VarInfo {
                                    kind,
                                    ty: elem,
                                    size_twin: false,
                                },
                            );
                        }
                    },
                }
                self.collect_locals_body(&for_stmt.body);
            },
            _ => {},
        }
    }

    /// Element type of the array a for-each walks, when the source
    /// variable's type is known.
    fn foreach_elem_type(&self, source: &Expr) -> Option<TypeExpr> {
        let Expr::Ident(name, _) = source else {
            return None;
        };
        let (info, _) = self.var_info(*name)?;
        let ty = info.ty.clone()?;
        match self.resolve_ty(&ty) {
            TypeExpr::Array { elem, .. } => Some(self.resolve_ty(&elem)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub(crate) fn emit_body(&mut self, body: &Body) -> GenResult<()> {
        for item in body {
            match item {
                BodyItem::Decl(Decl::Var(var)) => self.emit_local_var_decl(var)?,
                BodyItem::Decl(Decl::Type(alias)) => {
                    self.local_types.insert(alias.name, alias.aliased.clone());
                },
                BodyItem::Decl(Decl::Routine(_)) => {},
                BodyItem::Stmt(stmt) => self.emit_stmt(stmt)?,
            }
        }
        Ok(())
    }

    fn emit_local_var_decl(&mut self, var: &VarDecl) -> GenResult<()> {
        let info = self.locals[&var.name].clone();

        if let Some(init) = &var.init {
            let kind = self.emit_expr(init, info.ty.as_ref())?;
            self.emit_convert(kind, info.kind);
            self.push(&format!("local.set ${}", var.name));
            return Ok(());
        }

        // Declared aggregates without an initializer get fixed storage so
        // later element and field writes land somewhere real.
        match &info.ty {
            Some(TypeExpr::Array { size, .. }) => {
                if let Some(Expr::Int(n, _)) = size.as_deref() {
                    let n = (*n).max(0) as u32;
                    let addr = self.alloc(4 + 4 * n);
                    self.push(&format!("i32.const {addr}"));
                    self.push(&format!("i32.const {n}"));
                    self.push("i32.store");
                    self.push(&format!("i32.const {addr}"));
                    self.push(&format!("local.set ${}", var.name));
                }
            },
            Some(TypeExpr::Record { fields, .. }) => {
                let addr = self.alloc(4 * fields.len() as u32);
                self.push(&format!("i32.const {addr}"));
                self.push(&format!("local.set ${}", var.name));
            },
            _ => {}, // scalars default to zero
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> GenResult<()> {
        match stmt {
            Stmt::Assign(assign) => self.emit_assign(assign),
            Stmt::Call(call) => {
                let produced = self.emit_call(call.name, &call.args, call.span)?;
                if produced.is_some() {
                    self.push("drop");
                }
                Ok(())
            },
            Stmt::Print(print) => {
                for arg in &print.args {
                    let kind = self.emit_expr(arg, None)?;
                    self.push(&format!("call {}", kind.print_import()));
                }
                self.push("call $printNewline");
                Ok(())
            },
            Stmt::Return(ret) => self.emit_return(ret),
            Stmt::If(if_stmt) => {
                self.emit_expr(&if_stmt.cond, None)?;
                self.push("if");
                self.emit_body(&if_stmt.then_body)?;
                if let Some(else_body) = &if_stmt.else_body {
                    self.push("else");
                    self.emit_body(else_body)?;
                }
                self.push("end");
                Ok(())
            },
            Stmt::While(while_stmt) => {
                let n = self.next_label();
                self.push(&format!("block $L{n}_end"));
                self.push(&format!("loop $L{n}_start"));
                self.emit_expr(&while_stmt.cond, None)?;
                self.push("i32.eqz");
                self.push(&format!("br_if $L{n}_end"));
                self.emit_body(&while_stmt.body)?;
                self.push(&format!("br $L{n}_start"));
                self.push("end");
                self.push("end");
                Ok(())
            },
            Stmt::For(for_stmt) => match &for_stmt.source {
                ForSource::Range { start, end } => self.emit_for_range(for_stmt, start, end),
                ForSource::Each(source) => self.emit_for_each(for_stmt, source),
            },
        }
    }

    fn emit_assign(&mut self, assign: &Assignment) -> GenResult<()> {
        if assign.target.accesses.is_empty() {
            let name = assign.target.base;
            let (info, is_global) = match self.var_info(name) {
                Some((info, is_global)) => (info.clone(), is_global),
                None => {
                    return Err(GenError::UnknownVariable {
                        name: name.as_str().to_string(),
                        span: assign.target.span,
                    })
                },
            };

            let kind = self.emit_expr(&assign.value, info.ty.as_ref())?;
            self.emit_convert(kind, info.kind);
            let set = if is_global { "global.set" } else { "local.set" };
            self.push(&format!("{set} ${name}"));

            if is_global && info.size_twin {
                self.emit_size_twin_update(name, &assign.value);
            }
            return Ok(());
        }

        // Compound target: RHS into $temp, then address, then store.
        let kind = self.emit_expr(&assign.value, None)?;
        if kind == Kind::Real {
            self.push("i32.trunc_f64_s");
        }
        self.push("local.set $temp");
        self.emit_place_addr(&assign.target)?;
        self.push("local.get $temp");
        self.push("i32.store");
        Ok(())
    }

    /// Keeps `$name_size` in step with a whole-array assignment.
    fn emit_size_twin_update(&mut self, name: Symbol, value: &Expr) {
        match value {
            Expr::ArrayLit(lit) => {
                self.push(&format!("i32.const {}", lit.elements.len()));
                self.push(&format!("global.set ${name}_size"));
            },
            Expr::Ident(other, _) => {
                if self
                    .var_info(*other)
                    .map(|(info, is_global)| info.size_twin && is_global)
                    == Some(true)
                {
                    self.push(&format!("global.get ${other}_size"));
                    self.push(&format!("global.set ${name}_size"));
                }
            },
            _ => {
                // Read the element count back out of the header.
                self.push(&format!("global.get ${name}"));
                self.push("i32.load");
                self.push(&format!("global.set ${name}_size"));
            },
        }
    }

    fn emit_return(&mut self, ret: &ReturnStmt) -> GenResult<()> {
        match (&ret.value, self.ret_kind) {
            (Some(value), Some(ret_kind)) => {
                let ret_ty = self.ret_ty.clone();
                let kind = self.emit_expr(value, ret_ty.as_ref())?;
                self.emit_convert(kind, ret_kind);
            },
            (Some(value), None) => {
                if self.emit_expr_maybe_void(value)?.is_some() {
                    self.push("drop");
                }
            },
            (None, Some(Kind::Real)) => self.push("f64.const 0.0"),
            (None, Some(_)) => self.push("i32.const 0"),
            (None, None) => {},
        }
        self.push("return");
        Ok(())
    }

    fn emit_for_range(&mut self, for_stmt: &ForStmt, start: &Expr, end: &Expr) -> GenResult<()> {
        let n = self.next_label();
        let var = for_stmt.var;

        let kind = self.emit_expr(start, None)?;
        self.emit_convert(kind, Kind::Int);
        self.push(&format!("local.set ${var}"));

        self.push(&format!("block $L{n}_end"));
        self.push(&format!("loop $L{n}_start"));
        self.push(&format!("local.get ${var}"));
        let kind = self.emit_expr(end, None)?;
        self.emit_convert(kind, Kind::Int);
        self.push(if for_stmt.reverse {
            "i32.lt_s"
        } else {
            "i32.gt_s"
        });
        self.push(&format!("br_if $L{n}_end"));

        self.emit_body(&for_stmt.body)?;

        self.push(&format!("local.get ${var}"));
        self.push("i32.const 1");
        self.push(if for_stmt.reverse { "i32.sub" } else { "i32.add" });
        self.push(&format!("local.set ${var}"));
        self.push(&format!("br $L{n}_start"));
        self.push("end");
        self.push("end");
        Ok(())
    }

    fn emit_for_each(&mut self, for_stmt: &ForStmt, source: &Expr) -> GenResult<()> {
        let Expr::Ident(array, _) = source else {
            return Err(GenError::NotAnArray {
                span: source.span(),
            });
        };
        let getter = match self.var_info(*array) {
            Some((_, true)) => format!("global.get ${array}"),
            Some((_, false)) => format!("local.get ${array}"),
            None => {
                return Err(GenError::UnknownVariable {
                    name: array.as_str().to_string(),
                    span: source.span(),
                })
            },
        };
        let var_kind = self
            .locals
            .get(&for_stmt.var)
            .map(|info| info.kind)
            .unwrap_or(Kind::Int);

        let n = self.next_label();
        let fe = self.foreach_count;
        self.foreach_count += 1;

        self.push(&getter);
        self.push("i32.load");
        self.push(&format!("local.set $fe_size_{fe}"));
        self.push("i32.const 1");
        self.push(&format!("local.set $fe_idx_{fe}"));

        self.push(&format!("block $L{n}_end"));
        self.push(&format!("loop $L{n}_start"));
        self.push(&format!("local.get $fe_idx_{fe}"));
        self.push(&format!("local.get $fe_size_{fe}"));
        self.push("i32.gt_s");
        self.push(&format!("br_if $L{n}_end"));

        // Element at base + 4 + (idx - 1) * 4 into the loop variable.
        self.push(&getter);
        self.push(&format!("local.get $fe_idx_{fe}"));
        self.push("i32.const 1");
        self.push("i32.sub");
        self.push("i32.const 4");
        self.push("i32.mul");
        self.push("i32.add");
        self.push("i32.const 4");
        self.push("i32.add");
        self.push("i32.load");
        if var_kind == Kind::Real {
            self.push("f64.convert_i32_s");
        }
        self.push(&format!("local.set ${}", for_stmt.var));

        self.emit_body(&for_stmt.body)?;

        self.push(&format!("local.get $fe_idx_{fe}"));
        self.push("i32.const 1");
        self.push("i32.add");
        self.push(&format!("local.set $fe_idx_{fe}"));
        self.push(&format!("br $L{n}_start"));
        self.push("end");
        self.push("end");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Emits an expression, leaving exactly one value on the stack.
    /// `expected` propagates the declared type of the destination so
    /// record literals can adopt their declared field layout.
    pub(crate) fn emit_expr(
        &mut self,
        expr: &Expr,
        expected: Option<&TypeExpr>,
    ) -> GenResult<Kind> {
        match expr {
            Expr::Int(value, _) => {
                self.push(&format!("i32.const {value}"));
                Ok(Kind::Int)
            },
            Expr::Real(value, _) => {
                self.push(&format!("f64.const {}", wat_f64(*value)));
                Ok(Kind::Real)
            },
            Expr::Bool(value, _) => {
                self.push(&format!("i32.const {}", *value as i32));
                Ok(Kind::Bool)
            },
            Expr::Str(value, _) => {
                let offset = self.string_offset(*value);
                self.push(&format!("i32.const {offset}"));
                Ok(Kind::Str)
            },
            Expr::Ident(name, span) => {
                let (info, is_global) = match self.var_info(*name) {
                    Some((info, is_global)) => (info.kind, is_global),
                    None => {
                        return Err(GenError::UnknownVariable {
                            name: name.as_str().to_string(),
                            span: *span,
                        })
                    },
                };
                let get = if is_global { "global.get" } else { "local.get" };
                self.push(&format!("{get} ${name}"));
                Ok(info)
            },
            Expr::Place(place) => self.emit_place_read(place),
            Expr::Call(call) => Ok(self
                .emit_call(call.name, &call.args, call.span)?
                .unwrap_or(Kind::Int)),
            Expr::Unary(unary) => match unary.op {
                UnOp::Not => {
                    self.emit_expr(&unary.operand, None)?;
                    self.push("i32.eqz");
                    Ok(Kind::Bool)
                },
                UnOp::Neg => {
                    let kind = self.emit_expr(&unary.operand, None)?;
                    if kind == Kind::Real {
                        self.push("f64.neg");
                        Ok(Kind::Real)
                    } else {
                        self.push("i32.const -1");
                        self.push("i32.mul");
                        Ok(Kind::Int)
                    }
                },
            },
            Expr::Binary(binary) => self.emit_binary(binary),
            Expr::ArrayLit(lit) => self.emit_array_lit(lit, expected),
            Expr::RecordLit(lit) => self.emit_record_lit(lit, expected),
        }
    }

    /// Like [`Self::emit_expr`] but returns `None` when the expression is
    /// a call to a routine with no return value (which pushes nothing).
    fn emit_expr_maybe_void(&mut self, expr: &Expr) -> GenResult<Option<Kind>> {
        if let Expr::Call(call) = expr {
            return self.emit_call(call.name, &call.args, call.span);
        }
        self.emit_expr(expr, None).map(Some)
    }

    fn emit_binary(&mut self, binary: &BinaryExpr) -> GenResult<Kind> {
        use BinOp::*;

        let left_kind = self.infer_kind(&binary.left);
        let right_kind = self.infer_kind(&binary.right);
        let real = left_kind == Kind::Real || right_kind == Kind::Real;

        match binary.op {
            And | Or | Xor => {
                let lk = self.emit_expr(&binary.left, None)?;
                self.emit_convert(lk, Kind::Int);
                let rk = self.emit_expr(&binary.right, None)?;
                self.emit_convert(rk, Kind::Int);
                self.push(match binary.op {
                    And => "i32.and",
                    Or => "i32.or",
                    _ => "i32.xor",
                });
                Ok(Kind::Bool)
            },
            Mod if real => {
                // No f64.rem in WASM: a - trunc(a/b) * b.
                self.needs_fscratch = true;
                let lk = self.emit_expr(&binary.left, None)?;
                self.emit_convert(lk, Kind::Real);
                self.push("local.set $ftmp0");
                let rk = self.emit_expr(&binary.right, None)?;
                self.emit_convert(rk, Kind::Real);
                self.push("local.set $ftmp1");
                self.push("local.get $ftmp0");
                self.push("local.get $ftmp0");
                self.push("local.get $ftmp1");
                self.push("f64.div");
                self.push("f64.trunc");
                self.push("local.get $ftmp1");
                self.push("f64.mul");
                self.push("f64.sub");
                Ok(Kind::Real)
            },
            _ if real => {
                let lk = self.emit_expr(&binary.left, None)?;
                self.emit_convert(lk, Kind::Real);
                let rk = self.emit_expr(&binary.right, None)?;
                self.emit_convert(rk, Kind::Real);
                let (instr, kind) = match binary.op {
                    Add => ("f64.add", Kind::Real),
                    Sub => ("f64.sub", Kind::Real),
                    Mul => ("f64.mul", Kind::Real),
                    Div => ("f64.div", Kind::Real),
                    Lt => ("f64.lt", Kind::Bool),
                    Le => ("f64.le", Kind::Bool),
                    Gt => ("f64.gt", Kind::Bool),
                    Ge => ("f64.ge", Kind::Bool),
                    Eq => ("f64.eq", Kind::Bool),
                    Ne => ("f64.ne", Kind::Bool),
                    _ => unreachable!("handled above"),
                };
                self.push(instr);
                Ok(kind)
            },
            _ => {
                self.emit_expr(&binary.left, None)?;
                self.emit_expr(&binary.right, None)?;
                let (instr, kind) = match binary.op {
                    Add => ("i32.add", Kind::Int),
                    Sub => ("i32.sub", Kind::Int),
                    Mul => ("i32.mul", Kind::Int),
                    Div => ("i32.div_s", Kind::Int),
                    Mod => ("i32.rem_s", Kind::Int),
                    Lt => ("i32.lt_s", Kind::Bool),
                    Le => ("i32.le_s", Kind::Bool),
                    Gt => ("i32.gt_s", Kind::Bool),
                    Ge => ("i32.ge_s", Kind::Bool),
                    Eq => ("i32.eq", Kind::Bool),
                    Ne => ("i32.ne", Kind::Bool),
                    And | Or | Xor => unreachable!("handled above"),
                };
                self.push(instr);
                Ok(kind)
            },
        }
    }

    fn emit_call(
        &mut self,
        name: Symbol,
        args: &[Expr],
        span: routc_util::Span,
    ) -> GenResult<Option<Kind>> {
        let sig = match self.symbols.routines.get(&name) {
            Some(sig) => sig.clone(),
            None => {
                return Err(GenError::UnknownRoutine {
                    name: name.as_str().to_string(),
                    span,
                })
            },
        };

        for (arg, param) in args.iter().zip(&sig.params) {
            let param_ty = self.resolve_ty(&param.ty);
            let param_kind = kind_of_type(&param_ty);
            let kind = self.emit_expr(arg, Some(&param_ty))?;
            self.emit_convert(kind, param_kind);
        }
        self.push(&format!("call ${name}"));

        Ok(sig
            .ret
            .as_ref()
            .map(|ty| kind_of_type(&self.resolve_ty(ty))))
    }

    fn emit_array_lit(&mut self, lit: &ArrayLit, expected: Option<&TypeExpr>) -> GenResult<Kind> {
        let elem_ty = match expected.map(|ty| self.resolve_ty(ty)) {
            Some(TypeExpr::Array { elem, .. }) => Some(self.resolve_ty(&elem)),
            _ => None,
        };

        let count = lit.elements.len() as u32;
        let addr = self.alloc(4 + 4 * count);

        self.push(&format!("i32.const {addr}"));
        self.push(&format!("i32.const {count}"));
        self.push("i32.store");

        for (index, element) in lit.elements.iter().enumerate() {
            self.push(&format!("i32.const {}", addr + 4 + 4 * index as u32));
            let kind = self.emit_expr(element, elem_ty.as_ref())?;
            if kind == Kind::Real {
                self.push("i32.trunc_f64_s");
            }
            self.push("i32.store");
        }

        self.push(&format!("i32.const {addr}"));
        Ok(Kind::Ptr)
    }

    fn emit_record_lit(
        &mut self,
        lit: &RecordLit,
        expected: Option<&TypeExpr>,
    ) -> GenResult<Kind> {
        // Offsets come from the declared field order when the destination
        // type is known; a bare literal falls back to its own order.
        let layout = match expected.map(|ty| self.resolve_ty(ty)) {
            Some(TypeExpr::Record { fields, .. }) => fields,
            _ => match synthesize_type(&Expr::RecordLit(lit.clone())) {
                Some(TypeExpr::Record { fields, .. }) => fields,
                _ => {
                    return Err(GenError::UnknownRecordLayout { span: lit.span });
                },
            },
        };

        let addr = self.alloc(4 * layout.len() as u32);

        for (name, value) in &lit.fields {
            let offset = field_offset(&layout, *name).ok_or(GenError::UnknownField {
                field: name.as_str().to_string(),
                span: value.span(),
            })?;
            let field_ty = layout
                .iter()
                .find(|f| f.name == *name)
                .and_then(|f| f.ty.clone());

            self.push(&format!("i32.const {}", addr + offset));
            let kind = self.emit_expr(value, field_ty.as_ref())?;
            if kind == Kind::Real {
                self.push("i32.trunc_f64_s");
            }
            self.push("i32.store");
        }

        self.push(&format!("i32.const {addr}"));
        Ok(Kind::Ptr)
    }

    // ------------------------------------------------------------------
    // Places
    // ------------------------------------------------------------------

    fn emit_place_read(&mut self, place: &Place) -> GenResult<Kind> {
        let kind = self.emit_place_addr(place)?;
        self.push("i32.load");
        if kind == Kind::Real {
            self.push("f64.convert_i32_s");
        }
        Ok(kind)
    }

    /// Emits the address of a place and returns the kind of the value
    /// stored there. `base.size` addresses the array header word itself.
    fn emit_place_addr(&mut self, place: &Place) -> GenResult<Kind> {
        let (info, is_global) = match self.var_info(place.base) {
            Some((info, is_global)) => (info.clone(), is_global),
            None => {
                return Err(GenError::UnknownVariable {
                    name: place.base.as_str().to_string(),
                    span: place.span,
                })
            },
        };
        let get = if is_global { "global.get" } else { "local.get" };
        self.push(&format!("{get} ${}", place.base));

        let mut current = info.ty.map(|ty| self.resolve_ty(&ty));

        for access in &place.accesses {
            match access {
                Access::Field(field, span) => match &current {
                    Some(TypeExpr::Array { .. }) if field.as_str() == "size" => {
                        // Address of the header word: the base pointer.
                        current = None;
                        continue;
                    },
                    Some(TypeExpr::Record { fields, .. }) => {
                        let offset =
                            field_offset(fields, *field).ok_or(GenError::UnknownField {
                                field: field.as_str().to_string(),
                                span: *span,
                            })?;
                        if offset != 0 {
                            self.push(&format!("i32.const {offset}"));
                            self.push("i32.add");
                        }
                        let field_ty = fields
                            .iter()
                            .find(|f| f.name == *field)
                            .and_then(|f| f.ty.clone());
                        current = field_ty.map(|ty| self.resolve_ty(&ty));
                    },
                    _ => return Err(GenError::NotARecord { span: *span }),
                },
                Access::Index(index, span) => match &current {
                    Some(TypeExpr::Array { elem, .. }) => {
                        let elem = self.resolve_ty(elem);
                        let kind = self.emit_expr(index, None)?;
                        self.emit_convert(kind, Kind::Int);
                        // base + 4 + (index - 1) * 4, arrays are 1-indexed
                        self.push("i32.const 1");
                        self.push("i32.sub");
                        self.push("i32.const 4");
                        self.push("i32.mul");
                        self.push("i32.add");
                        self.push("i32.const 4");
                        self.push("i32.add");
                        current = Some(elem);
                    },
                    _ => return Err(GenError::NotAnArray { span: *span }),
                },
            }
        }

        Ok(current.as_ref().map(kind_of_type).unwrap_or(Kind::Int))
    }

    // ------------------------------------------------------------------
    // Inference (no emission)
    // ------------------------------------------------------------------

    /// Static kind of an expression, used to pick operand widths before
    /// emission.
    pub(crate) fn infer_kind(&self, expr: &Expr) -> Kind {
        match expr {
            Expr::Int(..) => Kind::Int,
            Expr::Real(..) => Kind::Real,
            Expr::Bool(..) => Kind::Bool,
            Expr::Str(..) => Kind::Str,
            Expr::Ident(name, _) => self
                .var_info(*name)
                .map(|(info, _)| info.kind)
                .unwrap_or(Kind::Int),
            Expr::Place(place) => self.place_kind(place),
            Expr::Call(call) => self
                .symbols
                .routines
                .get(&call.name)
                .and_then(|sig| sig.ret.as_ref())
                .map(|ty| kind_of_type(&self.resolve_ty(ty)))
                .unwrap_or(Kind::Int),
            Expr::Unary(unary) => match unary.op {
                UnOp::Not => Kind::Bool,
                UnOp::Neg => self.infer_kind(&unary.operand),
            },
            Expr::Binary(binary) => match binary.op {
                BinOp::And
                | BinOp::Or
                | BinOp::Xor
                | BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge => Kind::Bool,
                _ => {
                    if self.infer_kind(&binary.left) == Kind::Real
                        || self.infer_kind(&binary.right) == Kind::Real
                    {
                        Kind::Real
                    } else {
                        Kind::Int
                    }
                },
            },
            Expr::ArrayLit(_) | Expr::RecordLit(_) => Kind::Ptr,
        }
    }

    fn place_kind(&self, place: &Place) -> Kind {
        let Some((info, _)) = self.var_info(place.base) else {
            return Kind::Int;
        };
        let mut current = info.ty.clone().map(|ty| self.resolve_ty(&ty));

        for access in &place.accesses {
            match access {
                Access::Field(field, _) => match &current {
                    Some(TypeExpr::Array { .. }) if field.as_str() == "size" => {
                        return Kind::Int;
                    },
                    Some(TypeExpr::Record { fields, .. }) => {
                        current = fields
                            .iter()
                            .find(|f| f.name == *field)
                            .and_then(|f| f.ty.clone())
                            .map(|ty| self.resolve_ty(&ty));
                    },
                    _ => return Kind::Int,
                },
                Access::Index(_, _) => match &current {
                    Some(TypeExpr::Array { elem, .. }) => {
                        current = Some(self.resolve_ty(elem));
                    },
                    _ => return Kind::Int,
                },
            }
        }

        current.as_ref().map(kind_of_type).unwrap_or(Kind::Int)
    }

    // ------------------------------------------------------------------
    // Small helpers
    // ------------------------------------------------------------------

    /// Numeric conversion between stack kinds; same-width kinds need none.
    pub(crate) fn emit_convert(&mut self, from: Kind, to: Kind) {
        match (from, to) {
            (Kind::Real, Kind::Real) => {},
            (Kind::Real, _) => self.push("i32.trunc_f64_s"),
            (_, Kind::Real) => self.push("f64.convert_i32_s"),
            _ => {},
        }
    }

    pub(crate) fn push(&mut self, line: &str) {
        self.code.push_str("    ");
        self.code.push_str(line);
        self.code.push('\n');
    }

    fn next_label(&mut self) -> u32 {
        let n = self.label_count;
        self.label_count += 1;
        n
    }
}
