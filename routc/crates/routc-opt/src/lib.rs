//! routc-opt - AST-to-AST optimizer.
//!
//! One bottom-up pass over the checked tree, applying:
//!
//! 1. constant folding on binary expressions (two's-complement wrapping
//!    i32 arithmetic, int/real promotion, real and integer comparisons,
//!    boolean `and`/`or` and `=`/`/=`),
//! 2. constant folding on unary expressions (`not` of a boolean literal,
//!    double negation),
//! 3. if-simplification when the condition folds to a boolean literal,
//! 4. removal of body items following a `return`.
//!
//! Division and modulo by a zero literal are left alone, as is
//! `i32::MIN / -1` (both trap at run time; folding would change behavior).
//! `xor` is never folded. Strict bottom-up order means one pass reaches a
//! fixed point; the pass is not iterated. Rewritten nodes keep the span of
//! the expression they replace, and untouched subtrees are moved, not
//! rebuilt. The number of applied rewrites is published for diagnostics.

use routc_par::ast::*;

pub struct Optimizer {
    applied: usize,
}

impl Optimizer {
    pub fn new() -> Self {
        Self { applied: 0 }
    }

    /// Number of rewrites applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Optimizes a whole program.
    pub fn optimize(&mut self, program: Program) -> Program {
        Program {
            decls: program
                .decls
                .into_iter()
                .map(|decl| self.opt_decl(decl))
                .collect(),
        }
    }

    fn opt_decl(&mut self, decl: Decl) -> Decl {
        match decl {
            Decl::Var(var) => Decl::Var(self.opt_var_decl(var)),
            Decl::Type(alias) => {
                let TypeDecl { name, aliased, span } = alias;
                Decl::Type(TypeDecl {
                    name,
                    aliased: self.opt_type_expr(aliased),
                    span,
                })
            },
            Decl::Routine(routine) => {
                let RoutineDecl {
                    name,
                    params,
                    ret,
                    body,
                    span,
                } = routine;
                let body = match body {
                    RoutineBody::Block(body) => RoutineBody::Block(self.opt_body(body)),
                    RoutineBody::Expr(expr) => RoutineBody::Expr(self.opt_expr(expr)),
                };
                Decl::Routine(RoutineDecl {
                    name,
                    params,
                    ret,
                    body,
                    span,
                })
            },
        }
    }

    fn opt_var_decl(&mut self, var: VarDecl) -> VarDecl {
        let VarDecl {
            name,
            ty,
            init,
            span,
        } = var;
        VarDecl {
            name,
            ty: ty.map(|ty| self.opt_type_expr(ty)),
            init: init.map(|init| self.opt_expr(init)),
            span,
        }
    }

    /// Array sizes are expressions; folding them gives the code generator
    /// constant allocation sizes.
    fn opt_type_expr(&mut self, ty: TypeExpr) -> TypeExpr {
        match ty {
            TypeExpr::Array { size, elem, span } => TypeExpr::Array {
                size: size.map(|s| Box::new(self.opt_expr(*s))),
                elem: Box::new(self.opt_type_expr(*elem)),
                span,
            },
            TypeExpr::Record { fields, span } => TypeExpr::Record {
                fields: fields
                    .into_iter()
                    .map(|field| self.opt_var_decl(field))
                    .collect(),
                span,
            },
            other => other,
        }
    }

    /// Optimizes body items in order, then drops everything after a
    /// `return`.
    fn opt_body(&mut self, body: Body) -> Body {
        let mut items = Vec::with_capacity(body.len());
        for item in body {
            match item {
                BodyItem::Decl(decl) => items.push(BodyItem::Decl(self.opt_decl(decl))),
                BodyItem::Stmt(stmt) => items.extend(self.opt_stmt(stmt)),
            }
        }

        if let Some(ret_at) = items
            .iter()
            .position(|item| matches!(item, BodyItem::Stmt(Stmt::Return(_))))
        {
            let dropped = items.len() - ret_at - 1;
            if dropped > 0 {
                self.applied += dropped;
                items.truncate(ret_at + 1);
            }
        }

        items
    }

    /// A statement can rewrite to zero, one, or many body items: an `if`
    /// on a constant condition is replaced by the surviving branch.
    fn opt_stmt(&mut self, stmt: Stmt) -> Vec<BodyItem> {
        match stmt {
            Stmt::Assign(assign) => vec![BodyItem::Stmt(Stmt::Assign(Assignment {
                target: self.opt_place(assign.target),
                value: self.opt_expr(assign.value),
                span: assign.span,
            }))],
            Stmt::Call(call) => {
                let CallStmt { name, args, span } = call;
                vec![BodyItem::Stmt(Stmt::Call(CallStmt {
                    name,
                    args: self.opt_args(args),
                    span,
                }))]
            },
            Stmt::Print(print) => {
                let PrintStmt { args, span } = print;
                vec![BodyItem::Stmt(Stmt::Print(PrintStmt {
                    args: self.opt_args(args),
                    span,
                }))]
            },
            Stmt::Return(ret) => {
                let ReturnStmt { value, span } = ret;
                vec![BodyItem::Stmt(Stmt::Return(ReturnStmt {
                    value: value.map(|value| self.opt_expr(value)),
                    span,
                }))]
            },
            Stmt::While(while_stmt) => vec![BodyItem::Stmt(Stmt::While(WhileStmt {
                cond: self.opt_expr(while_stmt.cond),
                body: self.opt_body(while_stmt.body),
                span: while_stmt.span,
            }))],
            Stmt::For(for_stmt) => {
                let ForStmt {
                    var,
                    source,
                    reverse,
                    body,
                    span,
                } = for_stmt;
                let source = match source {
                    ForSource::Range { start, end } => ForSource::Range {
                        start: self.opt_expr(start),
                        end: self.opt_expr(end),
                    },
                    ForSource::Each(source) => ForSource::Each(self.opt_expr(source)),
                };
                vec![BodyItem::Stmt(Stmt::For(ForStmt {
                    var,
                    source,
                    reverse,
                    body: self.opt_body(body),
                    span,
                }))]
            },
            Stmt::If(if_stmt) => self.opt_if(if_stmt),
        }
    }

    fn opt_if(&mut self, if_stmt: IfStmt) -> Vec<BodyItem> {
        let cond = self.opt_expr(if_stmt.cond);
        let then_body = self.opt_body(if_stmt.then_body);
        let else_body = if_stmt.else_body.map(|body| self.opt_body(body));

        match cond {
            Expr::Bool(true, _) => {
                self.applied += 1;
                then_body
            },
            Expr::Bool(false, _) => {
                self.applied += 1;
                else_body.unwrap_or_default()
            },
            cond => vec![BodyItem::Stmt(Stmt::If(IfStmt {
                cond,
                then_body,
                else_body,
                span: if_stmt.span,
            }))],
        }
    }

    fn opt_place(&mut self, place: Place) -> Place {
        let Place {
            base,
            accesses,
            span,
        } = place;
        Place {
            base,
            accesses: accesses
                .into_iter()
                .map(|access| match access {
                    Access::Index(index, span) => Access::Index(self.opt_expr(index), span),
                    field => field,
                })
                .collect(),
            span,
        }
    }

    fn opt_args(&mut self, args: Vec<Expr>) -> Vec<Expr> {
        args.into_iter().map(|arg| self.opt_expr(arg)).collect()
    }

    /// Bottom-up expression rewrite: children first, then this node.
    fn opt_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Binary(binary) => {
                let left = self.opt_expr(binary.left);
                let right = self.opt_expr(binary.right);
                match fold_binary(binary.op, &left, &right, binary.span) {
                    Some(folded) => {
                        self.applied += 1;
                        folded
                    },
                    None => Expr::Binary(Box::new(BinaryExpr {
                        op: binary.op,
                        left,
                        right,
                        span: binary.span,
                    })),
                }
            },
            Expr::Unary(unary) => {
                let operand = self.opt_expr(unary.operand);
                match fold_unary(unary.op, operand, unary.span) {
                    Ok(folded) => {
                        self.applied += 1;
                        folded
                    },
                    Err(operand) => Expr::Unary(Box::new(UnaryExpr {
                        op: unary.op,
                        operand,
                        span: unary.span,
                    })),
                }
            },
            Expr::Call(call) => {
                let CallExpr { name, args, span } = *call;
                Expr::Call(Box::new(CallExpr {
                    name,
                    args: self.opt_args(args),
                    span,
                }))
            },
            Expr::Place(place) => Expr::Place(Box::new(self.opt_place(*place))),
            Expr::ArrayLit(lit) => Expr::ArrayLit(ArrayLit {
                elements: self.opt_args(lit.elements),
                span: lit.span,
            }),
            Expr::RecordLit(lit) => Expr::RecordLit(RecordLit {
                fields: lit
                    .fields
                    .into_iter()
                    .map(|(name, value)| (name, self.opt_expr(value)))
                    .collect(),
                span: lit.span,
            }),
            leaf => leaf,
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper returning the tree and the rewrite count.
pub fn optimize(program: Program) -> (Program, usize) {
    let mut optimizer = Optimizer::new();
    let optimized = optimizer.optimize(program);
    (optimized, optimizer.applied())
}

/// Folds a binary expression over two literals, or returns `None` to keep
/// the original. The folded literal takes the span of the whole expression.
fn fold_binary(op: BinOp, left: &Expr, right: &Expr, span: routc_util::Span) -> Option<Expr> {
    use BinOp::*;

    match (left, right) {
        (Expr::Int(l, _), Expr::Int(r, _)) => {
            let (l, r) = (*l, *r);
            let int = |v: i32| Some(Expr::Int(v, span));
            let bool_ = |v: bool| Some(Expr::Bool(v, span));
            match op {
                Add => int(l.wrapping_add(r)),
                Sub => int(l.wrapping_sub(r)),
                Mul => int(l.wrapping_mul(r)),
                // Division by zero traps at run time; i32::MIN / -1 traps
                // too. Neither is folded.
                Div if r != 0 && !(l == i32::MIN && r == -1) => int(l.wrapping_div(r)),
                Mod if r != 0 && !(l == i32::MIN && r == -1) => int(l.wrapping_rem(r)),
                Eq => bool_(l == r),
                Ne => bool_(l != r),
                Lt => bool_(l < r),
                Le => bool_(l <= r),
                Gt => bool_(l > r),
                Ge => bool_(l >= r),
                _ => None,
            }
        },
        (Expr::Real(..), Expr::Real(..))
        | (Expr::Real(..), Expr::Int(..))
        | (Expr::Int(..), Expr::Real(..)) => {
            // Mixed operands promote to real before folding.
            let l = as_f64(left)?;
            let r = as_f64(right)?;
            let real = |v: f64| Some(Expr::Real(v, span));
            let bool_ = |v: bool| Some(Expr::Bool(v, span));
            match op {
                Add => real(l + r),
                Sub => real(l - r),
                Mul => real(l * r),
                Div => real(l / r),
                Mod => real(l % r),
                Eq => bool_(l == r),
                Ne => bool_(l != r),
                Lt => bool_(l < r),
                Le => bool_(l <= r),
                Gt => bool_(l > r),
                Ge => bool_(l >= r),
                _ => None,
            }
        },
        (Expr::Bool(l, _), Expr::Bool(r, _)) => {
            let (l, r) = (*l, *r);
            let bool_ = |v: bool| Some(Expr::Bool(v, span));
            match op {
                And => bool_(l && r),
                Or => bool_(l || r),
                Eq => bool_(l == r),
                Ne => bool_(l != r),
                // `xor` and the orderings stay runtime operations.
                _ => None,
            }
        },
        _ => None,
    }
}

fn as_f64(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Int(v, _) => Some(*v as f64),
        Expr::Real(v, _) => Some(*v),
        _ => None,
    }
}

/// Folds a unary expression, or gives the operand back unchanged.
fn fold_unary(op: UnOp, operand: Expr, span: routc_util::Span) -> Result<Expr, Expr> {
    match (op, operand) {
        (UnOp::Not, Expr::Bool(value, _)) => Ok(Expr::Bool(!value, span)),
        // -(-x) cancels for any x.
        (UnOp::Neg, Expr::Unary(inner)) if inner.op == UnOp::Neg => Ok(inner.operand),
        (_, operand) => Err(operand),
    }
}
