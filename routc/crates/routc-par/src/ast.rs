//! The Rout abstract syntax tree.
//!
//! A closed set of tagged variants; passes over the tree are exhaustive
//! matches, so adding a variant is a compile-time reminder to update every
//! pass. Every node carries the span of its first token.

use routc_util::{Span, Symbol};

/// A whole source file: an ordered list of top-level declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Type(TypeDecl),
    Routine(RoutineDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Var(d) => d.span,
            Decl::Type(d) => d.span,
            Decl::Routine(d) => d.span,
        }
    }
}

/// `var NAME (: Type)? (is Expr)?`
///
/// Also used for record fields, where the same shape appears inside a
/// `record … end` type.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub name: Symbol,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `type NAME is Type`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub name: Symbol,
    pub aliased: TypeExpr,
    pub span: Span,
}

/// `routine NAME(params) (: Type)? is Body end`  or  `… => Expr`
#[derive(Clone, Debug, PartialEq)]
pub struct RoutineDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: RoutineBody,
    pub span: Span,
}

/// A routine has exactly one body form.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutineBody {
    /// `is … end`
    Block(Body),
    /// `=> expr` — the routine returns the expression's value.
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeExpr,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Primitive(Primitive, Span),
    /// `array [ size? ] ElemType`
    Array {
        size: Option<Box<Expr>>,
        elem: Box<TypeExpr>,
        span: Span,
    },
    /// `record field* end`
    Record { fields: Vec<VarDecl>, span: Span },
    /// A name referring to a `type` declaration.
    Named(Symbol, Span),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Primitive(_, span) => *span,
            TypeExpr::Array { span, .. } => *span,
            TypeExpr::Record { span, .. } => *span,
            TypeExpr::Named(_, span) => *span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Integer,
    Real,
    Boolean,
    Str,
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Integer => write!(f, "integer"),
            Primitive::Real => write!(f, "real"),
            Primitive::Boolean => write!(f, "boolean"),
            Primitive::Str => write!(f, "string"),
        }
    }
}

/// Routine body contents: declarations and statements in source order.
pub type Body = Vec<BodyItem>;

#[derive(Clone, Debug, PartialEq)]
pub enum BodyItem {
    Decl(Decl),
    Stmt(Stmt),
}

impl BodyItem {
    pub fn span(&self) -> Span {
        match self {
            BodyItem::Decl(d) => d.span(),
            BodyItem::Stmt(s) => s.span(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assign(Assignment),
    Call(CallStmt),
    Print(PrintStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign(s) => s.span,
            Stmt::Call(s) => s.span,
            Stmt::Print(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
        }
    }
}

/// `place := value`
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub target: Place,
    pub value: Expr,
    pub span: Span,
}

/// A routine call in statement position.
#[derive(Clone, Debug, PartialEq)]
pub struct CallStmt {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// `print expr, …` — each value printed, then one newline.
#[derive(Clone, Debug, PartialEq)]
pub struct PrintStmt {
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Body,
    pub else_body: Option<Body>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Body,
    pub span: Span,
}

/// `for VAR in source (reverse)? loop … end`
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub var: Symbol,
    pub source: ForSource,
    pub reverse: bool,
    pub body: Body,
    pub span: Span,
}

/// What a for-loop iterates over.
#[derive(Clone, Debug, PartialEq)]
pub enum ForSource {
    /// `start .. end`, inclusive on both sides.
    Range { start: Expr, end: Expr },
    /// An expression naming an array to walk element by element.
    Each(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// An L-value: a base variable followed by field and index accesses.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub base: Symbol,
    pub accesses: Vec<Access>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Access {
    /// `.name` — a record field, or `.size` on an array.
    Field(Symbol, Span),
    /// `[expr]` — 1-based array subscript.
    Index(Expr, Span),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i32, Span),
    Real(f64, Span),
    Bool(bool, Span),
    Str(Symbol, Span),
    Ident(Symbol, Span),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    /// An identifier with at least one access, in expression position.
    Place(Box<Place>),
    /// `[e1, …, eN]`
    ArrayLit(ArrayLit),
    /// `{name: expr, …}`
    RecordLit(RecordLit),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span)
            | Expr::Real(_, span)
            | Expr::Bool(_, span)
            | Expr::Str(_, span)
            | Expr::Ident(_, span) => *span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Place(p) => p.span,
            Expr::ArrayLit(a) => a.span,
            Expr::RecordLit(r) => r.span,
        }
    }

    /// True for the four literal forms.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Int(..) | Expr::Real(..) | Expr::Bool(..) | Expr::Str(..)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub left: Expr,
    pub right: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Expr,
    pub span: Span,
}

/// A call in expression position.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayLit {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordLit {
    pub fields: Vec<(Symbol, Expr)>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Xor => "xor",
            BinOp::Eq => "=",
            BinOp::Ne => "/=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Not => write!(f, "not"),
            UnOp::Neg => write!(f, "-"),
        }
    }
}
