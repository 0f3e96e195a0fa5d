//! Type lowering: Rout types to WASM value types and print dispatch kinds.

use routc_par::ast::{Expr, Primitive, TypeExpr, VarDecl};
use routc_util::Symbol;

/// The semantic kind of a value, as far as code generation cares: it picks
/// the WASM value type and the print import.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Int,
    Real,
    Bool,
    Str,
    /// An array or record: an i32 pointer into linear memory.
    Ptr,
}

impl Kind {
    /// The WASM value type this kind lowers to.
    pub fn wasm(self) -> &'static str {
        match self {
            Kind::Real => "f64",
            _ => "i32",
        }
    }

    /// The print import matching this kind. Pointers print as integers.
    pub fn print_import(self) -> &'static str {
        match self {
            Kind::Int => "$printInt",
            Kind::Real => "$printFloat",
            Kind::Bool => "$printBool",
            Kind::Str => "$printString",
            Kind::Ptr => "$printInt",
        }
    }
}

/// Lowers a structural (alias-free) type to its kind.
pub fn kind_of_type(ty: &TypeExpr) -> Kind {
    match ty {
        TypeExpr::Primitive(Primitive::Integer, _) => Kind::Int,
        TypeExpr::Primitive(Primitive::Real, _) => Kind::Real,
        TypeExpr::Primitive(Primitive::Boolean, _) => Kind::Bool,
        TypeExpr::Primitive(Primitive::Str, _) => Kind::Str,
        TypeExpr::Array { .. } | TypeExpr::Record { .. } | TypeExpr::Named(..) => Kind::Ptr,
    }
}

/// Invents a structural type for a variable declared without an
/// annotation, from the shape of its initializer. Record layouts come out
/// in literal field order.
pub fn synthesize_type(init: &Expr) -> Option<TypeExpr> {
    match init {
        Expr::Int(_, span) => Some(TypeExpr::Primitive(Primitive::Integer, *span)),
        Expr::Real(_, span) => Some(TypeExpr::Primitive(Primitive::Real, *span)),
        Expr::Bool(_, span) => Some(TypeExpr::Primitive(Primitive::Boolean, *span)),
        Expr::Str(_, span) => Some(TypeExpr::Primitive(Primitive::Str, *span)),
        Expr::ArrayLit(lit) => Some(TypeExpr::Array {
            size: Some(Box::new(Expr::Int(lit.elements.len() as i32, lit.span))),
            elem: Box::new(TypeExpr::Primitive(Primitive::Integer, lit.span)),
            span: lit.span,
        }),
        Expr::RecordLit(lit) => Some(TypeExpr::Record {
            fields: lit
                .fields
                .iter()
                .map(|(name, value)| VarDecl {
                    name: *name,
                    ty: synthesize_type(value),
                    init: None,
                    span: value.span(),
                })
                .collect(),
            span: lit.span,
        }),
        _ => None,
    }
}

/// Field offset in a record layout: declaration index times the 4-byte
/// slot size.
pub fn field_offset(fields: &[VarDecl], field: Symbol) -> Option<u32> {
    fields
        .iter()
        .position(|f| f.name == field)
        .map(|index| index as u32 * 4)
}

/// Formats an f64 the way WAT expects.
pub fn wat_f64(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value < 0.0 {
            "-inf".to_string()
        } else {
            "inf".to_string()
        }
    } else {
        // `{:?}` keeps a trailing `.0` on whole numbers, so the literal
        // reads unambiguously as a float.
        format!("{value:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routc_par::ast::ArrayLit;
    use routc_util::Span;

    #[test]
    fn test_kind_lowering() {
        assert_eq!(
            kind_of_type(&TypeExpr::Primitive(Primitive::Integer, Span::DUMMY)).wasm(),
            "i32"
        );
        assert_eq!(
            kind_of_type(&TypeExpr::Primitive(Primitive::Real, Span::DUMMY)).wasm(),
            "f64"
        );
        assert_eq!(
            kind_of_type(&TypeExpr::Primitive(Primitive::Str, Span::DUMMY)).wasm(),
            "i32"
        );
    }

    #[test]
    fn test_print_dispatch() {
        assert_eq!(Kind::Int.print_import(), "$printInt");
        assert_eq!(Kind::Real.print_import(), "$printFloat");
        assert_eq!(Kind::Bool.print_import(), "$printBool");
        assert_eq!(Kind::Str.print_import(), "$printString");
    }

    #[test]
    fn test_synthesize_from_array_literal() {
        let lit = Expr::ArrayLit(ArrayLit {
            elements: vec![Expr::Int(1, Span::DUMMY), Expr::Int(2, Span::DUMMY)],
            span: Span::DUMMY,
        });
        let TypeExpr::Array { size, .. } = synthesize_type(&lit).unwrap() else {
            panic!()
        };
        assert!(matches!(size.as_deref(), Some(Expr::Int(2, _))));
    }

    #[test]
    fn test_field_offsets_follow_declaration_order() {
        let fields = vec![
            VarDecl {
                name: Symbol::intern("name"),
                ty: None,
                init: None,
                span: Span::DUMMY,
            },
            VarDecl {
                name: Symbol::intern("age"),
                ty: None,
                init: None,
                span: Span::DUMMY,
            },
            VarDecl {
                name: Symbol::intern("score"),
                ty: None,
                init: None,
                span: Span::DUMMY,
            },
        ];
        assert_eq!(field_offset(&fields, Symbol::intern("name")), Some(0));
        assert_eq!(field_offset(&fields, Symbol::intern("age")), Some(4));
        assert_eq!(field_offset(&fields, Symbol::intern("score")), Some(8));
        assert_eq!(field_offset(&fields, Symbol::intern("ghost")), None);
    }

    #[test]
    fn test_wat_f64_formatting() {
        assert_eq!(wat_f64(3.0), "3.0");
        assert_eq!(wat_f64(0.5), "0.5");
        assert_eq!(wat_f64(f64::INFINITY), "inf");
        assert_eq!(wat_f64(f64::NEG_INFINITY), "-inf");
        assert_eq!(wat_f64(f64::NAN), "nan");
    }
}
