//! Whole-grammar parser tests: programs mixing separators, nesting, and
//! failure cases.

use crate::ast::*;
use crate::{parse_source, ParseError};
use routc_lex::TokenKind;
use routc_util::Symbol;

#[test]
fn test_program_with_newline_separators_only() {
    let source = "\
var total : integer is 0
type Pair is record
    var first : integer
    var second : integer
end
routine main() is
    total := total + 1
    print total
end";
    let program = parse_source(source).unwrap();
    assert_eq!(program.decls.len(), 3);
}

#[test]
fn test_program_with_semicolons_only() {
    let source = "var a : integer is 1; var b : integer is 2; \
                  routine main() is print a + b; end";
    let program = parse_source(source).unwrap();
    assert_eq!(program.decls.len(), 3);
}

#[test]
fn test_one_line_routine() {
    let program = parse_source("routine main() is print 1 + 2 * 3 end").unwrap();
    assert_eq!(program.decls.len(), 1);
}

#[test]
fn test_nested_control_flow() {
    let source = "\
routine main() is
    for i in 1..3 loop
        while i < 2 loop
            if i = 1 then
                print i
            else
                print 0
            end
        end
    end
end";
    let program = parse_source(source).unwrap();
    let Decl::Routine(routine) = &program.decls[0] else {
        panic!()
    };
    let RoutineBody::Block(body) = &routine.body else {
        panic!()
    };
    let BodyItem::Stmt(Stmt::For(for_stmt)) = &body[0] else {
        panic!()
    };
    let BodyItem::Stmt(Stmt::While(while_stmt)) = &for_stmt.body[0] else {
        panic!()
    };
    assert!(matches!(
        while_stmt.body[0],
        BodyItem::Stmt(Stmt::If(_))
    ));
}

#[test]
fn test_spec_sum_scenario_shape() {
    let source = "\
routine sum(arr : array[] integer) : integer is
    var s : integer is 0
    for x in arr loop
        s := s + x
    end
    return s
end
routine main() is
    var a : array[4] integer is [2,2,2,2]
    print sum(a)
end";
    let program = parse_source(source).unwrap();
    assert_eq!(program.decls.len(), 2);

    let Decl::Routine(sum) = &program.decls[0] else {
        panic!()
    };
    assert!(matches!(
        sum.params[0].ty,
        TypeExpr::Array { size: None, .. }
    ));

    let Decl::Routine(main) = &program.decls[1] else {
        panic!()
    };
    let RoutineBody::Block(body) = &main.body else {
        panic!()
    };
    let BodyItem::Decl(Decl::Var(a)) = &body[0] else {
        panic!()
    };
    assert!(matches!(a.init, Some(Expr::ArrayLit(_))));
}

#[test]
fn test_record_literal_initializer() {
    let source = "\
type Person is record
    var name : string
    var age : integer
end
var p : Person is {name: \"ada\", age: 36}";
    let program = parse_source(source).unwrap();
    let Decl::Var(var) = &program.decls[1] else {
        panic!()
    };
    let Some(Expr::RecordLit(lit)) = &var.init else {
        panic!()
    };
    assert_eq!(lit.fields.len(), 2);
    assert!(matches!(lit.fields[0].1, Expr::Str(..)));
}

#[test]
fn test_expression_body_routine_chain() {
    let source = "\
routine square(n : integer) : integer => n * n
routine cube(n : integer) : integer => n * square(n)";
    let program = parse_source(source).unwrap();
    assert_eq!(program.decls.len(), 2);
    for decl in &program.decls {
        let Decl::Routine(routine) = decl else {
            panic!()
        };
        assert!(matches!(routine.body, RoutineBody::Expr(_)));
    }
}

#[test]
fn test_spans_point_into_source() {
    let source = "var first : integer\nvar second : integer";
    let program = parse_source(source).unwrap();
    assert_eq!((program.decls[0].span().line, program.decls[0].span().column), (1, 1));
    assert_eq!((program.decls[1].span().line, program.decls[1].span().column), (2, 1));
}

#[test]
fn test_first_error_aborts() {
    // The second declaration is fine, but parsing stops at the first error.
    let err = parse_source("var 1bad : integer\nvar fine : integer").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
}

#[test]
fn test_error_carries_location() {
    let err = parse_source("routine main() is\n    x :=\nend").unwrap_err();
    let span = err.span();
    assert_eq!(span.line, 3);
}

#[test]
fn test_unclosed_routine_hits_eof() {
    let err = parse_source("routine main() is print 1").unwrap_err();
    match err {
        ParseError::UnexpectedToken { found, .. } => assert_eq!(found, TokenKind::Eof),
        other => panic!("wrong error: {other:?}"),
    }
}

#[test]
fn test_keywords_case_insensitive_in_grammar() {
    let program = parse_source("ROUTINE main() IS PRINT 7 END").unwrap();
    let Decl::Routine(routine) = &program.decls[0] else {
        panic!()
    };
    assert_eq!(routine.name, Symbol::intern("main"));
}

#[test]
fn test_argument_order_preserved() {
    let program = parse_source("routine m() is f(9, 8, 7) end").unwrap();
    let Decl::Routine(routine) = &program.decls[0] else {
        panic!()
    };
    let RoutineBody::Block(body) = &routine.body else {
        panic!()
    };
    let BodyItem::Stmt(Stmt::Call(call)) = &body[0] else {
        panic!()
    };
    let values: Vec<i32> = call
        .args
        .iter()
        .map(|a| match a {
            Expr::Int(v, _) => *v,
            _ => panic!(),
        })
        .collect();
    assert_eq!(values, vec![9, 8, 7]);
}
