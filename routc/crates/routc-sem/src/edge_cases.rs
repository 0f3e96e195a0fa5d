//! Whole-program analysis tests.

use crate::{analyze, SemanticError};
use routc_par::parse_source;
use routc_util::Handler;

fn run(source: &str) -> (Result<crate::Symbols, SemanticError>, Handler) {
    let program = parse_source(source).unwrap();
    let handler = Handler::new();
    let result = analyze(&program, &handler);
    (result, handler)
}

#[test]
fn test_full_pipeline_program_is_clean() {
    let source = "\
type Person is record
    var name : string
    var age : integer
end

var population : integer is 0

routine grow(ref count : integer) is
    count := count + 1
end

routine describe(p : Person) is
    print p.name, p.age
end

routine main() is
    var ada : Person is {name: \"ada\", age: 36}
    grow(population)
    describe(ada)
    print population
end";
    let (result, handler) = run(source);
    assert!(result.is_ok(), "{:?}", handler.diagnostics());
    assert!(!handler.has_errors());
    assert_eq!(handler.warning_count(), 0);
}

#[test]
fn test_spec_scenarios_analyze_cleanly() {
    let scenarios = [
        "routine main() is print 1 + 2 * 3 end",
        "routine main() is var x : integer is 5; var y : integer is 3; print x * y + 2 end",
        "routine main() is var a : integer is 10; if a > 5 then print 1 else print 0 end end",
        "routine main() is var s : integer is 0; for i in 1..5 loop s := s + i end; print s end",
        "routine sum(arr : array[] integer) : integer is var s : integer is 0; \
         for x in arr loop s := s + x end; return s end \
         routine main() is var a : array[4] integer is [2,2,2,2]; print sum(a) end",
        "routine main() is if true then print 42 else print 0 end end",
    ];
    for source in scenarios {
        let (result, handler) = run(source);
        assert!(result.is_ok(), "{source}: {:?}", handler.diagnostics());
    }
}

#[test]
fn test_duplicate_routine() {
    let (result, _) = run("routine f() is end routine f() is end");
    assert_eq!(result.unwrap_err().message, "Routine 'f' is already declared");
}

#[test]
fn test_duplicate_type() {
    let (result, _) = run("type T is integer; type T is real;");
    assert_eq!(result.unwrap_err().message, "Type 'T' is already declared");
}

#[test]
fn test_duplicate_top_level_var() {
    let (result, _) = run("var x : integer\nvar x : real");
    assert_eq!(
        result.unwrap_err().message,
        "Variable 'x' is already declared in this scope"
    );
}

#[test]
fn test_duplicate_parameter() {
    let (result, _) = run("routine f(a : integer, a : real) is end");
    assert_eq!(
        result.unwrap_err().message,
        "Variable 'a' is already declared in this scope"
    );
}

#[test]
fn test_parameter_visible_in_expression_body() {
    let (result, handler) = run("routine twice(n : integer) : integer => n + n");
    assert!(result.is_ok());
    assert_eq!(handler.warning_count(), 0);
}

#[test]
fn test_unused_parameter_warns() {
    let (_, handler) = run("routine f(unused : integer) is print 1 end");
    assert_eq!(handler.warning_count(), 1);
    assert!(handler.warnings()[0].message.contains("'unused'"));
}

#[test]
fn test_local_type_alias_usable_in_body() {
    let source = "\
routine main() is
    type Row is array[3] integer
    var r : Row is [1, 2, 3]
    print r[1]
end";
    let (result, handler) = run(source);
    assert!(result.is_ok(), "{:?}", handler.diagnostics());
}

#[test]
fn test_local_type_alias_not_visible_outside() {
    let source = "\
routine first() is
    type Row is array[3] integer
    var r : Row is [1,2,3]
    print r[1]
end
var leak : Row";
    let (result, _) = run(source);
    assert_eq!(result.unwrap_err().message, "Type Row is not declared");
}

#[test]
fn test_duplicate_record_field() {
    let (result, _) = run("type P is record var x : integer; var x : integer; end");
    assert_eq!(
        result.unwrap_err().message,
        "Field 'x' is already declared in this record"
    );
}

#[test]
fn test_record_field_may_share_name_with_outer_variable() {
    let source = "\
var name : integer is 1
type P is record
    var name : string
end
routine main() is print name end";
    let (result, handler) = run(source);
    assert!(result.is_ok(), "{:?}", handler.diagnostics());
}

#[test]
fn test_global_unused_warning() {
    let (_, handler) = run("var lonely : integer is 3\nroutine main() is print 1 end");
    assert!(handler
        .warnings()
        .iter()
        .any(|w| w.message.contains("'lonely'")));
}

#[test]
fn test_array_size_expression_is_checked() {
    let (result, _) = run("var a : array[missing] integer");
    assert_eq!(result.unwrap_err().message, "Variable missing is not declared");
}

#[test]
fn test_while_and_if_bodies_open_scopes() {
    let source = "\
routine main() is
    var n : integer is 3
    while n > 0 loop
        var step : integer is 1
        n := n - step
    end
    if n = 0 then
        var done : integer is 1
        print done
    end
end";
    let (result, handler) = run(source);
    assert!(result.is_ok(), "{:?}", handler.diagnostics());
    assert_eq!(handler.warning_count(), 0);
}

#[test]
fn test_if_scope_variable_not_visible_after() {
    let source = "\
routine main() is
    if true then
        var inner : integer is 1
        print inner
    end
    print inner
end";
    let (result, _) = run(source);
    assert_eq!(result.unwrap_err().message, "Variable inner is not declared");
}
