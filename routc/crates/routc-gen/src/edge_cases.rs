//! Whole-module generation tests: source in, WAT structure out.

use crate::generate;
use routc_par::parse_source;
use routc_util::Handler;

/// Runs the full pipeline (parse, analyze, optimize, generate).
fn compile(source: &str) -> String {
    let program = parse_source(source).unwrap();
    let handler = Handler::new();
    let symbols = routc_sem::analyze(&program, &handler)
        .unwrap_or_else(|e| panic!("analysis failed: {e}"));
    let (optimized, _) = routc_opt::optimize(program);
    generate(&optimized, &symbols).unwrap()
}

/// Same, but skipping the optimizer.
fn compile_unoptimized(source: &str) -> String {
    let program = parse_source(source).unwrap();
    let handler = Handler::new();
    let symbols = routc_sem::analyze(&program, &handler).unwrap();
    generate(&program, &symbols).unwrap()
}

#[test]
fn test_module_shell() {
    let wat = compile("routine main() is print 1 end");
    assert!(wat.starts_with("(module\n"));
    assert!(wat.trim_end().ends_with(')'));
    for import in [
        "(import \"env\" \"printInt\" (func $printInt (param i32)))",
        "(import \"env\" \"printFloat\" (func $printFloat (param f64)))",
        "(import \"env\" \"printString\" (func $printString (param i32)))",
        "(import \"env\" \"printBool\" (func $printBool (param i32)))",
        "(import \"env\" \"printNewline\" (func $printNewline))",
    ] {
        assert!(wat.contains(import), "missing {import}\n{wat}");
    }
    assert!(wat.contains("(memory (export \"memory\") 1)"));
    assert!(wat.contains("(export \"main\" (func $main))"));
}

#[test]
fn test_no_main_no_export() {
    let wat = compile("routine helper() is print 1 end");
    assert!(!wat.contains("(export \"main\""));
    assert!(wat.contains("(func $helper"));
}

#[test]
fn test_scenario_constant_arithmetic() {
    // print 1 + 2 * 3 — the optimizer folds to 7.
    let wat = compile("routine main() is print 1 + 2 * 3 end");
    assert!(wat.contains("i32.const 7"));
    assert!(wat.contains("call $printInt"));
    assert!(wat.contains("call $printNewline"));
    assert!(!wat.contains("i32.mul"));
}

#[test]
fn test_unoptimized_arithmetic_emits_operators() {
    let wat = compile_unoptimized("routine main() is print 1 + 2 * 3 end");
    assert!(wat.contains("i32.mul"));
    assert!(wat.contains("i32.add"));
}

#[test]
fn test_scenario_locals() {
    let wat = compile(
        "routine main() is var x : integer is 5; var y : integer is 3; print x * y + 2 end",
    );
    assert!(wat.contains("(local $x i32)"));
    assert!(wat.contains("(local $y i32)"));
    assert!(wat.contains("local.set $x"));
    assert!(wat.contains("local.get $y"));
    assert!(wat.contains("i32.mul"));
}

#[test]
fn test_scenario_if_else() {
    let wat = compile(
        "routine main() is var a : integer is 10; if a > 5 then print 1 else print 0 end end",
    );
    assert!(wat.contains("i32.gt_s"));
    let if_pos = wat.find("\n    if\n").expect("if instruction");
    let else_pos = wat.find("\n    else\n").expect("else instruction");
    assert!(if_pos < else_pos);
}

#[test]
fn test_scenario_for_range() {
    let wat = compile(
        "routine main() is var s : integer is 0; for i in 1..5 loop s := s + i end; print s end",
    );
    assert!(wat.contains("(local $i i32)"));
    assert!(wat.contains("block $L0_end"));
    assert!(wat.contains("loop $L0_start"));
    assert!(wat.contains("i32.gt_s")); // forward exit test
    assert!(wat.contains("br_if $L0_end"));
    assert!(wat.contains("br $L0_start"));
}

#[test]
fn test_reverse_loop_uses_lt_and_sub() {
    let wat = compile(
        "routine main() is var s : integer is 0; for i in 5..1 reverse loop s := s + i end; print s end",
    );
    assert!(wat.contains("i32.lt_s"));
    assert!(wat.contains("i32.sub"));
}

#[test]
fn test_scenario_sum_over_array() {
    let wat = compile(
        "routine sum(arr : array[] integer) : integer is \
             var s : integer is 0; \
             for x in arr loop s := s + x end; \
             return s \
         end \
         routine main() is \
             var a : array[4] integer is [2,2,2,2]; \
             print sum(a) \
         end",
    );
    // sum: parameter, for-each helpers, header load, element stride.
    assert!(wat.contains("(func $sum (param $arr i32) (result i32)"));
    assert!(wat.contains("(local $fe_idx_0 i32)"));
    assert!(wat.contains("(local $fe_size_0 i32)"));
    assert!(wat.contains("local.set $fe_size_0"));
    // main: array literal header then elements.
    assert!(wat.contains("i32.const 4\n    i32.store"));
    assert!(wat.contains("call $sum"));
    assert!(wat.contains("call $printInt"));
}

#[test]
fn test_scenario_if_true_optimized_away() {
    let wat = compile("routine main() is if true then print 42 else print 0 end end");
    assert!(wat.contains("i32.const 42"));
    assert!(!wat.contains("\n    if\n"));
    assert!(!wat.contains("\n    else\n"));
}

#[test]
fn test_array_literal_is_one_indexed() {
    let wat = compile(
        "routine main() is var a : array[3] integer is [7,8,9]; print a[2] end",
    );
    // a[2]: index, minus one, times four, plus base, plus header skip.
    let needle = "i32.const 2\n    i32.const 1\n    i32.sub\n    i32.const 4\n    i32.mul\n    i32.add\n    i32.const 4\n    i32.add\n    i32.load";
    assert!(wat.contains(needle), "missing 1-based addressing\n{wat}");
}

#[test]
fn test_array_size_reads_header() {
    let wat = compile(
        "routine main() is var a : array[3] integer is [7,8,9]; print a.size end",
    );
    assert!(wat.contains("local.get $a\n    i32.load"));
}

#[test]
fn test_string_literals_deduplicated() {
    let wat = compile(
        "routine main() is print \"hi\"; print \"bye\"; print \"hi\" end",
    );
    assert_eq!(wat.matches("(data (i32.const 0) \"hi\\00\")").count(), 1);
    assert!(wat.contains("(data (i32.const 3) \"bye\\00\")"));
    assert_eq!(wat.matches("(data ").count(), 2);
    assert!(wat.contains("call $printString"));
}

#[test]
fn test_bool_print_dispatch() {
    let wat = compile("routine main() is var f : boolean is true; print f, not f end");
    assert!(wat.contains("call $printBool"));
    assert!(wat.contains("i32.eqz"));
}

#[test]
fn test_real_arithmetic_and_print() {
    let wat = compile_unoptimized(
        "routine main() is var r : real is 1.5; print r * 2.0 end",
    );
    assert!(wat.contains("(local $r f64)"));
    assert!(wat.contains("f64.const 1.5"));
    assert!(wat.contains("f64.mul"));
    assert!(wat.contains("call $printFloat"));
}

#[test]
fn test_int_to_real_conversion_on_init() {
    let wat = compile_unoptimized("routine main() is var r : real is 1; print r end");
    assert!(wat.contains("f64.convert_i32_s"));
}

#[test]
fn test_real_to_int_conversion_on_assign() {
    let wat = compile_unoptimized(
        "routine main() is var n : integer is 0; n := 2.5; print n end",
    );
    assert!(wat.contains("i32.trunc_f64_s"));
}

#[test]
fn test_f64_comparisons_use_valid_spellings() {
    let wat = compile_unoptimized(
        "routine main() is var r : real is 1.0; if r < 2.0 then print 1 end \
         if r >= 0.5 then print 2 end end",
    );
    assert!(wat.contains("f64.lt"));
    assert!(wat.contains("f64.ge"));
    assert!(!wat.contains("f64.lt_s"));
    assert!(!wat.contains("f64.ge_s"));
}

#[test]
fn test_real_modulo_expands() {
    let wat = compile_unoptimized(
        "routine main() is var r : real is 5.5; print r % 2.0 end",
    );
    assert!(wat.contains("(local $ftmp0 f64)"));
    assert!(wat.contains("f64.trunc"));
    assert!(wat.contains("f64.sub"));
    assert!(!wat.contains("f64.rem"));
}

#[test]
fn test_while_loop_shape() {
    let wat = compile(
        "routine main() is var n : integer is 3; while n > 0 loop n := n - 1 end; print n end",
    );
    assert!(wat.contains("block $L0_end"));
    assert!(wat.contains("loop $L0_start"));
    assert!(wat.contains("i32.eqz\n    br_if $L0_end"));
}

#[test]
fn test_record_fields_use_declaration_order() {
    let wat = compile(
        "type Person is record var name : integer; var age : integer; end \
         routine main() is \
             var p : Person is {age: 36, name: 7} \
             print p.age \
         end",
    );
    // name sits at offset 0, age at offset 4, regardless of literal order.
    assert!(wat.contains("i32.const 4\n    i32.add\n    i32.load"));
}

#[test]
fn test_scalar_globals() {
    let wat = compile(
        "var count : integer is 5\nvar ratio : real is 0.5\nvar flag : boolean\n\
         routine main() is print count; print ratio; print flag end",
    );
    assert!(wat.contains("(global $count (mut i32) (i32.const 5))"));
    assert!(wat.contains("(global $ratio (mut f64) (f64.const 0.5))"));
    assert!(wat.contains("(global $flag (mut i32) (i32.const 0))"));
    assert!(wat.contains("global.get $count"));
}

#[test]
fn test_array_global_has_size_twin() {
    let wat = compile(
        "var grid : array[8] integer\n\
         routine main() is grid[1] := 9; print grid[1] end",
    );
    assert!(wat.contains("(global $grid (mut i32) (i32.const 256))"));
    assert!(wat.contains("(global $grid_size (mut i32) (i32.const 8))"));
    // The header store happens in the start function.
    assert!(wat.contains("(func $__init"));
    assert!(wat.contains("(start $__init)"));
}

#[test]
fn test_global_with_aggregate_initializer_uses_start() {
    let wat = compile(
        "var nums : array[3] integer is [4,5,6]\n\
         routine main() is print nums[1] end",
    );
    assert!(wat.contains("(func $__init"));
    assert!(wat.contains("global.set $nums"));
    assert!(wat.contains("i32.const 3\n    global.set $nums_size"));
    assert!(wat.contains("(start $__init)"));
}

#[test]
fn test_no_start_function_without_global_work() {
    let wat = compile("var n : integer is 3\nroutine main() is print n end");
    assert!(!wat.contains("$__init"));
    assert!(!wat.contains("(start"));
}

#[test]
fn test_string_global_initializer_inlined() {
    let wat = compile(
        "var greeting : string is \"hello\"\n\
         routine main() is print greeting end",
    );
    assert!(wat.contains("(data (i32.const 0) \"hello\\00\")"));
    assert!(wat.contains("(global $greeting (mut i32) (i32.const 0))"));
}

#[test]
fn test_heap_base_sits_above_string_table() {
    // 300 bytes of strings push the heap base past the 256 floor.
    let long = "x".repeat(300);
    let source = format!(
        "routine main() is print \"{long}\"; var a : array[2] integer is [1,2]; print a[1] end"
    );
    let wat = compile(&source);
    // 301 bytes with NUL, aligned to 16 → 304.
    assert!(wat.contains("i32.const 304"), "{wat}");
}

#[test]
fn test_compound_assignment_goes_through_temp() {
    let wat = compile(
        "routine main() is var a : array[2] integer is [1,2]; a[1] := 9; print a[1] end",
    );
    assert!(wat.contains("local.set $temp"));
    assert!(wat.contains("local.get $temp\n    i32.store"));
}

#[test]
fn test_ref_scalar_param_compiles_by_value() {
    let wat = compile(
        "routine bump(ref n : integer) is n := n + 1 end \
         routine main() is var v : integer is 1; bump(v); print v end",
    );
    assert!(wat.contains("(func $bump (param $n i32)"));
    assert!(wat.contains("call $bump"));
}

#[test]
fn test_routine_expression_body_returns_value() {
    let wat = compile(
        "routine square(n : integer) : integer => n * n; \
         routine main() is print square(6) end",
    );
    assert!(wat.contains("(func $square (param $n i32) (result i32)"));
    assert!(wat.contains("i32.mul"));
}

#[test]
fn test_return_statement_emits_return() {
    let wat = compile(
        "routine pick(n : integer) : integer is \
             if n > 0 then return 1 end \
             return 0 - 1 \
         end \
         routine main() is print pick(5) end",
    );
    assert!(wat.contains("return"));
    assert!(wat.contains("(result i32)"));
}

#[test]
fn test_call_drops_ignored_result() {
    let wat = compile(
        "routine answer() : integer => 42; \
         routine main() is answer() end",
    );
    assert!(wat.contains("call $answer\n    drop"));
}

#[test]
fn test_generator_is_reusable() {
    let source = "routine main() is var a : array[2] integer is [1,2]; print a[1] end";
    let program = parse_source(source).unwrap();
    let handler = Handler::new();
    let symbols = routc_sem::analyze(&program, &handler).unwrap();
    let mut generator = crate::Generator::new(&symbols);
    let first = generator.generate(&program).unwrap();
    let second = generator.generate(&program).unwrap();
    // The bump counter resets between calls, so output is identical.
    assert_eq!(first, second);
}

#[test]
fn test_nested_loops_get_distinct_labels() {
    let wat = compile(
        "routine main() is \
             var s : integer is 0 \
             for i in 1..3 loop \
                 for j in 1..3 loop s := s + i * j end \
             end \
             print s \
         end",
    );
    assert!(wat.contains("$L0_end"));
    assert!(wat.contains("$L1_end"));
}

#[test]
fn test_logical_operators_lower_to_bitwise() {
    let wat = compile_unoptimized(
        "routine main() is var a : boolean is true; var b : boolean is false; \
         print a and b, a or b, a xor b end",
    );
    assert!(wat.contains("i32.and"));
    assert!(wat.contains("i32.or"));
    assert!(wat.contains("i32.xor"));
}
