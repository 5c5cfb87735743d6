//! End-to-end scenarios (spec.md §8): source text through the parser, the analyser, and the
//! evaluator. These exercise the whole pipeline rather than any one module in isolation; unit
//! tests for individual passes live alongside their modules.

use afil_core::DEFAULT_STACK_SIZE;
use afil_core::analysis::UnmetPrecondition;
use pretty_assertions::assert_eq;

fn run_source(source: &str) -> Result<i32, UnmetPrecondition> {
    let module = afil_parser::parse_module("scenario", source).expect("parse should succeed");
    let program = afil_core::analyse(std::slice::from_ref(&module)).expect("analysis should succeed");
    afil_core::run(&program, DEFAULT_STACK_SIZE)
}

#[test]
fn operator_precedence_and_extern_dispatch() {
    let source = "let main = fn () -> int { return 2 + 3 * 4; };";
    assert_eq!(run_source(source), Ok(14));
}

#[test]
fn call_protocol_and_overload_resolution() {
    let source = "\
        let square = fn (int x) -> int { return x * x; }; \
        let main = fn () -> int { return square(5) + square(6); };\
    ";
    assert_eq!(run_source(source), Ok(61));
}

#[test]
fn template_instantiation_on_two_argument_types_and_caching() {
    let source = "\
        let abs = fn<T>(T x) -> T { if (x < 0) return -x; else return x; }; \
        let main = fn () -> int { return abs(-7) + abs(3.0) as int; };\
    ";
    assert_eq!(run_source(source), Ok(10));
}

#[test]
fn designated_initializers_member_access_and_default_special_members() {
    let source = "\
        struct Pair { int a; int b; } \
        let main = fn () -> int { let p = Pair{ .a = 3, .b = 4 }; return p.a * p.b; };\
    ";
    assert_eq!(run_source(source), Ok(12));
}

#[test]
fn for_scope_mutability_and_loop_control_flow() {
    let source = "\
        let main = fn () -> int { \
            let mut sum = 0; \
            for (let i = 0; i < 10; i = i + 1) { sum = sum + i; } \
            return sum; \
        };\
    ";
    assert_eq!(run_source(source), Ok(45));
}

#[test]
fn precondition_surfaces_as_unmet_precondition() {
    let source = "\
        let f = fn (int x) -> int { precondition(x >= 0); return x; }; \
        let main = fn () -> int { return f(-1); };\
    ";
    let module = afil_parser::parse_module("scenario", source).expect("parse should succeed");
    let program = afil_core::analyse(std::slice::from_ref(&module)).expect("analysis should succeed");
    let f_id = program.global_scope.scope.functions.iter().find(|f| f.name == "f").expect("f should be declared").id;

    let result = afil_core::run(&program, DEFAULT_STACK_SIZE);
    assert_eq!(result, Err(UnmetPrecondition { function_id: f_id, precondition_index: 0 }));
}

#[test]
fn break_and_continue_propagate_out_of_nested_loops() {
    let source = "\
        let main = fn () -> int { \
            let mut sum = 0; \
            for (let i = 0; i < 10; i = i + 1) { \
                if (i == 5) break; \
                if (i == 2) continue; \
                sum = sum + i; \
            } \
            return sum; \
        };\
    ";
    // 0 + 1 + 3 + 4 = 8 (2 skipped by continue, loop stops before 5 via break)
    assert_eq!(run_source(source), Ok(8));
}
