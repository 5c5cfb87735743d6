//! Ties the evaluator submodules together and exposes the handful of entry points the rest of the
//! crate needs: running a complete program (spec.md §6), and folding a single expression to bytes
//! under [`context::CompileTimeContext`] for array sizes, struct member defaults and concept checks
//! (spec.md §4.8).
//!
//! Grounded on `Interpreter::run_program`/`Interpreter::evaluate_constant_expression` in the
//! original implementation's `interpreter.hh`.

pub mod call;
pub mod context;
pub mod control_flow;
pub mod expression;
pub mod stack;
pub mod statement;

use crate::analysis::UnmetPrecondition;
use crate::id::FunctionId;
use crate::program::{Expression, Program};

use call::call_function;
use context::{CompileTimeContext, ExecutionContext, RuntimeContext};
use expression::eval_expression;
use stack::ProgramStack;

/// Default size of the scratch stack a compile-time fold runs against -- large enough for the
/// array-size and concept expressions the analyser ever hands it, never user-configurable since it
/// never holds a whole program's activation records (spec.md §4.8, §6).
pub const DEFAULT_COMPILE_TIME_STACK_SIZE: usize = 256;

/// Runs `program`'s global initializers, then calls `main`, returning its `i32` result (spec.md
/// §6). Globals live at the bottom of a fresh `stack_size`-byte stack so `main` (and anything it
/// calls) can address them at their fixed offsets from base zero.
pub fn run(program: &Program, stack_size: usize) -> Result<i32, UnmetPrecondition> {
    let mut stack = ProgramStack::new(stack_size);
    let context = RuntimeContext;

    let globals_frame = &program.global_scope.scope;
    stack
        .alloc_aligned(globals_frame.stack_frame_size as usize, (globals_frame.stack_frame_alignment as usize).max(1))
        .expect("evaluator stack too small to hold global variables");
    let scratch = stack.alloc(1).expect("evaluator stack too small to hold global variables");
    statement::run_statements_for_value(program, &program.global_initialization_statements, &mut stack, &context, scratch)?;
    stack.free_up_to(scratch);

    let result_addr = stack.alloc(4).expect("evaluator stack too small to hold main's result");
    call_function(program, program.main_function, &[], &mut stack, &context, result_addr)?;
    Ok(stack.read_i32(result_addr))
}

/// Evaluates `expr` under [`context::CompileTimeContext`] and memcopies its result bytes into
/// `out_bytes`, which must already be exactly `program.type_size(expr.type_id(program))` bytes
/// long (spec.md §6). The caller is responsible for having already confirmed `expr` is a constant
/// expression (`Expression::looks_constant`); this function only ever evaluates, it does not
/// re-check syntactic constancy.
pub fn evaluate_constant_expression(program: &Program, expr: &Expression, out_bytes: &mut [u8]) -> Result<(), UnmetPrecondition> {
    let size = out_bytes.len();
    let mut stack = ProgramStack::new(DEFAULT_COMPILE_TIME_STACK_SIZE);
    let context = CompileTimeContext;
    let addr = stack.alloc(size).expect("compile-time evaluator stack exhausted");
    eval_expression(program, expr, &mut stack, &context, addr)?;
    out_bytes.copy_from_slice(stack.read(addr, size));
    Ok(())
}

/// Calls the zero-parameter, `bool`-returning concept function `function_id` under
/// [`context::CompileTimeContext`] (spec.md §4.4). `None` means the concept itself failed to
/// evaluate (e.g. it called through to an unmet precondition); the caller treats that the same as
/// an unsatisfied concept rather than propagating a compile-time `UnmetPrecondition` as a hard
/// analysis error.
pub fn evaluate_concept(program: &Program, _stack: &crate::analysis::ScopeStack, function_id: FunctionId) -> Option<bool> {
    let mut stack = ProgramStack::new(DEFAULT_COMPILE_TIME_STACK_SIZE);
    let context = CompileTimeContext;
    let addr = stack.alloc(1).expect("compile-time evaluator stack exhausted");
    call_function(program, function_id, &[], &mut stack, &context, addr).ok()?;
    Some(stack.read_bool(addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;

    #[test]
    fn evaluating_an_int_literal_yields_its_bytes() {
        let program = Program::new();
        let mut out = [0u8; 4];
        evaluate_constant_expression(&program, &Expression::IntLiteral(42), &mut out).unwrap();
        assert_eq!(i32::from_ne_bytes(out), 42);
    }
}
