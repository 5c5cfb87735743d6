//! The function-call protocol (spec.md ยง4.9): how arguments are laid out, how a callee's
//! activation record is entered, and how preconditions gate a program-defined body.
//!
//! Grounded on `call_function`/`call_function_with_parameters_already_set` in the original
//! implementation's `interpreter.hh`/`interpreter.cc` -- the split mirrors theirs exactly: argument
//! evaluation (which needs the caller's frame) is a separate step from running the callee's body
//! (which needs the callee's frame), so a caller that has already placed its arguments elsewhere
//! (e.g. a synthesized special member forwarding its own parameter) can skip straight to the
//! second half.

use crate::analysis::UnmetPrecondition;
use crate::eval::context::ExecutionContext;
use crate::eval::control_flow::ControlFlowKind;
use crate::eval::expression::eval_expression;
use crate::eval::stack::ProgramStack;
use crate::id::{FunctionId, FunctionIdKind, function_id_constants};
use crate::program::{Expression, Program};

/// Evaluates `parameters` into a freshly reserved argument block (using the caller's still-active
/// base pointer, since the arguments may themselves reference the caller's locals), then runs
/// `function_id`. Always restores the stack to its pre-call top on the way out, including when an
/// argument or the call itself fails.
pub fn call_function(
    program: &Program,
    function_id: FunctionId,
    parameters: &[Expression],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    let pre_call_top = stack.top_pointer();
    let offsets = parameter_offsets(program, function_id);
    let parameter_size = program.parameter_size(function_id) as usize;
    let max_alignment = offsets
        .iter()
        .zip(program.parameter_types_of(function_id))
        .map(|(_, t)| program.type_alignment(t) as usize)
        .max()
        .unwrap_or(1)
        .max(1);
    let params_addr = stack.alloc_aligned(parameter_size, max_alignment).expect("evaluator stack exhausted");

    for (parameter, offset) in parameters.iter().zip(&offsets) {
        eval_expression(program, parameter, stack, context, params_addr + offset)?;
    }

    let result = call_function_with_parameters_already_set(program, function_id, stack, context, params_addr, return_address);
    stack.free_up_to(pre_call_top);
    result
}

/// Byte offset of each parameter within its call's argument block, in declaration order.
///
/// Program-defined functions reuse the offsets `Scope::add_variable` already assigned their
/// parameter variables (so this can never drift out of sync with how locals are laid out).
/// Intrinsics are packed with no inter-field padding, matching `Program::parameter_size`'s plain
/// sum of sizes. Extern functions are packed with ordinary `repr(C)`-style per-field alignment,
/// since the marshalling thunk on the other side of the FFI boundary expects a normal C struct.
fn parameter_offsets(program: &Program, function_id: FunctionId) -> Vec<usize> {
    match function_id.kind {
        FunctionIdKind::Program => program.functions[function_id.index as usize]
            .scope
            .variables
            .iter()
            .take(program.functions[function_id.index as usize].parameter_count as usize)
            .map(|v| v.offset as usize)
            .collect(),
        FunctionIdKind::Intrinsic => {
            let mut offset = 0usize;
            program
                .parameter_types_of(function_id)
                .iter()
                .map(|t| {
                    let here = offset;
                    offset += program.type_size(*t) as usize;
                    here
                })
                .collect()
        }
        FunctionIdKind::ImportedExtern => {
            let mut offset = 0usize;
            program
                .parameter_types_of(function_id)
                .iter()
                .map(|t| {
                    let align = (program.type_alignment(*t) as usize).max(1);
                    offset = (offset + align - 1) & !(align - 1);
                    let here = offset;
                    offset += program.type_size(*t) as usize;
                    here
                })
                .collect()
        }
    }
}

/// Runs `function_id` against an argument block already sitting at `params_addr`, dispatching on
/// which of `program`'s three function vectors it names.
pub(crate) fn call_function_with_parameters_already_set(
    program: &Program,
    function_id: FunctionId,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    params_addr: usize,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    match function_id.kind {
        FunctionIdKind::ImportedExtern => call_extern_function(program, function_id, context, stack, params_addr, return_address),
        FunctionIdKind::Intrinsic => {
            call_intrinsic_function(program, function_id, stack, params_addr, return_address);
            Ok(())
        }
        FunctionIdKind::Program => call_program_function(program, function_id, stack, context, params_addr, return_address),
    }
}

fn call_program_function(
    program: &Program,
    function_id: FunctionId,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    params_addr: usize,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    let function = &program.functions[function_id.index as usize];
    let extra_locals = (function.scope.stack_frame_size - function.parameter_size).max(0) as usize;
    stack.alloc(extra_locals).expect("evaluator stack exhausted");

    stack.with_base_pointer(params_addr, |stack| {
        for (index, precondition) in function.preconditions.iter().enumerate() {
            let cond_addr = stack.alloc(1).expect("evaluator stack exhausted");
            eval_expression(program, precondition, stack, context, cond_addr)?;
            let holds = stack.read_bool(cond_addr);
            stack.free_up_to(cond_addr);
            if !holds {
                return Err(UnmetPrecondition { function_id, precondition_index: index as u32 });
            }
        }

        let flow = crate::eval::statement::run_statements(program, &function.statements, stack, context, return_address)?;
        debug_assert!(matches!(flow.kind, ControlFlowKind::Nothing | ControlFlowKind::Return));

        crate::eval::statement::run_destructors_for_scope(program, &function.scope, stack, context)
    })
}

/// Rejected under [`crate::eval::context::CompileTimeContext`] (spec.md ยง4.8): calling into native
/// code has no meaning while folding a constant expression, and the analyser never hands the
/// compile-time evaluator a tree that calls one. Reaching this under `CompileTimeContext` is an
/// internal defect, not a user-facing error.
fn call_extern_function(
    program: &Program,
    function_id: FunctionId,
    context: &dyn ExecutionContext,
    stack: &mut ProgramStack,
    params_addr: usize,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    assert!(
        context.is_function_callable(program, function_id),
        "extern function `{}` is not callable {}",
        program.abi_name_of_function(function_id),
        context.label()
    );
    let extern_function = &program.extern_functions[function_id.index as usize];
    let parameter_size = extern_function.parameter_size as usize;
    let return_size = program.type_size(extern_function.return_type) as usize;
    // SAFETY: `caller` is the binding layer's thunk (out of scope, per spec.md ยง1); it is handed
    // raw pointers into the evaluator stack's own buffer and must not retain them past the call.
    unsafe {
        (extern_function.caller)(
            extern_function.function_pointer,
            stack.pointer_at(params_addr, parameter_size),
            stack.pointer_at_mut(return_address, return_size),
        );
    }
    Ok(())
}

/// Arithmetic/comparison/bitwise/logical built-ins (see [`crate::intrinsics`]), dispatched by the
/// name they were registered under. Each reads its operands straight out of the argument block at
/// `params_addr` and writes its result at `return_address`.
pub(crate) fn call_intrinsic_function(program: &Program, function_id: FunctionId, stack: &mut ProgramStack, params_addr: usize, return_address: usize) {
    let intrinsic = &program.intrinsic_functions[function_id.index as usize];
    let int = program.builtin_types.int;

    let operand_offsets = {
        let mut offset = 0usize;
        intrinsic
            .parameter_types
            .iter()
            .map(|t| {
                let here = offset;
                offset += program.type_size(*t) as usize;
                here
            })
            .collect::<Vec<_>>()
    };

    let is_float = intrinsic.parameter_types.first() == Some(&program.builtin_types.float);
    let is_bool = intrinsic.parameter_types.first() == Some(&program.builtin_types.bool);

    if is_bool {
        let a = stack.read_bool(params_addr + operand_offsets[0]);
        let b = operand_offsets.get(1).map(|&o| stack.read_bool(params_addr + o));
        let result = match (intrinsic.name, b) {
            ("and", Some(b)) => a && b,
            ("or", Some(b)) => a || b,
            ("xor", Some(b)) => a != b,
            ("not", None) => !a,
            _ => unreachable!("unregistered bool intrinsic `{}`", intrinsic.name),
        };
        stack.write_bool(return_address, result);
        return;
    }

    if is_float {
        let a = stack.read_f64(params_addr + operand_offsets[0]);
        let b = operand_offsets.get(1).map(|&o| stack.read_f64(params_addr + o));
        match (intrinsic.name, b) {
            ("+", Some(b)) => stack.write_f64(return_address, a + b),
            ("-", Some(b)) => stack.write_f64(return_address, a - b),
            ("*", Some(b)) => stack.write_f64(return_address, a * b),
            ("/", Some(b)) => stack.write_f64(return_address, a / b),
            ("-", None) => stack.write_f64(return_address, -a),
            ("==", Some(b)) => stack.write_bool(return_address, a == b),
            ("<=>", Some(b)) => stack.write_i32(return_address, three_way(a.partial_cmp(&b))),
            other => unreachable!("unregistered float intrinsic {other:?}"),
        }
        return;
    }

    // int (and int-returning comparisons over int).
    let a = stack.read_i32(params_addr + operand_offsets[0]);
    let b = operand_offsets.get(1).map(|&o| stack.read_i32(params_addr + o));
    let _ = int;
    match (intrinsic.name, b) {
        ("+", Some(b)) => stack.write_i32(return_address, a.wrapping_add(b)),
        ("-", Some(b)) => stack.write_i32(return_address, a.wrapping_sub(b)),
        ("*", Some(b)) => stack.write_i32(return_address, a.wrapping_mul(b)),
        ("/", Some(b)) => stack.write_i32(return_address, a.wrapping_div(b)),
        ("%", Some(b)) => stack.write_i32(return_address, a.wrapping_rem(b)),
        ("-", None) => stack.write_i32(return_address, a.wrapping_neg()),
        ("==", Some(b)) => stack.write_bool(return_address, a == b),
        ("<=>", Some(b)) => stack.write_i32(return_address, three_way(a.partial_cmp(&b))),
        ("&", Some(b)) => stack.write_i32(return_address, a & b),
        ("|", Some(b)) => stack.write_i32(return_address, a | b),
        ("^", Some(b)) => stack.write_i32(return_address, a ^ b),
        ("<<", Some(b)) => stack.write_i32(return_address, a.wrapping_shl(b as u32)),
        (">>", Some(b)) => stack.write_i32(return_address, a.wrapping_shr(b as u32)),
        ("~", None) => stack.write_i32(return_address, !a),
        other => unreachable!("unregistered int intrinsic {other:?}"),
    }
}

fn three_way(ordering: Option<std::cmp::Ordering>) -> i32 {
    match ordering.expect("NaN compared with <=>") {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// A destructor/copy/move constructor's `self`/`other` parameters are always references, so a
/// zero-argument-looking call site (the synthesized special members only ever pass `&variable`
/// expressions, never plain values) still goes through the ordinary [`call_function`] path with an
/// `Expression::AddressOf` argument. This helper exists for callers that already hold a raw address
/// rather than an `Expression` -- block/function scope exit, running a destructor on a local that
/// has no surviving AST node once the block finishes.
pub(crate) fn call_with_single_address_argument(
    program: &Program,
    function_id: FunctionId,
    address: usize,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
) -> Result<(), UnmetPrecondition> {
    if function_id == function_id_constants::INVALID {
        return Ok(());
    }
    let pre_call_top = stack.top_pointer();
    let alignment = std::mem::size_of::<usize>();
    let params_addr = stack.alloc_aligned(alignment, alignment).expect("evaluator stack exhausted");
    stack.write_usize(params_addr, address);
    let return_address = stack.top_pointer();
    let result = call_function_with_parameters_already_set(program, function_id, stack, context, params_addr, return_address);
    stack.free_up_to(pre_call_top);
    result
}
