//! Runs a complete [`Statement`] tree (spec.md ยง4.9): variable declarations, control flow, and the
//! destructor sweep every block/function runs over its own locals on the way out.
//!
//! Grounded on the original implementation's generic `run_statement` (declared in `interpreter.hh`,
//! body in the missing `interpreter.inl`); reconstructed from `complete_statement.hh`'s variant set
//! and the activation-record model documented alongside `ProgramStack`.

use crate::analysis::UnmetPrecondition;
use crate::eval::call::call_with_single_address_argument;
use crate::eval::context::ExecutionContext;
use crate::eval::control_flow::{ControlFlow, ControlFlowKind};
use crate::eval::expression::eval_expression;
use crate::eval::stack::ProgramStack;
use crate::program::{Expression, Program, Scope, Statement};

/// Runs `statements` in order, stopping at the first one that produces anything other than
/// [`ControlFlowKind::Nothing`].
pub fn run_statements(
    program: &Program,
    statements: &[Statement],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<ControlFlow, UnmetPrecondition> {
    for statement in statements {
        let flow = run_statement(program, statement, stack, context, return_address)?;
        if !flow.is_nothing() {
            return Ok(flow);
        }
    }
    Ok(ControlFlow::NOTHING)
}

/// Same as [`run_statements`], discarding the resulting [`ControlFlow`] -- used by
/// `Expression::StatementBlock`, whose result is the block's trailing value, not a function return.
pub fn run_statements_for_value(
    program: &Program,
    statements: &[Statement],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    run_statements(program, statements, stack, context, return_address)?;
    Ok(())
}

fn run_statement(
    program: &Program,
    statement: &Statement,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<ControlFlow, UnmetPrecondition> {
    match statement {
        Statement::VariableDeclaration { variable_offset, assigned_expression } => {
            let addr = (stack.base_pointer() as i64 + *variable_offset as i64) as usize;
            eval_expression(program, assigned_expression, stack, context, addr)?;
            Ok(ControlFlow::NOTHING)
        }

        Statement::ExpressionStatement(expr) => {
            eval_for_side_effect(program, expr, stack, context)?;
            Ok(ControlFlow::NOTHING)
        }

        Statement::Return(expr) => {
            eval_expression(program, expr, stack, context, return_address)?;
            Ok(ControlFlow { kind: ControlFlowKind::Return, destroyed_frame_size: 0 })
        }

        Statement::If { condition, then_case, else_case } => {
            let cond_addr = stack.alloc(1).expect("evaluator stack exhausted");
            eval_expression(program, condition, stack, context, cond_addr)?;
            let taken = stack.read_bool(cond_addr);
            stack.free_up_to(cond_addr);
            if taken {
                run_statement(program, then_case, stack, context, return_address)
            } else if let Some(else_case) = else_case {
                run_statement(program, else_case, stack, context, return_address)
            } else {
                Ok(ControlFlow::NOTHING)
            }
        }

        Statement::Block { scope, statements } => run_block(program, scope, statements, stack, context, return_address),

        Statement::While { condition, body } => {
            loop {
                let cond_addr = stack.alloc(1).expect("evaluator stack exhausted");
                eval_expression(program, condition, stack, context, cond_addr)?;
                let go = stack.read_bool(cond_addr);
                stack.free_up_to(cond_addr);
                if !go {
                    return Ok(ControlFlow::NOTHING);
                }
                let flow = run_statement(program, body, stack, context, return_address)?;
                match flow.kind {
                    ControlFlowKind::Break => return Ok(ControlFlow::NOTHING),
                    ControlFlowKind::Return => return Ok(flow),
                    ControlFlowKind::Continue | ControlFlowKind::Nothing => {}
                }
            }
        }

        Statement::For { scope, init_statement, condition, end_expression, body } => {
            run_for(program, scope, init_statement, condition, end_expression, body, stack, context, return_address)
        }

        Statement::Break => Ok(ControlFlow { kind: ControlFlowKind::Break, destroyed_frame_size: 0 }),
        Statement::Continue => Ok(ControlFlow { kind: ControlFlowKind::Continue, destroyed_frame_size: 0 }),
    }
}

fn run_block(
    program: &Program,
    scope: &Scope,
    statements: &[Statement],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<ControlFlow, UnmetPrecondition> {
    let frame_addr = stack
        .alloc_aligned(scope.stack_frame_size as usize, (scope.stack_frame_alignment as usize).max(1))
        .expect("evaluator stack exhausted");
    let flow = run_statements(program, statements, stack, context, return_address)?;
    run_destructors_for_scope(program, scope, stack, context)?;
    stack.free_up_to(frame_addr);
    Ok(if flow.is_nothing() { flow } else { flow.unwind_through(scope.stack_frame_size) })
}

#[allow(clippy::too_many_arguments)]
fn run_for(
    program: &Program,
    scope: &Scope,
    init_statement: &Statement,
    condition: &Expression,
    end_expression: &Expression,
    body: &Statement,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<ControlFlow, UnmetPrecondition> {
    let frame_addr = stack
        .alloc_aligned(scope.stack_frame_size as usize, (scope.stack_frame_alignment as usize).max(1))
        .expect("evaluator stack exhausted");

    let result = (|| -> Result<ControlFlow, UnmetPrecondition> {
        run_statement(program, init_statement, stack, context, return_address)?;
        loop {
            let cond_addr = stack.alloc(1).expect("evaluator stack exhausted");
            eval_expression(program, condition, stack, context, cond_addr)?;
            let go = stack.read_bool(cond_addr);
            stack.free_up_to(cond_addr);
            if !go {
                return Ok(ControlFlow::NOTHING);
            }

            let flow = run_statement(program, body, stack, context, return_address)?;
            match flow.kind {
                ControlFlowKind::Break => return Ok(ControlFlow::NOTHING),
                ControlFlowKind::Return => return Ok(flow),
                ControlFlowKind::Continue | ControlFlowKind::Nothing => {}
            }

            eval_for_side_effect(program, end_expression, stack, context)?;
        }
    })();

    run_destructors_for_scope(program, scope, stack, context)?;
    stack.free_up_to(frame_addr);
    result.map(|flow| if flow.is_nothing() { flow } else { flow.unwind_through(scope.stack_frame_size) })
}

/// Evaluates `expr` purely for its side effects, discarding any value it produces. Zero-sized
/// results (`void`, `null`, an overload-set value) need no temporary -- the current top of stack is
/// a legal address to "write" zero bytes to.
fn eval_for_side_effect(program: &Program, expr: &Expression, stack: &mut ProgramStack, context: &dyn ExecutionContext) -> Result<(), UnmetPrecondition> {
    let size = program.type_size(expr.type_id(program)) as usize;
    if size == 0 {
        let addr = stack.top_pointer();
        return eval_expression(program, expr, stack, context, addr);
    }
    let addr = stack.alloc(size).expect("evaluator stack exhausted");
    eval_expression(program, expr, stack, context, addr)?;
    stack.free_up_to(addr);
    Ok(())
}

/// Runs the destructor for each of `scope`'s own variables, in reverse declaration order --
/// reference-typed bindings (`mut&`/`const&` parameters and locals) are skipped since they don't
/// own what they point at.
///
/// `variable.offset` is local to `scope`; `scope.frame_base_offset` is the absolute offset (from
/// the enclosing function's base pointer) at which `scope`'s own frame begins, exactly as added
/// when the declaration that created this variable chose its address (`analysis::statement`'s
/// `current_scope_offset() + local_offset`). A nested block/`for` scope's locals sit above byte
/// zero of the function frame, so skipping this addend would run the destructor against the wrong
/// stack slot for any non-trivial local declared outside the function's own top-level scope.
pub(crate) fn run_destructors_for_scope(program: &Program, scope: &Scope, stack: &mut ProgramStack, context: &dyn ExecutionContext) -> Result<(), UnmetPrecondition> {
    for variable in scope.variables.iter().rev() {
        if variable.type_id.is_reference() {
            continue;
        }
        if program.is_trivially_destructible(variable.type_id) {
            continue;
        }
        let addr = (stack.base_pointer() as i64 + scope.frame_base_offset as i64 + variable.offset as i64) as usize;
        let destructor = program.destructor_for(variable.type_id);
        call_with_single_address_argument(program, destructor, addr, stack, context)?;
    }
    Ok(())
}
