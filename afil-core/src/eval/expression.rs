//! Evaluates a complete [`Expression`] node into an absolute stack address (spec.md ยง4.9).
//!
//! Every variant writes exactly `program.type_size(expr.type_id(program))` bytes at
//! `return_address`: literals write their bits directly, reference-typed reads copy the stored
//! pointer (size already accounts for that -- see [`Program::type_size`]), and `AddressOf` is the
//! one place that writes a pointer regardless of the node's own declared type.
//!
//! Grounded on the original implementation's generic `eval_expression` (the two overloads in
//! `interpreter.hh`, whose bodies live in the missing `interpreter.inl`); the structure here is
//! reconstructed from the node shapes in `complete_expression.hh` and the call-protocol fragments
//! that do survive in `interpreter.cc`.

use crate::analysis::UnmetPrecondition;
use crate::eval::call::call_function;
use crate::eval::context::ExecutionContext;
use crate::eval::stack::ProgramStack;
use crate::id::TypeId;
use crate::operator::Operator;
use crate::program::{BuiltIn, ConversionKind, Expression, Program, TypeKind};

/// Evaluates `expr`, writing its value at `return_address`.
pub fn eval_expression(
    program: &Program,
    expr: &Expression,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    match expr {
        Expression::IntLiteral(value) => stack.write_i32(return_address, *value as i32),
        Expression::FloatLiteral(value) => stack.write_f64(return_address, *value),
        Expression::BoolLiteral(value) => stack.write_bool(return_address, *value),
        Expression::CharLiteral(value) => stack.write(return_address, &(*value as u32).to_ne_bytes()),
        Expression::ByteLiteral(value) => stack.write(return_address, &[*value]),
        Expression::NullLiteral => {}
        Expression::TypeLiteral(type_id) => stack.write(return_address, &type_id.index().to_ne_bytes()),

        Expression::StructConstructor { constructed_type, parameters } => {
            eval_struct_constructor(program, *constructed_type, parameters, stack, context, return_address)?;
        }

        Expression::LocalVariable { variable_type, offset } => {
            let addr = offset_address(stack.base_pointer(), *offset);
            copy_value(program, *variable_type, addr, stack, return_address);
        }
        Expression::GlobalVariable { variable_type, offset } => {
            let addr = offset_address(0, *offset);
            copy_value(program, *variable_type, addr, stack, return_address);
        }
        Expression::MemberVariable { owner, variable_offset, variable_type } => {
            let owner_addr = data_address(program, owner, stack, context)?;
            let addr = offset_address(owner_addr, *variable_offset);
            copy_value(program, *variable_type, addr, stack, return_address);
        }

        Expression::FunctionCall { function_id, parameters, .. } => {
            call_function(program, *function_id, parameters, stack, context, return_address)?;
        }
        Expression::RelationalOperatorCall { function_id, op, parameters } => {
            eval_relational(program, *function_id, *op, &parameters[..], stack, context, return_address)?;
        }

        Expression::OverloadSetValue { .. } => {}

        Expression::If { condition, then_case, else_case, .. } => {
            let cond_addr = stack.alloc(1).expect("evaluator stack exhausted");
            eval_expression(program, condition, stack, context, cond_addr)?;
            if stack.read_bool(cond_addr) {
                eval_expression(program, then_case, stack, context, return_address)?;
            } else {
                eval_expression(program, else_case, stack, context, return_address)?;
            }
        }

        Expression::StatementBlock { statements, .. } => {
            crate::eval::statement::run_statements_for_value(program, statements, stack, context, return_address)?;
        }

        Expression::Dereference { pointer, result_type } => {
            let addr = eval_pointer_value(program, pointer, stack, context)?;
            copy_value(program, *result_type, addr, stack, return_address);
        }
        Expression::AddressOf { operand, .. } => {
            let addr = data_address(program, operand, stack, context)?;
            stack.write_usize(return_address, addr);
        }
        Expression::Subscript { array, index, result_type } => {
            let addr = subscript_address(program, array, index, *result_type, stack, context)?;
            copy_value(program, *result_type, addr, stack, return_address);
        }

        Expression::Reinterpret { operand, target_type } => {
            eval_cast(program, operand, *target_type, stack, context, return_address)?;
        }
        Expression::Conversion { operand, kind, .. } => {
            eval_conversion(program, operand, *kind, stack, context, return_address)?;
        }

        Expression::Assign { target, value } => {
            let addr = data_address(program, target, stack, context)?;
            let size = program.type_size(target.type_id(program)) as usize;
            if size > 0 {
                let tmp = stack.alloc(size).expect("evaluator stack exhausted");
                eval_expression(program, value, stack, context, tmp)?;
                stack.copy_within(tmp, addr, size);
            } else {
                eval_expression(program, value, stack, context, addr)?;
            }
        }
    }
    Ok(())
}

/// Copies a variable's own stored representation (a raw value, or a pointer for a reference-typed
/// binding -- `type_size` already returns a pointer's width in that case) from `addr` to
/// `return_address`.
fn copy_value(program: &Program, type_id: TypeId, addr: usize, stack: &mut ProgramStack, return_address: usize) {
    let size = program.type_size(type_id) as usize;
    if size == 0 {
        return;
    }
    let bytes = stack.read(addr, size).to_vec();
    stack.write(return_address, &bytes);
}

fn offset_address(base: usize, offset: i32) -> usize {
    (base as i64 + offset as i64) as usize
}

/// The address of the actual value a place expression denotes, dereferencing a reference-typed
/// binding along the way -- what `&expr`, `expr.member`, `expr[i]` and `*expr` all need as a base.
/// Anything that isn't itself a place (a call, a literal, a block result, ...) is materialised into
/// a fresh stack temporary and that temporary's address is returned -- matching
/// `ConversionKind::ValueToConstRef`'s "value materialised into a temporary" note.
pub(crate) fn data_address(
    program: &Program,
    expr: &Expression,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
) -> Result<usize, UnmetPrecondition> {
    match expr {
        Expression::LocalVariable { variable_type, offset } => {
            let addr = offset_address(stack.base_pointer(), *offset);
            Ok(if variable_type.is_reference() { stack.read_usize(addr) } else { addr })
        }
        Expression::GlobalVariable { variable_type, offset } => {
            let addr = offset_address(0, *offset);
            Ok(if variable_type.is_reference() { stack.read_usize(addr) } else { addr })
        }
        Expression::MemberVariable { owner, variable_offset, .. } => {
            let owner_addr = data_address(program, owner, stack, context)?;
            Ok(offset_address(owner_addr, *variable_offset))
        }
        Expression::Dereference { pointer, .. } => eval_pointer_value(program, pointer, stack, context),
        Expression::Subscript { array, index, result_type } => subscript_address(program, array, index, *result_type, stack, context),
        Expression::Conversion { operand, kind: ConversionKind::Identity | ConversionKind::MutRefToConstRef, .. } => {
            data_address(program, operand, stack, context)
        }
        _ => materialize(program, expr, stack, context),
    }
}

/// Evaluates `expr` into a fresh stack temporary sized to its own type and returns that address.
fn materialize(program: &Program, expr: &Expression, stack: &mut ProgramStack, context: &dyn ExecutionContext) -> Result<usize, UnmetPrecondition> {
    let type_id = expr.type_id(program);
    let size = program.type_size(type_id) as usize;
    let align = (program.type_alignment(type_id) as usize).max(1);
    let addr = stack.alloc_aligned(size, align).expect("evaluator stack exhausted");
    eval_expression(program, expr, stack, context, addr)?;
    Ok(addr)
}

/// Evaluates a pointer-valued expression (whose own representation is a plain `usize`) and reads
/// it back, for `*p`/`a[i]`-style indirection through an explicit pointer rather than a reference.
fn eval_pointer_value(program: &Program, expr: &Expression, stack: &mut ProgramStack, context: &dyn ExecutionContext) -> Result<usize, UnmetPrecondition> {
    let addr = stack.alloc(std::mem::size_of::<usize>()).expect("evaluator stack exhausted");
    eval_expression(program, expr, stack, context, addr)?;
    Ok(stack.read_usize(addr))
}

fn eval_int_value(program: &Program, expr: &Expression, stack: &mut ProgramStack, context: &dyn ExecutionContext) -> Result<i64, UnmetPrecondition> {
    let addr = stack.alloc(4).expect("evaluator stack exhausted");
    eval_expression(program, expr, stack, context, addr)?;
    Ok(stack.read_i32(addr) as i64)
}

fn subscript_address(
    program: &Program,
    array: &Expression,
    index: &Expression,
    result_type: TypeId,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
) -> Result<usize, UnmetPrecondition> {
    let element_size = program.type_size(result_type.decay()) as i64;
    let array_type = array.type_id(program);
    let base = if program.type_with_id(array_type.decay()).is_array() {
        data_address(program, array, stack, context)?
    } else {
        eval_pointer_value(program, array, stack, context)?
    };
    let index = eval_int_value(program, index, stack, context)?;
    Ok((base as i64 + index * element_size) as usize)
}

fn eval_struct_constructor(
    program: &Program,
    constructed_type: TypeId,
    parameters: &[Expression],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    if let Some(struct_) = program.struct_for_type(constructed_type) {
        for (member, parameter) in struct_.member_variables.iter().zip(parameters) {
            eval_expression(program, parameter, stack, context, offset_address(return_address, member.offset))?;
        }
    } else if let Some(element_type) = program.array_value_type(constructed_type) {
        let element_size = program.type_size(element_type) as usize;
        for (index, parameter) in parameters.iter().enumerate() {
            eval_expression(program, parameter, stack, context, return_address + index * element_size)?;
        }
    }
    Ok(())
}

/// `<, <=, >, >=, !=` are synthesized against `==`/`<=>` at analysis time (spec.md ยง4.5); here they
/// are unpacked back into "call the underlying overload, then interpret its result".
fn eval_relational(
    program: &Program,
    function_id: crate::id::FunctionId,
    op: Operator,
    parameters: &[Expression],
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    match op {
        Operator::NotEqual => {
            let addr = stack.alloc(1).expect("evaluator stack exhausted");
            call_function(program, function_id, parameters, stack, context, addr)?;
            stack.write_bool(return_address, !stack.read_bool(addr));
        }
        Operator::Less | Operator::LessEqual | Operator::Greater | Operator::GreaterEqual => {
            let addr = stack.alloc(4).expect("evaluator stack exhausted");
            call_function(program, function_id, parameters, stack, context, addr)?;
            let ordering = stack.read_i32(addr);
            let result = match op {
                Operator::Less => ordering < 0,
                Operator::LessEqual => ordering <= 0,
                Operator::Greater => ordering > 0,
                Operator::GreaterEqual => ordering >= 0,
                _ => unreachable!(),
            };
            stack.write_bool(return_address, result);
        }
        _ => unreachable!("RelationalOperatorCall only ever carries a relational operator"),
    }
    Ok(())
}

fn builtin_kind(program: &Program, type_id: TypeId) -> Option<BuiltIn> {
    match program.type_with_id(type_id.decay()).kind {
        TypeKind::BuiltIn(kind) => Some(kind),
        _ => None,
    }
}

/// `expr as target_type` (spec.md §4.5): between two primitive numeric kinds this performs the
/// same value-preserving conversion Rust's own `as` does (e.g. `3.0 as int` truncates to `3`, not
/// a bit-for-bit reinterpretation of the float's representation). Any other pairing (pointers,
/// structs) has nothing sensible to convert and falls back to copying the operand's own bytes
/// unchanged, which is only well-typed when the two types already share a representation.
fn eval_cast(
    program: &Program,
    operand: &Expression,
    target_type: TypeId,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    let source_kind = builtin_kind(program, operand.type_id(program));
    let target_kind = builtin_kind(program, target_type);
    match (source_kind, target_kind) {
        (Some(source_kind), Some(target_kind)) => {
            let value = eval_numeric_value(program, operand, source_kind, stack, context)?;
            write_numeric_value(stack, return_address, target_kind, value);
            Ok(())
        }
        _ => eval_expression(program, operand, stack, context, return_address),
    }
}

fn eval_numeric_value(
    program: &Program,
    expr: &Expression,
    kind: BuiltIn,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
) -> Result<f64, UnmetPrecondition> {
    let size = (program.type_size(expr.type_id(program)) as usize).max(1);
    let addr = stack.alloc(size).expect("evaluator stack exhausted");
    eval_expression(program, expr, stack, context, addr)?;
    Ok(match kind {
        BuiltIn::Int => stack.read_i32(addr) as f64,
        BuiltIn::Float => stack.read_f64(addr),
        BuiltIn::Bool => {
            if stack.read_bool(addr) {
                1.0
            } else {
                0.0
            }
        }
        BuiltIn::Char => u32::from_ne_bytes(stack.read(addr, 4).try_into().expect("char is 4 bytes")) as f64,
        BuiltIn::Byte => stack.read(addr, 1)[0] as f64,
        BuiltIn::Type | BuiltIn::Null | BuiltIn::Void => 0.0,
    })
}

fn write_numeric_value(stack: &mut ProgramStack, addr: usize, kind: BuiltIn, value: f64) {
    match kind {
        BuiltIn::Int => stack.write_i32(addr, value as i32),
        BuiltIn::Float => stack.write_f64(addr, value),
        BuiltIn::Bool => stack.write_bool(addr, value != 0.0),
        BuiltIn::Char => stack.write(addr, &(value as u32).to_ne_bytes()),
        BuiltIn::Byte => stack.write(addr, &[value as u8]),
        BuiltIn::Type | BuiltIn::Null | BuiltIn::Void => {}
    }
}

fn eval_conversion(
    program: &Program,
    operand: &Expression,
    kind: ConversionKind,
    stack: &mut ProgramStack,
    context: &dyn ExecutionContext,
    return_address: usize,
) -> Result<(), UnmetPrecondition> {
    match kind {
        ConversionKind::Identity | ConversionKind::MutRefToConstRef => {
            // Same bit pattern either way (both are pointer-sized references); only the type
            // checker's view of mutability changes.
            eval_expression(program, operand, stack, context, return_address)
        }
        ConversionKind::RefToValue => {
            let addr = data_address(program, operand, stack, context)?;
            copy_value(program, operand.type_id(program).decay(), addr, stack, return_address);
            Ok(())
        }
        ConversionKind::ValueToConstRef => {
            let addr = materialize(program, operand, stack, context)?;
            stack.write_usize(return_address, addr);
            Ok(())
        }
    }
}
