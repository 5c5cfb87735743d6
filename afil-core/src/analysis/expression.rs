//! Expression analysis (spec.md ยง4.5): turns an [`incomplete::Expression`] into a complete
//! [`Expression`] with every node's type fully resolved, inserting conversion nodes where overload
//! resolution picked a parameter type that differs from the argument's own.
//!
//! Grounded on `ExpressionTree::resolve` / the per-node-kind visitors in the original
//! implementation's `expression.hh` and `program.hh`.

use crate::analysis::conversion::{common_type, insert_conversion_node};
use crate::analysis::lookup::{LookupResult, lookup_name_with_namespace};
use crate::analysis::scope_stack::ScopeStack;
use crate::analysis::{ErrorKind, PartialSyntaxError, dependent_type, instantiate, overload_resolution};
use crate::id::TypeId;
use crate::incomplete;
use crate::operator::Operator;
use crate::program::{Expression, Program, Scope, ScopeKind};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

/// Analyses `expr`, which must not reference anything beyond what's reachable at compile time
/// (array sizes, struct member defaults, concept bodies) -- used by contexts that need a value
/// right now rather than an expression tree to run later.
pub fn analyse_constant_expression(program: &mut Program, stack: &ScopeStack, expr: &incomplete::Expression) -> Result<Expression> {
    let analysed = analyse(program, stack, expr)?;
    if !analysed.looks_constant() {
        return Err(PartialSyntaxError::new(ErrorKind::NotAConstantExpression));
    }
    Ok(analysed)
}

/// Analyses a single expression node, recursing into children as needed.
pub fn analyse(program: &mut Program, stack: &ScopeStack, expr: &incomplete::Expression) -> Result<Expression> {
    use incomplete::{ExpressionValue as V, Literal};

    match &expr.value {
        V::Literal(Literal::Int(n)) => Ok(Expression::IntLiteral(*n)),
        V::Literal(Literal::Float(n)) => Ok(Expression::FloatLiteral(*n)),
        V::Literal(Literal::Bool(b)) => Ok(Expression::BoolLiteral(*b)),
        V::Literal(Literal::Char(c)) => Ok(Expression::CharLiteral(*c)),
        V::Literal(Literal::Byte(b)) => Ok(Expression::ByteLiteral(*b)),
        V::Literal(Literal::Null) => Ok(Expression::NullLiteral),

        V::TypeIdentifier(type_expr) => {
            let resolved = dependent_type::resolve_type(program, stack, type_expr)?;
            Ok(Expression::TypeLiteral(resolved))
        }

        V::Identifier { namespace_path, name } => analyse_identifier(program, stack, namespace_path, name),

        V::MemberAccess { object, member } => analyse_member_access(program, stack, object, member),

        V::Dereference(operand) => {
            let analysed = analyse(program, stack, operand)?;
            let operand_type = analysed.type_id(program);
            let pointee = program
                .pointee_type(operand_type.decay())
                .ok_or_else(|| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: "pointer".to_string(), found: program.abi_name(operand_type).to_string() }))?;
            let result_type = if operand_type.is_mutable() { pointee.make_mutable() } else { pointee.make_reference() };
            Ok(Expression::Dereference { pointer: Box::new(analysed), result_type })
        }

        V::AddressOf(operand) => {
            let analysed = analyse(program, stack, operand)?;
            let operand_type = analysed.type_id(program);
            let result_type = program.pointer_type_for(operand_type.decay());
            Ok(Expression::AddressOf { operand: Box::new(analysed), result_type })
        }

        V::Subscript { array, index } => {
            let array_expr = analyse(program, stack, array)?;
            let index_expr = analyse(program, stack, index)?;
            let array_type = array_expr.type_id(program);
            let value_type = program
                .array_value_type(array_type.decay())
                .or_else(|| program.pointee_type(array_type.decay()))
                .ok_or_else(|| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: "array or array pointer".to_string(), found: program.abi_name(array_type).to_string() }))?;
            let result_type = if array_type.is_mutable() { value_type.make_mutable() } else { value_type.make_reference() };
            Ok(Expression::Subscript { array: Box::new(array_expr), index: Box::new(index_expr), result_type })
        }

        V::FunctionLiteral(literal) => crate::analysis::statement::register_function_literal(program, stack, literal),

        V::FunctionCall { callee, template_arguments, arguments } => {
            analyse_function_call(program, stack, callee, template_arguments, arguments)
        }

        V::BinaryOperator { op, left, right } => analyse_binary_operator(program, stack, *op, left, right),

        V::UnaryOperator { op, operand } => analyse_unary_operator(program, stack, *op, operand),

        V::If { condition, then_case, else_case } => {
            let condition = analyse(program, stack, condition)?;
            let then_case = analyse(program, stack, then_case)?;
            let else_case = analyse(program, stack, else_case)?;
            let result_type = common_type(then_case.type_id(program), else_case.type_id(program));
            if result_type.is_none() {
                return Err(PartialSyntaxError::new(ErrorKind::TypeMismatch {
                    expected: program.abi_name(then_case.type_id(program)).to_string(),
                    found: program.abi_name(else_case.type_id(program)).to_string(),
                }));
            }
            let then_case_type = then_case.type_id(program);
            let then_case = insert_conversion_node(then_case, then_case_type, result_type)
                .map_err(|_| PartialSyntaxError::new(ErrorKind::NotAConstantExpression))?;
            let else_case_type = else_case.type_id(program);
            let else_case = insert_conversion_node(else_case, else_case_type, result_type)
                .map_err(|_| PartialSyntaxError::new(ErrorKind::NotAConstantExpression))?;
            Ok(Expression::If { condition: Box::new(condition), then_case: Box::new(then_case), else_case: Box::new(else_case), result_type })
        }

        V::Block(statements) => analyse_block_expression(program, stack, statements),

        V::Compiles { fake_variables, body } => analyse_compiles(program, stack, fake_variables, body),

        V::TypeOf(operand) => {
            let analysed = analyse(program, stack, operand)?;
            Ok(Expression::TypeLiteral(analysed.type_id(program).decay()))
        }

        V::DesignatedInitializer { constructed_type, members } => {
            analyse_designated_initializer(program, stack, constructed_type, members)
        }

        V::Cast { operand, target_type } => {
            let analysed = analyse(program, stack, operand)?;
            let target = dependent_type::resolve_type(program, stack, target_type)?;
            Ok(Expression::Reinterpret { operand: Box::new(analysed), target_type: target })
        }
    }
}

fn analyse_identifier(program: &mut Program, stack: &ScopeStack, namespace_path: &[String], name: &str) -> Result<Expression> {
    match lookup_name_with_namespace(program, stack, namespace_path, name) {
        LookupResult::Variable { variable_type, offset } => Ok(Expression::LocalVariable { variable_type, offset }),
        LookupResult::GlobalVariable { variable_type, offset } => Ok(Expression::GlobalVariable { variable_type, offset }),
        LookupResult::Constant(constant) => Ok(constant.value),
        LookupResult::OverloadSet(overload_set) => {
            let overload_set_type = program.type_for_overload_set(overload_set);
            Ok(Expression::OverloadSetValue { overload_set_type })
        }
        LookupResult::Type(type_id) => Ok(Expression::TypeLiteral(type_id)),
        LookupResult::StructTemplate(_) => Err(PartialSyntaxError::new(ErrorKind::UnknownIdentifier(name.to_string()))),
        LookupResult::NamespaceNotFound => Err(PartialSyntaxError::new(ErrorKind::NamespaceNotFound(namespace_path.join("::")))),
        LookupResult::Nothing => Err(PartialSyntaxError::new(ErrorKind::UnknownIdentifier(name.to_string()))),
    }
}

fn analyse_member_access(program: &mut Program, stack: &ScopeStack, object: &incomplete::Expression, member: &str) -> Result<Expression> {
    let owner = analyse(program, stack, object)?;
    let owner_type = owner.type_id(program);
    let struct_def = program
        .struct_for_type(owner_type.decay())
        .ok_or_else(|| PartialSyntaxError::new(ErrorKind::UnknownDesignatedInitializerMember { struct_name: program.abi_name(owner_type).to_string(), member: member.to_string() }))?;
    let index = struct_def
        .find_member_variable(member)
        .ok_or_else(|| PartialSyntaxError::new(ErrorKind::UnknownDesignatedInitializerMember { struct_name: program.abi_name(owner_type).to_string(), member: member.to_string() }))?;
    let member_variable = &struct_def.member_variables[index];
    let variable_type = if owner_type.is_mutable() { member_variable.type_id.make_mutable() } else { member_variable.type_id.make_reference() };
    Ok(Expression::MemberVariable { owner: Box::new(owner), variable_offset: member_variable.offset, variable_type })
}

fn analyse_function_call(
    program: &mut Program,
    stack: &ScopeStack,
    callee: &incomplete::Expression,
    template_arguments: &[crate::incomplete::TypeExpr],
    arguments: &[incomplete::Expression],
) -> Result<Expression> {
    let analysed_arguments: Vec<Expression> =
        arguments.iter().map(|a| analyse(program, stack, a)).collect::<Result<_>>()?;
    let argument_types: Vec<TypeId> = analysed_arguments.iter().map(|a| a.type_id(program)).collect();

    let name = callee_name(callee);
    let overload_set = match &callee.value {
        incomplete::ExpressionValue::Identifier { namespace_path, name } => {
            match lookup_name_with_namespace(program, stack, namespace_path, name) {
                LookupResult::OverloadSet(set) => set,
                LookupResult::Nothing => return Err(PartialSyntaxError::new(ErrorKind::UnknownIdentifier(name.clone()))),
                _ => return Err(PartialSyntaxError::new(ErrorKind::NoViableOverload(name.clone()))),
            }
        }
        _ => {
            let callee_expr = analyse(program, stack, callee)?;
            let callee_type = callee_expr.type_id(program);
            program
                .overload_set_for_type(callee_type.decay())
                .cloned()
                .ok_or_else(|| PartialSyntaxError::new(ErrorKind::NoViableOverload(name.clone())))?
        }
    };

    if !template_arguments.is_empty() {
        // Explicit template arguments bypass deduction entirely: instantiate every function
        // template in the set with exactly these arguments and resolve among the results.
        let resolved_args: Vec<TypeId> =
            template_arguments.iter().map(|t| dependent_type::resolve_type(program, stack, t)).collect::<Result<_>>()?;
        let mut instantiated = crate::program::OverloadSet::default();
        for template_id in &overload_set.function_template_ids {
            if let Ok(function_id) = crate::analysis::instantiate::instantiate_function_template(program, *template_id, &resolved_args) {
                instantiated.function_ids.push(function_id);
            }
        }
        let (function_id, return_type) = overload_resolution::resolve(program, &instantiated, &argument_types, &name)?;
        return finish_call(program, function_id, return_type, analysed_arguments);
    }

    let (function_id, return_type) = overload_resolution::resolve(program, &overload_set, &argument_types, &name)?;
    finish_call(program, function_id, return_type, analysed_arguments)
}

fn finish_call(program: &mut Program, function_id: crate::id::FunctionId, return_type: TypeId, arguments: Vec<Expression>) -> Result<Expression> {
    let parameter_types = program.parameter_types_of(function_id);
    let mut converted = Vec::with_capacity(arguments.len());
    for (arg, &param_type) in arguments.into_iter().zip(&parameter_types) {
        let arg_type = arg.type_id(program);
        let converted_arg = insert_conversion_node(arg, arg_type, param_type)
            .map_err(|_| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: program.abi_name(param_type).to_string(), found: program.abi_name(arg_type).to_string() }))?;
        converted.push(converted_arg);
    }
    Ok(Expression::FunctionCall { function_id, parameters: converted, return_type })
}

fn callee_name(callee: &incomplete::Expression) -> String {
    match &callee.value {
        incomplete::ExpressionValue::Identifier { name, .. } => name.clone(),
        _ => "<expression>".to_string(),
    }
}

/// True for expressions denoting a storage location an assignment can target -- variables, member
/// access, dereferences and subscripts, but not temporaries like literals or calls.
fn is_addressable(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::LocalVariable { .. }
            | Expression::GlobalVariable { .. }
            | Expression::MemberVariable { .. }
            | Expression::Dereference { .. }
            | Expression::Subscript { .. }
    )
}

fn analyse_binary_operator(program: &mut Program, stack: &ScopeStack, op: Operator, left: &incomplete::Expression, right: &incomplete::Expression) -> Result<Expression> {
    let left_expr = analyse(program, stack, left)?;
    let right_expr = analyse(program, stack, right)?;

    if op == Operator::Assign {
        if !is_addressable(&left_expr) {
            return Err(PartialSyntaxError::new(ErrorKind::Other("left-hand side of `=` is not assignable".to_string())));
        }
        let target_type = left_expr.type_id(program);
        let value_type = right_expr.type_id(program);
        let converted = insert_conversion_node(right_expr, value_type, target_type)
            .map_err(|_| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: program.abi_name(target_type).to_string(), found: program.abi_name(value_type).to_string() }))?;
        return Ok(Expression::Assign { target: Box::new(left_expr), value: Box::new(converted) });
    }

    let argument_types = [left_expr.type_id(program), right_expr.type_id(program)];

    let overload_set = match lookup_name_with_namespace(program, stack, &[], op.operator_function_name()) {
        LookupResult::OverloadSet(set) => set,
        _ => return Err(PartialSyntaxError::new(ErrorKind::NoViableOverload(op.operator_function_name().to_string()))),
    };
    let (function_id, return_type) = overload_resolution::resolve(program, &overload_set, &argument_types, op.operator_function_name())?;

    if op.is_relational() {
        return Ok(Expression::RelationalOperatorCall { function_id, op, parameters: Box::new([left_expr, right_expr]) });
    }
    finish_call(program, function_id, return_type, vec![left_expr, right_expr])
}

fn analyse_unary_operator(program: &mut Program, stack: &ScopeStack, op: Operator, operand: &incomplete::Expression) -> Result<Expression> {
    let operand_expr = analyse(program, stack, operand)?;
    let argument_types = [operand_expr.type_id(program)];
    let overload_set = match lookup_name_with_namespace(program, stack, &[], op.operator_function_name()) {
        LookupResult::OverloadSet(set) => set,
        _ => return Err(PartialSyntaxError::new(ErrorKind::NoViableOverload(op.operator_function_name().to_string()))),
    };
    let (function_id, return_type) = overload_resolution::resolve(program, &overload_set, &argument_types, op.operator_function_name())?;
    finish_call(program, function_id, return_type, vec![operand_expr])
}

fn analyse_block_expression(program: &mut Program, stack: &ScopeStack, statements: &[incomplete::Statement]) -> Result<Expression> {
    let mut inner = stack.clone();
    inner.push(Scope::new(), ScopeKind::Block);
    let analysed = crate::analysis::statement::analyse_statements(program, &mut inner, statements)?;
    let result_type = analysed
        .last()
        .and_then(|s| match s {
            crate::program::Statement::ExpressionStatement(e) => Some(e.type_id(program)),
            _ => None,
        })
        .unwrap_or(program.builtin_types.void);
    let (scope, _) = inner.pop();
    Ok(Expression::StatementBlock { scope, statements: analysed, result_type })
}

/// `compiles { let x: T = ...; body }`: probes whether `body` analyses successfully with the fake
/// variables bound, without ever surfacing its errors -- a failed probe simply yields `false`
/// (spec.md ยง4.5).
fn analyse_compiles(
    program: &mut Program,
    stack: &ScopeStack,
    fake_variables: &[(String, crate::incomplete::TypeExpr)],
    body: &[incomplete::Expression],
) -> Result<Expression> {
    // The probe runs against a cloned `Program`, but `instantiate::CACHE` is a thread-local shared
    // with the real program -- any template instantiated while probing would otherwise leave a
    // cache entry whose id indexes into this discarded clone. Snapshot/restore around the whole
    // probe so a `compiles` probe never has an observable side effect (spec.md ยง8 "`compiles`
    // soundness", "Cache memoisation").
    instantiate::with_snapshot_cache(|| {
        let mut probe_program = program.clone();
        let mut probe_stack = stack.clone();
        let mut scope = Scope::new();
        let mut ok = true;
        for (name, type_expr) in fake_variables {
            match dependent_type::resolve_type(&mut probe_program, &probe_stack, type_expr) {
                Ok(type_id) => {
                    let size = probe_program.type_size(type_id);
                    let align = probe_program.type_alignment(type_id);
                    scope.add_variable(name.clone(), type_id, size, align);
                }
                Err(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            probe_stack.push(scope, ScopeKind::Block);
            for expr in body {
                if analyse(&mut probe_program, &probe_stack, expr).is_err() {
                    ok = false;
                    break;
                }
            }
        }
        Ok(Expression::BoolLiteral(ok))
    })
}

fn analyse_designated_initializer(
    program: &mut Program,
    stack: &ScopeStack,
    constructed_type: &crate::incomplete::TypeExpr,
    members: &[incomplete::DesignatedInitializerMember],
) -> Result<Expression> {
    let type_id = dependent_type::resolve_type(program, stack, constructed_type)?;
    let struct_def = program
        .struct_for_type(type_id)
        .ok_or_else(|| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: "struct".to_string(), found: program.abi_name(type_id).to_string() }))?
        .clone();

    let mut provided: std::collections::HashMap<String, Expression> = std::collections::HashMap::new();
    for member in members {
        let analysed = analyse(program, stack, &member.value)?;
        if provided.insert(member.name.clone(), analysed).is_some() {
            return Err(PartialSyntaxError::new(ErrorKind::DuplicateDesignatedInitializerMember(member.name.clone())));
        }
    }
    for name in provided.keys() {
        if struct_def.find_member_variable(name).is_none() {
            return Err(PartialSyntaxError::new(ErrorKind::UnknownDesignatedInitializerMember {
                struct_name: program.abi_name(type_id).to_string(),
                member: name.clone(),
            }));
        }
    }

    let mut parameters = Vec::with_capacity(struct_def.member_variables.len());
    for member_variable in &struct_def.member_variables {
        let value = if let Some(expr) = provided.remove(&member_variable.name) {
            let value_type = expr.type_id(program);
            insert_conversion_node(expr, value_type, member_variable.type_id)
                .map_err(|_| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: program.abi_name(member_variable.type_id).to_string(), found: program.abi_name(value_type).to_string() }))?
        } else if let Some(default) = &member_variable.initializer_expression {
            default.clone()
        } else {
            return Err(PartialSyntaxError::new(ErrorKind::UnknownDesignatedInitializerMember {
                struct_name: program.abi_name(type_id).to_string(),
                member: member_variable.name.clone(),
            }));
        };
        parameters.push(value);
    }

    Ok(Expression::StructConstructor { constructed_type: type_id, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literal_has_int_type() {
        let program = Program::new();
        let expr = Expression::IntLiteral(3);
        assert_eq!(expr.type_id(&program), program.builtin_types.int);
    }
}
