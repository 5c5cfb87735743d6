//! Built-in operations seeded into every [`Program`]: arithmetic/comparison/bitwise operators over
//! the primitive types, and the `size` function template used by the standard array machinery.
//!
//! These are [`IntrinsicFunction`]/[`IntrinsicFunctionTemplate`] entries rather than ordinary
//! [`Function`]s: they carry no statement list for the analyser to walk, only a name the
//! evaluator recognises directly (see `crate::eval::call::call_intrinsic_function`).
//!
//! `==` returns `bool` directly; `<=>` returns a three-way `int` (negative/zero/positive) the way
//! the original implementation's built-in relational operators do, so `Operator::Less` and its
//! siblings can all be synthesized from the same comparison call (spec.md ยง4.5).

use crate::id::{FunctionId, FunctionIdKind};
use crate::program::{FunctionName, FunctionTemplateName, IntrinsicFunction, IntrinsicFunctionTemplate, Program, TemplateParamType};

/// Registers the arithmetic/comparison/bitwise operator overloads for `int`/`float`/`bool`, plus
/// the `size` intrinsic template, into `program.global_scope` so ordinary name lookup finds them
/// like any user-defined overload.
pub fn register(program: &mut Program) {
    let int = program.builtin_types.int;
    let float = program.builtin_types.float;
    let bool_ = program.builtin_types.bool;

    let mut add = |name: &'static str, params: Vec<crate::id::TypeId>, ret: crate::id::TypeId| {
        program.intrinsic_functions.push(IntrinsicFunction {
            return_type: ret,
            parameter_types: params,
            name,
            is_callable_at_runtime: true,
        });
        let id = FunctionId::new(FunctionIdKind::Intrinsic, (program.intrinsic_functions.len() - 1) as u32);
        program.global_scope.scope.functions.push(FunctionName { name: name.to_string(), id });
    };

    for (name, ret) in [("+", int), ("-", int), ("*", int), ("/", int), ("%", int)] {
        add(name, vec![int, int], ret);
    }
    for (name, ret) in [("+", float), ("-", float), ("*", float), ("/", float)] {
        add(name, vec![float, float], ret);
    }
    add("==", vec![int, int], bool_);
    add("==", vec![float, float], bool_);
    add("<=>", vec![int, int], int);
    add("<=>", vec![float, float], int);
    for name in ["and", "or", "xor"] {
        add(name, vec![bool_, bool_], bool_);
    }
    add("not", vec![bool_], bool_);
    add("-", vec![int], int);
    add("-", vec![float], float);
    for name in ["&", "|", "^", "<<", ">>"] {
        add(name, vec![int, int], int);
    }
    add("~", vec![int], int);

    register_templates(program);
}

fn register_templates(program: &mut Program) {
    program.intrinsic_function_templates.push(IntrinsicFunctionTemplate {
        instantiation_function: instantiate_size,
        parameter_types: vec![TemplateParamType::template_parameter(0)],
        concepts: Vec::new(),
        abi_name: "size".to_string(),
        template_parameter_count: 1,
    });
    let id = crate::id::FunctionTemplateId::new(
        crate::id::FunctionTemplateIdKind::Intrinsic,
        (program.intrinsic_function_templates.len() - 1) as u32,
    );
    program
        .global_scope
        .scope
        .function_templates
        .push(FunctionTemplateName { name: "size".to_string(), id });
}

/// `size(array)`: synthesized per array type, returns its element count as an `int` constant
/// expression (so it folds at compile time when the array size is itself constant).
fn instantiate_size(parameters: &[crate::id::TypeId], program: &mut Program) -> crate::program::Function {
    let array_type = parameters[0];
    let size = program.array_size(array_type).unwrap_or(0);
    let mut scope = crate::program::Scope::new();
    let align = program.type_alignment(array_type);
    scope.add_variable("array", array_type.make_reference(), program.type_size(array_type), align);
    crate::program::Function {
        scope,
        parameter_count: 1,
        parameter_size: program.type_size(array_type),
        return_type: program.builtin_types.int,
        preconditions: Vec::new(),
        statements: vec![crate::program::Statement::Return(crate::program::Expression::IntLiteral(size as i64))],
        abi_name: "size".to_string(),
        is_callable_at_compile_time: true,
        is_callable_at_runtime: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_plus_is_registered_in_global_scope() {
        let program = Program::new();
        assert!(
            program
                .global_scope
                .scope
                .functions
                .iter()
                .any(|f| f.name == "+")
        );
    }
}
