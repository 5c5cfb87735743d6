//! Resolves an incomplete [`crate::incomplete::TypeExpr`] into a complete [`TypeId`] (spec.md
//! ยง4.2). Grounded on `resolve_dependent_type` in the original implementation's
//! `template_instantiation.hh`, and on `instantiate_struct_template`/`InstantiatedStruct` for the
//! two-phase struct-template path.

use crate::analysis::lookup::{LookupResult, lookup_name_with_namespace};
use crate::analysis::scope_stack::ScopeStack;
use crate::analysis::{ErrorKind, PartialSyntaxError, special_members};
use crate::id::TypeId;
use crate::incomplete::{TypeExpr, TypeExprValue};
use crate::program::{Program, Struct, Type, TypeKind};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

/// Resolves `expr` against `program`, looking up names through `scope_stack`. On success the
/// returned `TypeId` already carries the reference/mutable bits `expr` declared.
pub fn resolve_type(program: &mut Program, scope_stack: &ScopeStack, expr: &TypeExpr) -> Result<TypeId> {
    let base = resolve_type_value(program, scope_stack, &expr.value)?;
    let mut resolved = base.decay();
    if expr.is_reference {
        resolved = resolved.make_reference();
    }
    if expr.is_mutable {
        resolved = resolved.make_mutable();
    }
    Ok(resolved)
}

fn resolve_type_value(program: &mut Program, scope_stack: &ScopeStack, value: &TypeExprValue) -> Result<TypeId> {
    match value {
        TypeExprValue::Deduce => Ok(TypeId::deduce()),
        TypeExprValue::Name { namespace_path, name } => {
            match lookup_name_with_namespace(program, scope_stack, namespace_path, name) {
                LookupResult::Type(id) => Ok(id),
                LookupResult::NamespaceNotFound => {
                    Err(PartialSyntaxError::new(ErrorKind::NamespaceNotFound(namespace_path.join("::"))))
                }
                _ => Err(PartialSyntaxError::new(ErrorKind::UnknownIdentifier(name.clone()))),
            }
        }
        TypeExprValue::Pointer(pointee) => {
            let pointee = resolve_type(program, scope_stack, pointee)?;
            Ok(program.pointer_type_for(pointee))
        }
        TypeExprValue::ArrayPointer(value_type) => {
            let value_type = resolve_type(program, scope_stack, value_type)?;
            Ok(program.array_pointer_type_for(value_type))
        }
        TypeExprValue::Array { value_type, size } => {
            let value_type = resolve_type(program, scope_stack, value_type)?;
            let size = evaluate_array_size(program, scope_stack, size)?;
            Ok(register_array_type(program, value_type, size))
        }
        TypeExprValue::TemplateInstantiation { namespace_path, name, arguments } => {
            resolve_template_instantiation(program, scope_stack, namespace_path, name, arguments)
        }
    }
}

/// Registers `Array(value_type, size)` if it isn't already known, synthesizing its special
/// members on first registration (spec.md ยง4.2, ยง4.7).
fn register_array_type(program: &mut Program, value_type: TypeId, size: i32) -> TypeId {
    if let Some(existing) = program.find_array_type(value_type, size) {
        return existing;
    }
    let (destructor, copy_constructor, move_constructor) =
        special_members::synthesize_array_special_members(program, value_type, size);
    let element_size = program.type_size(value_type);
    let element_align = program.type_alignment(value_type);
    program.add_type(Type {
        size: element_size * size,
        alignment: element_align,
        abi_name: format!("{}[{}]", program.abi_name(value_type), size),
        kind: TypeKind::Array { value_type, size, destructor, copy_constructor, move_constructor },
        template_instantiation: None,
    })
}

/// A constant integer expression is required for an array's declared size (spec.md §4.2 edge
/// case). Folded through the real compile-time evaluator rather than pattern-matched on a handful
/// of literal shapes, so `let n = 2 + 3; let a: int[n];` works the same as `let a: int[5];`.
fn evaluate_array_size(program: &mut Program, scope_stack: &ScopeStack, size_expr: &crate::incomplete::Expression) -> Result<i32> {
    let analysed = crate::analysis::expression::analyse_constant_expression(program, scope_stack, size_expr)?;
    let int_type = program.builtin_types.int;
    if analysed.type_id(program).decay() != int_type {
        return Err(PartialSyntaxError::new(ErrorKind::ArraySizeNotConstant));
    }
    let mut bytes = [0u8; 4];
    crate::eval::evaluate_constant_expression(program, &analysed, &mut bytes).map_err(|_| PartialSyntaxError::new(ErrorKind::ArraySizeNotConstant))?;
    let size = i32::from_ne_bytes(bytes);
    if size < 0 {
        return Err(PartialSyntaxError::new(ErrorKind::ArraySizeNotConstant));
    }
    Ok(size)
}

/// Looks up the named struct template and hands off to
/// [`crate::analysis::instantiate::instantiate_struct_template`] for the two-phase cache-checked
/// instantiation (spec.md ยง4.4).
fn resolve_template_instantiation(
    program: &mut Program,
    scope_stack: &ScopeStack,
    namespace_path: &[String],
    name: &str,
    arguments: &[TypeExpr],
) -> Result<TypeId> {
    let template_id = match lookup_name_with_namespace(program, scope_stack, namespace_path, name) {
        LookupResult::StructTemplate(id) => id,
        LookupResult::NamespaceNotFound => {
            return Err(PartialSyntaxError::new(ErrorKind::NamespaceNotFound(namespace_path.join("::"))));
        }
        _ => return Err(PartialSyntaxError::new(ErrorKind::UnknownIdentifier(name.to_string()))),
    };
    let mut resolved_arguments = Vec::with_capacity(arguments.len());
    for arg in arguments {
        resolved_arguments.push(resolve_type(program, scope_stack, arg)?);
    }
    crate::analysis::instantiate::instantiate_struct_template(program, template_id, &resolved_arguments)
}

/// Places an empty, still-`INVALID`-special-member [`Struct`] into `program` and returns its
/// `TypeId`/index -- step one of the two-phase instantiation so a member referring back to the
/// struct's own type (through a pointer) resolves against a real, if incomplete, slot instead of
/// recursing forever. The caller (the instantiator) is responsible for filling in the member list
/// and calling [`special_members::synthesize_struct_special_members`] afterwards.
pub fn reserve_incomplete_struct_type(program: &mut Program, abi_name: String) -> (TypeId, usize) {
    program.add_struct_type(
        Type { size: 0, alignment: 1, abi_name, kind: TypeKind::Struct(program.structs.len()), template_instantiation: None },
        Struct::new_incomplete(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Scope;

    #[test]
    fn resolves_builtin_name_through_global_scope() {
        let mut program = Program::new();
        program.global_scope.scope.types.push(("int".to_string(), program.builtin_types.int));
        let stack = ScopeStack::new(program.global_scope.scope.clone());
        let expr = TypeExpr {
            value: TypeExprValue::Name { namespace_path: vec![], name: "int".to_string() },
            is_mutable: false,
            is_reference: false,
            span: crate::span::Span::empty(),
        };
        let resolved = resolve_type(&mut program, &stack, &expr).unwrap();
        assert_eq!(resolved, program.builtin_types.int);
    }

    #[test]
    fn pointer_types_dedup_by_pointee() {
        let mut program = Program::new();
        let a = program.pointer_type_for(program.builtin_types.int);
        let b = program.pointer_type_for(program.builtin_types.int);
        assert_eq!(a, b);
    }

    #[test]
    fn array_registration_is_idempotent() {
        let mut program = Program::new();
        let value_type = program.builtin_types.int;
        let a = register_array_type(&mut program, value_type, 4);
        let b = register_array_type(&mut program, value_type, 4);
        assert_eq!(a, b);
        assert_eq!(program.array_size(a), Some(4));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let mut program = Program::new();
        let stack = ScopeStack::new(Scope::new());
        let expr = TypeExpr {
            value: TypeExprValue::Name { namespace_path: vec![], name: "bogus".to_string() },
            is_mutable: false,
            is_reference: false,
            span: crate::span::Span::empty(),
        };
        assert!(resolve_type(&mut program, &stack, &expr).is_err());
    }
}
