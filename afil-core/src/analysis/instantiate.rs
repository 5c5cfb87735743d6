//! Struct and function template instantiation with caching (spec.md ยง4.4).
//!
//! Grounded on `instantiate_struct_template`/`InstantiatedStruct` and
//! `instantiate_function_template` in the original implementation's `template_instantiation.hh`:
//! resolve arguments, check the cache, reserve an incomplete slot before analysing the body (so a
//! member referring back to the struct through a pointer terminates), install the finished type
//! into the cache, then analyse.

use std::collections::HashMap;

use crate::analysis::scope_stack::ScopeStack;
use crate::analysis::{ErrorKind, PartialSyntaxError, dependent_type, special_members};
use crate::id::{FunctionId, FunctionTemplateId, StructTemplateId, TypeId};
use crate::program::{MemberVariable, Program, Struct, Type, TypeKind};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

/// Keyed by `(template id, argument type ids)`; argument `TypeId`s already include any
/// reference/mutable bits the caller wrote, since two instantiations differing only in those bits
/// are genuinely different types.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    structs: HashMap<(StructTemplateId, Vec<TypeId>), TypeId>,
    functions: HashMap<(FunctionTemplateId, Vec<TypeId>), FunctionId>,
}

thread_local! {
    // A per-analysis cache would normally live on `SemanticAnalysisArgs` alongside the scope
    // stack; kept as a thread-local here so `dependent_type::resolve_type` (which has no cache
    // parameter of its own) can still reach it without threading it through every call site.
    // `analysis::analyse` clears it at the start of each run.
    static CACHE: std::cell::RefCell<TemplateCache> = std::cell::RefCell::new(TemplateCache::default());
}

pub fn reset_cache() {
    CACHE.with(|c| *c.borrow_mut() = TemplateCache::default());
}

/// Instantiates `template_id` with `arguments`, or returns the cached `TypeId` from a previous
/// identical instantiation.
pub fn instantiate_struct_template(program: &mut Program, template_id: StructTemplateId, arguments: &[TypeId]) -> Result<TypeId> {
    let key = (template_id, arguments.to_vec());
    if let Some(cached) = CACHE.with(|c| c.borrow().structs.get(&key).copied()) {
        return Ok(cached);
    }

    let template = program.struct_templates[template_id.0 as usize].clone();
    if template.incomplete_struct.template_parameters.len() != arguments.len() {
        return Err(PartialSyntaxError::new(ErrorKind::TemplateDeductionFailed(template.incomplete_struct.name.clone())));
    }

    let abi_name = mangled_name(&template.incomplete_struct.name, arguments, program);

    // Phase one: reserve an incomplete struct slot and cache it immediately, so a member type
    // that names the struct itself (legal only behind a pointer) resolves against a real TypeId
    // instead of recursing into this function again.
    let (type_id, struct_index) = dependent_type::reserve_incomplete_struct_type(program, abi_name);
    CACHE.with(|c| c.borrow_mut().structs.insert(key.clone(), type_id));

    let mut stack = ScopeStack::from_snapshot(&template.scope_stack);
    let mut template_scope = crate::program::Scope::new();
    for (param, arg) in template.incomplete_struct.template_parameters.iter().zip(arguments.iter()) {
        template_scope.types.push((param.name.clone(), *arg));
    }
    stack.push(template_scope, crate::program::ScopeKind::Block);

    check_concepts(program, &stack, &template.concepts, &template.incomplete_struct.name)?;

    let mut member_variables = Vec::new();
    let mut offset = 0;
    let mut alignment = 1;
    for field in &template.incomplete_struct.fields {
        let field_type = dependent_type::resolve_type(program, &stack, &field.declared_type)?;
        let field_align = program.type_alignment(field_type);
        let field_size = program.type_size(field_type);
        offset = crate::program::align_up(offset, field_align);
        alignment = alignment.max(field_align);
        let initializer_expression = match &field.default_value {
            Some(expr) => Some(crate::analysis::expression::analyse_constant_expression(program, &stack, expr)?),
            None => None,
        };
        member_variables.push(MemberVariable { name: field.name.clone(), type_id: field_type, offset, initializer_expression });
        offset += field_size;
    }
    let total_size = crate::program::align_up(offset, alignment);

    program.types[type_id.index() as usize] =
        Type { size: total_size, alignment, abi_name: program.abi_name(type_id).to_string(), kind: TypeKind::Struct(struct_index), template_instantiation: Some(crate::program::TemplateInstantiationOrigin { template_id, parameters: arguments.to_vec() }) };
    program.structs[struct_index] = Struct { member_variables, ..Struct::new_incomplete() };

    special_members::synthesize_struct_special_members(program, type_id, struct_index);

    Ok(type_id)
}

/// Instantiates `template_id` with `arguments`, or returns the cached `FunctionId`.
pub fn instantiate_function_template(
    program: &mut Program,
    template_id: FunctionTemplateId,
    arguments: &[TypeId],
) -> Result<FunctionId> {
    let key = (template_id, arguments.to_vec());
    if let Some(cached) = CACHE.with(|c| c.borrow().functions.get(&key).copied()) {
        return Ok(cached);
    }

    use crate::id::FunctionTemplateIdKind;
    let function_id = match template_id.kind {
        FunctionTemplateIdKind::Intrinsic => {
            let template = program.intrinsic_function_templates[template_id.index as usize].clone();
            if template.template_parameter_count as usize != arguments.len() {
                return Err(PartialSyntaxError::new(ErrorKind::TemplateDeductionFailed(template.abi_name.clone())));
            }
            let stack = ScopeStack::new(program.global_scope.scope.clone());
            check_concepts(program, &stack, &template.concepts, &template.abi_name)?;
            let function = (template.instantiation_function)(arguments, program);
            program.add_function(function)
        }
        FunctionTemplateIdKind::Program => {
            let template = program.function_templates[template_id.index as usize].clone();
            if template.incomplete_function.template_parameters.len() != arguments.len() {
                return Err(PartialSyntaxError::new(ErrorKind::TemplateDeductionFailed(template.abi_name.clone())));
            }

            let mut stack = ScopeStack::from_snapshot(&template.scope_stack);
            let mut template_scope = crate::program::Scope::new();
            for (param, arg) in template.incomplete_function.template_parameters.iter().zip(arguments.iter()) {
                template_scope.types.push((param.name.clone(), *arg));
            }
            stack.push(template_scope, crate::program::ScopeKind::Block);

            check_concepts(program, &stack, &template.concepts, &template.abi_name)?;

            let function = crate::analysis::statement::analyse_function_literal(program, &mut stack, &template.incomplete_function)?;
            program.add_function(function)
        }
    };
    CACHE.with(|c| c.borrow_mut().functions.insert(key, function_id));
    Ok(function_id)
}

/// Evaluates each concept expression at compile time against the now-bound template parameters;
/// any concept returning false (or failing to evaluate) fails instantiation (spec.md ยง4.4).
fn check_concepts(program: &mut Program, stack: &ScopeStack, concepts: &[FunctionId], template_name: &str) -> Result<()> {
    for concept in concepts {
        let satisfied = crate::eval::evaluate_concept(program, stack, *concept).unwrap_or(false);
        if !satisfied {
            return Err(PartialSyntaxError::new(ErrorKind::ConceptNotSatisfied(template_name.to_string())));
        }
    }
    Ok(())
}

fn mangled_name(base: &str, arguments: &[TypeId], program: &Program) -> String {
    let args: Vec<&str> = arguments.iter().map(|a| program.abi_name(*a)).collect();
    format!("{base}<{}>", args.join(", "))
}

/// Snapshots the template cache, runs `probe`, then restores the pre-probe cache regardless of
/// `probe`'s outcome. Used by `compiles { ... }` (spec.md ยง4.5): any template instantiation
/// triggered while speculatively analysing the probe body must not leave behind a cache entry
/// whose id indexes into a `Program` clone that the probe then discards (spec.md ยง8 "Cache
/// memoisation", "`compiles` soundness").
pub fn with_snapshot_cache<T>(probe: impl FnOnce() -> T) -> T {
    let snapshot = CACHE.with(|c| c.borrow().clone());
    let result = probe();
    CACHE.with(|c| *c.borrow_mut() = snapshot);
    result
}
