//! Name lookup (spec.md ยง4.1): walks the scope stack innermost-to-outermost, accumulating
//! overload sets across every enclosing scope while letting variables and constants shadow by
//! innermost-wins. Grounded on `lookup_name` in the original implementation's `scope.cc`.

use crate::analysis::scope_stack::ScopeStack;
use crate::id::{FunctionTemplateId, StructTemplateId, TypeId};
use crate::program::{Constant, OverloadSet, Program, ScopeKind};

#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Nothing,
    NamespaceNotFound,
    /// A local variable; `offset` is already absolute, relative to the enclosing function's base
    /// pointer (computed from the scope the variable was actually declared in, which may sit
    /// above several block scopes nested between it and wherever the name was looked up from).
    Variable { variable_type: TypeId, offset: i32 },
    GlobalVariable { variable_type: TypeId, offset: i32 },
    Constant(Constant),
    OverloadSet(OverloadSet),
    Type(TypeId),
    StructTemplate(StructTemplateId),
}

/// Implements spec.md ยง4.1 rules 2-5 over an already namespace-resolved scope stack view.
pub fn lookup_name(scope_stack: &ScopeStack, name: &str) -> LookupResult {
    let mut overload_set = OverloadSet::default();
    let mut stop_looking_for_variables = false;
    let mut found_variable: Option<LookupResult> = None;

    let start = scope_stack.entries.len();
    for i in (0..start).rev() {
        let (scope, kind) = &scope_stack.entries[i];

        if found_variable.is_none() && overload_set.is_empty() {
            if *kind == ScopeKind::Global {
                if let Some(var) = scope.variables.iter().find(|v| v.name == name) {
                    found_variable =
                        Some(LookupResult::GlobalVariable { variable_type: var.type_id, offset: var.offset });
                }
            } else if !stop_looking_for_variables {
                if let Some(constant) = scope.constants.iter().find(|c| c.name == name) {
                    found_variable = Some(LookupResult::Constant(constant.clone()));
                } else if let Some(var) = scope.variables.iter().find(|v| v.name == name) {
                    let absolute_offset = var.offset + scope_stack.scope_offset_at(i);
                    found_variable = Some(LookupResult::Variable { variable_type: var.type_id, offset: absolute_offset });
                }
            }
        }

        if found_variable.is_none() {
            for f in scope.functions.iter().filter(|f| f.name == name) {
                overload_set.function_ids.push(f.id);
            }
            for f in scope.function_templates.iter().filter(|f| f.name == name) {
                overload_set.function_template_ids.push(f.id);
            }
        }

        // After leaving a function scope on the way out, stop looking for locals: functions do
        // not capture enclosing locals.
        if i < start - 1 && *kind == ScopeKind::Function {
            stop_looking_for_variables = true;
        }
    }

    if let Some(found) = found_variable {
        return found;
    }
    if !overload_set.is_empty() {
        return LookupResult::OverloadSet(overload_set);
    }

    // Types and struct templates are looked up the same way, but are not shadowed by variables:
    // a name can only ever be one of {variable/constant, overload-set, type, struct-template} in
    // valid source, so a miss above falls through to these.
    for (scope, _) in scope_stack.entries.iter().rev() {
        if let Some((_, id)) = scope.types.iter().find(|(n, _)| n == name) {
            return LookupResult::Type(*id);
        }
        if let Some(t) = scope.struct_templates.iter().find(|t| t.name == name) {
            return LookupResult::StructTemplate(t.id);
        }
    }

    LookupResult::Nothing
}

/// Resolves a (possibly empty) namespace path from the innermost matching namespace outward
/// (spec.md ยง4.1 rule 1), returning the scope to search from or `NamespaceNotFound`.
pub fn lookup_name_with_namespace(
    program: &Program,
    scope_stack: &ScopeStack,
    namespace_path: &[String],
    name: &str,
) -> LookupResult {
    if namespace_path.is_empty() {
        return lookup_name(scope_stack, name);
    }

    match resolve_namespace_path(&program.global_scope, namespace_path) {
        Some(ns) => {
            let mut stack = ScopeStack::new(ns.scope.clone());
            stack.entries[0].1 = ScopeKind::Namespace;
            lookup_name(&stack, name)
        }
        None => LookupResult::NamespaceNotFound,
    }
}

fn resolve_namespace_path<'a>(
    root: &'a crate::program::Namespace,
    path: &[String],
) -> Option<&'a crate::program::Namespace> {
    let mut current = root.find_namespace(&path[0])?;
    for segment in &path[1..] {
        current = current.find_namespace(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Scope;

    #[test]
    fn variable_shadows_function_search_but_not_outward_collection() {
        let mut global = Scope::new();
        global.functions.push(crate::program::function::FunctionName {
            name: "f".to_string(),
            id: crate::id::FunctionId::new(crate::id::FunctionIdKind::Program, 0),
        });
        let mut stack = ScopeStack::new(global);
        let mut block = Scope::new();
        block.add_variable("f", TypeId::new(0), 8, 8);
        stack.push(block, ScopeKind::Block);

        match lookup_name(&stack, "f") {
            LookupResult::Variable { .. } => {}
            other => panic!("expected Variable, got {other:?}"),
        }
    }

    #[test]
    fn crossing_function_boundary_stops_variable_lookup() {
        let mut global = Scope::new();
        global.add_variable("x", TypeId::new(0), 8, 8);
        let mut stack = ScopeStack::new(global);
        stack.push(Scope::new(), ScopeKind::Function);
        stack.push(Scope::new(), ScopeKind::Block);

        // x is a local of the global scope, not a global variable (ScopeKind::Global here is
        // used only for the program's true top-level scope); crossing the function boundary
        // should stop this search from finding it as a plain Variable from another function.
        match lookup_name(&stack, "x") {
            LookupResult::Nothing | LookupResult::GlobalVariable { .. } => {}
            other => panic!("unexpected lookup result across function boundary: {other:?}"),
        }
    }

    #[test]
    fn unknown_name_is_nothing() {
        let stack = ScopeStack::new(Scope::new());
        assert_eq!(lookup_name(&stack, "bogus"), LookupResult::Nothing);
    }
}
