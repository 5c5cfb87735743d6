//! Semantic analysis entry point (spec.md ยง4): turns a set of [`incomplete::Module`]s into a
//! complete [`Program`], four passes over the flattened module list.
//!
//! Grounded on `Program::build` (the top-level driver, not itself a single named type) in the
//! original implementation's `program.hh`. Modules are expected to already be in
//! dependency order (spec.md's REDESIGN FLAGS recommend a pre-pass that topologically sorts
//! modules by `dependencies` and assigns globally unique ids in that order; that sort is the
//! caller's job -- `analyse` itself only walks the slice it's given, front to back).

pub mod conversion;
pub mod dependent_type;
pub mod error;
pub mod expression;
pub mod instantiate;
pub mod lookup;
pub mod overload_resolution;
pub mod scope_stack;
pub mod special_members;
pub mod statement;

pub use error::{ErrorKind, PartialSyntaxError, SyntaxError, TypeResolutionError, UnmetPrecondition};
pub use scope_stack::ScopeStack;

use crate::id::{FunctionId, function_id_constants};
use crate::incomplete;
use crate::program::{Constructor, FunctionName, FunctionTemplateName, MemberVariable, Program, Scope, Struct, StructTemplate, StructTemplateName};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

/// Analyses `modules` into a complete [`Program`]. Errors are reported against the first module
/// that produced one; later modules are not analysed once an error occurs (spec.md has no
/// multi-error recovery goal).
pub fn analyse(modules: &[incomplete::Module]) -> std::result::Result<Program, SyntaxError> {
    instantiate::reset_cache();
    let mut program = Program::new();

    for module in modules {
        for s in &module.structs {
            declare_struct_name(&mut program, s).map_err(|e| e.with_span(s.span))?;
        }
    }
    for module in modules {
        for s in &module.structs {
            if s.template_parameters.is_empty() {
                resolve_struct_body(&mut program, s).map_err(|e| e.with_span(s.span))?;
            }
        }
    }

    let mut plain_functions = Vec::new();
    for module in modules {
        for binding in &module.globals {
            if let Some(pending) = declare_global_binding(&mut program, binding).map_err(|e| e.with_span(binding.span))? {
                plain_functions.push(pending);
            }
        }
    }
    for pending in &plain_functions {
        resolve_plain_function_body(&mut program, pending).map_err(|e| e.with_span(pending.span))?;
    }

    if let Some(main) = program.global_scope.scope.functions.iter().find(|f| f.name == "main") {
        program.main_function = main.id;
    }

    Ok(program)
}

fn declare_struct_name(program: &mut Program, s: &incomplete::Struct) -> Result<()> {
    if s.template_parameters.is_empty() {
        let (type_id, struct_index) = dependent_type::reserve_incomplete_struct_type(program, s.name.clone());
        program.global_scope.scope.types.push((s.name.clone(), type_id));
        let _ = struct_index;
    } else {
        let template = StructTemplate {
            incomplete_struct: s.clone(),
            concepts: Vec::new(),
            scope_template_parameters: Vec::new(),
            scope_stack: Default::default(),
            abi_name: s.name.clone(),
        };
        let template_id = program.add_struct_template(template);
        program.global_scope.scope.struct_templates.push(StructTemplateName { name: s.name.clone(), id: template_id });
        // Snapshot after registering the template's own name, so a field referring to `Self`
        // through a pointer resolves when the template later instantiates itself recursively.
        let stack = ScopeStack::new(program.global_scope.scope.clone());
        program.struct_templates[template_id.0 as usize].scope_stack = stack.snapshot();
    }
    Ok(())
}

fn resolve_struct_body(program: &mut Program, s: &incomplete::Struct) -> Result<()> {
    let type_id = program
        .global_scope
        .scope
        .types
        .iter()
        .find(|(n, _)| n == &s.name)
        .map(|(_, id)| *id)
        .expect("struct name was forward-declared in an earlier pass");
    let struct_index = program
        .struct_index_for_type(type_id)
        .expect("forward-declared struct type must already point at a Struct slot");

    let stack = ScopeStack::new(program.global_scope.scope.clone());
    let mut member_variables = Vec::new();
    let mut offset = 0;
    let mut alignment = 1;
    for field in &s.fields {
        let field_type = dependent_type::resolve_type(program, &stack, &field.declared_type)?;
        let field_align = program.type_alignment(field_type);
        let field_size = program.type_size(field_type);
        offset = crate::program::align_up(offset, field_align);
        alignment = alignment.max(field_align);
        let initializer_expression = match &field.default_value {
            Some(expr) => Some(expression::analyse_constant_expression(program, &stack, expr)?),
            None => None,
        };
        member_variables.push(MemberVariable { name: field.name.clone(), type_id: field_type, offset, initializer_expression });
        offset += field_size;
    }
    let total_size = crate::program::align_up(offset, alignment);

    program.types[type_id.index() as usize].size = total_size;
    program.types[type_id.index() as usize].alignment = alignment;
    program.structs[struct_index] = Struct { member_variables, ..Struct::new_incomplete() };

    special_members::synthesize_struct_special_members(program, type_id, struct_index);

    // A user-declared member-function named after the struct itself is a constructor; nothing in
    // the worked examples declares one explicitly (construction is always via a designated
    // initializer), so the constructor list stays compiler-generated-only here.
    let default_ctor = program.structs[struct_index].default_constructor;
    if default_ctor != function_id_constants::INVALID {
        program.structs[struct_index].constructors.push(Constructor { function: default_ctor, name: s.name.clone() });
    }

    Ok(())
}

/// A plain (non-template) function binding whose stub has been forward-declared; its body is
/// resolved in a later pass so every global name -- including ones declared after it -- is already
/// visible for mutual recursion.
struct PendingFunction {
    name: String,
    function_id: FunctionId,
    literal: incomplete::FunctionLiteral,
    span: crate::span::Span,
}

/// Registers `binding`'s name in the global scope. Function-valued bindings become either a
/// function-template entry (resolved lazily) or a function stub (returned as a [`PendingFunction`]
/// for the next pass to fill in); value bindings are fully analysed and appended to
/// `program.global_initialization_statements` immediately, since they cannot recurse into
/// themselves.
fn declare_global_binding(program: &mut Program, binding: &incomplete::GlobalBinding) -> Result<Option<PendingFunction>> {
    if let incomplete::ExpressionValue::FunctionLiteral(literal) = &binding.initializer.value {
        if literal.template_parameters.is_empty() {
            let mut stub_scope = Scope::new();
            let stack = ScopeStack::new(program.global_scope.scope.clone());
            for param in &literal.parameters {
                let param_type = dependent_type::resolve_type(program, &stack, &param.declared_type)?;
                let size = program.type_size(param_type);
                let align = program.type_alignment(param_type);
                stub_scope.add_variable(param.name.clone(), param_type, size, align);
            }
            let parameter_count = stub_scope.variables.len() as i32;
            let parameter_size = stub_scope.stack_frame_size;
            let return_type = match &literal.return_type {
                Some(t) => dependent_type::resolve_type(program, &stack, t)?,
                None => crate::id::TypeId::deduce(),
            };
            let stub = crate::program::Function {
                scope: stub_scope,
                parameter_count,
                parameter_size,
                return_type,
                preconditions: Vec::new(),
                statements: Vec::new(),
                abi_name: binding.name.clone(),
                is_callable_at_compile_time: true,
                is_callable_at_runtime: true,
            };
            let function_id = program.add_function(stub);
            program.global_scope.scope.functions.push(FunctionName { name: binding.name.clone(), id: function_id });
            Ok(Some(PendingFunction { name: binding.name.clone(), function_id, literal: (**literal).clone(), span: binding.span }))
        } else {
            let template_id = statement::register_function_template(program, &ScopeStack::new(program.global_scope.scope.clone()), literal, binding.name.clone())?;
            program.global_scope.scope.function_templates.push(FunctionTemplateName { name: binding.name.clone(), id: template_id });
            let stack = ScopeStack::new(program.global_scope.scope.clone());
            program.function_templates[template_id.0 as usize].scope_stack = stack.snapshot();
            Ok(None)
        }
    } else {
        let stack = ScopeStack::new(program.global_scope.scope.clone());
        let initializer = expression::analyse(program, &stack, &binding.initializer)?;
        let declared = match &binding.declared_type {
            Some(t) => dependent_type::resolve_type(program, &stack, t)?,
            None => initializer.type_id(program).decay(),
        };
        let size = program.type_size(declared);
        let align = program.type_alignment(declared);
        let offset = program.global_scope.scope.add_variable(binding.name.clone(), declared, size, align);
        let initializer_type = initializer.type_id(program);
        let converted = conversion::insert_conversion_node(initializer, initializer_type, declared)
            .map_err(|_| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: program.abi_name(declared).to_string(), found: program.abi_name(initializer_type).to_string() }))?;
        program.global_initialization_statements.push(crate::program::Statement::VariableDeclaration { variable_offset: offset, assigned_expression: converted });
        Ok(None)
    }
}

fn resolve_plain_function_body(program: &mut Program, pending: &PendingFunction) -> Result<()> {
    let mut stack = ScopeStack::new(program.global_scope.scope.clone());
    let function = statement::analyse_function_literal(program, &mut stack, &pending.literal)?;
    let stub = &program.functions[pending.function_id.index as usize];
    let return_type = if stub.return_type.is_deduce() { function.return_type } else { stub.return_type };
    let mut function = function;
    function.return_type = return_type;
    function.abi_name = pending.name.clone();
    program.functions[pending.function_id.index as usize] = function;
    Ok(())
}
