//! Synthesis of the four special members (destructor, default/copy/move constructor) for struct
//! and array types (spec.md ยง4.7). A type that needs none of them keeps
//! `function_id_constants::INVALID` in the corresponding slot -- trivial types are never given a
//! body to run.
//!
//! Grounded on the compiler-generated special-member synthesis in the original implementation's
//! `struct_synthesized_functions.cc`: member-wise destructor in reverse declaration order,
//! member-wise copy/move constructor in declaration order, default constructor running each
//! member's own default (falling back to its declared initializer expression).
//!
//! The evaluator always bitwise-copies/zero-initializes the whole aggregate before running a
//! synthesized copy/move/default constructor (spec.md ยง4.8); these functions therefore only need
//! to emit statements for members whose type is itself non-trivial, or whose declared initializer
//! must override the zero default. A struct whose every member is trivial and has no custom
//! initializer gets no synthesized body at all, even though `has_compiler_generated_constructors`
//! is true -- the bitwise copy already does the whole job.

use crate::id::{FunctionId, TypeId, function_id_constants};
use crate::program::{Expression, Function, MemberVariable, Program, Scope, Statement};

/// Registers (or reuses) the destructor/copy-constructor/move-constructor triple for an array
/// type, called the first time `(value_type, size)` is registered by the dependent-type resolver.
/// Returns all-`INVALID` when `value_type` is itself trivial in every respect, since a trivial
/// element type makes the whole array trivial too.
pub fn synthesize_array_special_members(
    program: &mut Program,
    value_type: TypeId,
    size: i32,
) -> (FunctionId, FunctionId, FunctionId) {
    let element = value_type.decay();
    let destructor = if program.is_trivially_destructible(element) {
        function_id_constants::INVALID
    } else {
        program.add_function(array_element_loop(program, element, size, SpecialMember::Destructor))
    };
    let copy_constructor = if program.is_trivially_copy_constructible(element) {
        function_id_constants::INVALID
    } else {
        program.add_function(array_element_loop(program, element, size, SpecialMember::CopyConstructor))
    };
    let move_constructor = if program.is_trivially_move_constructible(element) {
        function_id_constants::INVALID
    } else {
        program.add_function(array_element_loop(program, element, size, SpecialMember::MoveConstructor))
    };
    (destructor, copy_constructor, move_constructor)
}

/// Synthesizes the four special members of a newly-registered struct from its member list,
/// writing the resulting `FunctionId`s (or `INVALID`) directly into `program.structs[struct_index]`.
/// Skipped entirely when `!has_compiler_generated_constructors`, i.e. the struct declared at
/// least one special member itself.
pub fn synthesize_struct_special_members(program: &mut Program, type_id: TypeId, struct_index: usize) {
    if !program.structs[struct_index].has_compiler_generated_constructors {
        return;
    }
    let members = program.structs[struct_index].member_variables.clone();

    let dtor_members: Vec<_> = members.iter().filter(|m| !program.is_trivially_destructible(m.type_id)).cloned().collect();
    let copy_members: Vec<_> = members.iter().filter(|m| !program.is_trivially_copy_constructible(m.type_id)).cloned().collect();
    let move_members: Vec<_> = members.iter().filter(|m| !program.is_trivially_move_constructible(m.type_id)).cloned().collect();
    let default_members: Vec<_> = members
        .iter()
        .filter(|m| m.initializer_expression.is_some() || !program.is_trivially_destructible(m.type_id))
        .cloned()
        .collect();
    let all_default_constructible = members.iter().all(|m| {
        m.initializer_expression.is_some() || program.is_default_constructible(m.type_id)
    });

    let destructor = (!dtor_members.is_empty())
        .then(|| program.add_function(struct_member_wise(program, type_id, &members, &dtor_members, SpecialMember::Destructor)));
    let copy_constructor = (!copy_members.is_empty())
        .then(|| program.add_function(struct_member_wise(program, type_id, &members, &copy_members, SpecialMember::CopyConstructor)));
    let move_constructor = (!move_members.is_empty())
        .then(|| program.add_function(struct_member_wise(program, type_id, &members, &move_members, SpecialMember::MoveConstructor)));
    let default_constructor = if all_default_constructible && !default_members.is_empty() {
        Some(program.add_function(struct_member_wise(program, type_id, &members, &default_members, SpecialMember::DefaultConstructor)))
    } else {
        None
    };

    let s = &mut program.structs[struct_index];
    if let Some(d) = destructor {
        s.destructor = d;
    }
    if let Some(c) = copy_constructor {
        s.copy_constructor = c;
    }
    if let Some(m) = move_constructor {
        s.move_constructor = m;
    }
    if let Some(d) = default_constructor {
        s.default_constructor = d;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialMember {
    Destructor,
    CopyConstructor,
    MoveConstructor,
    DefaultConstructor,
}

/// `self: mut&T` for the destructor and default constructor; `self: mut&T, other: &T` (copy) or
/// `self: mut&T, other: mut T` (move) for the others. Body runs `member`'s own special member (or,
/// for the default constructor, its declared initializer expression) for every entry of
/// `relevant_members` -- a subset of `all_members` already filtered to the ones needing a
/// statement at all.
fn struct_member_wise(
    program: &Program,
    self_type: TypeId,
    all_members: &[MemberVariable],
    relevant_members: &[MemberVariable],
    member: SpecialMember,
) -> Function {
    let _ = all_members;
    let mut scope = Scope::new();
    let self_param = self_type.make_mutable();
    let self_offset = scope.add_variable("self", self_param, program.type_size(self_param), program.type_alignment(self_param));
    let other_offset = match member {
        SpecialMember::CopyConstructor => Some(scope.add_variable(
            "other",
            self_type.make_reference(),
            program.type_size(self_type.make_reference()),
            program.type_alignment(self_type.make_reference()),
        )),
        SpecialMember::MoveConstructor => Some(scope.add_variable(
            "other",
            self_type.make_mutable(),
            program.type_size(self_type.make_mutable()),
            program.type_alignment(self_type.make_mutable()),
        )),
        SpecialMember::Destructor | SpecialMember::DefaultConstructor => None,
    };
    let parameter_count = scope.variables.len() as i32;
    let parameter_size = scope.stack_frame_size;

    let self_expr = Expression::LocalVariable { variable_type: self_param, offset: self_offset };
    let member_of = |owner: Expression, offset: i32, ty: TypeId| Expression::MemberVariable {
        owner: Box::new(owner),
        variable_offset: offset,
        variable_type: ty,
    };

    let ordered: Vec<&MemberVariable> = match member {
        SpecialMember::Destructor => relevant_members.iter().rev().collect(),
        _ => relevant_members.iter().collect(),
    };

    let mut statements = Vec::new();
    for m in ordered {
        let stmt = match member {
            SpecialMember::Destructor => {
                let f = program.destructor_for(m.type_id);
                let target = member_of(self_expr.clone(), m.offset, m.type_id.make_mutable());
                Statement::ExpressionStatement(Expression::FunctionCall {
                    function_id: f,
                    parameters: vec![Expression::AddressOf { operand: Box::new(target), result_type: program.builtin_types.void }],
                    return_type: program.builtin_types.void,
                })
            }
            SpecialMember::CopyConstructor | SpecialMember::MoveConstructor => {
                let f = if member == SpecialMember::CopyConstructor {
                    program.copy_constructor_for(m.type_id)
                } else {
                    program.move_constructor_for(m.type_id)
                };
                let other_offset = other_offset.expect("constructor has an other param");
                let other_ty = if member == SpecialMember::CopyConstructor { self_type.make_reference() } else { self_type.make_mutable() };
                let source = member_of(Expression::LocalVariable { variable_type: other_ty, offset: other_offset }, m.offset, m.type_id);
                let target = member_of(self_expr.clone(), m.offset, m.type_id.make_mutable());
                Statement::ExpressionStatement(Expression::FunctionCall {
                    function_id: f,
                    parameters: vec![Expression::AddressOf { operand: Box::new(target), result_type: program.builtin_types.void }, source],
                    return_type: program.builtin_types.void,
                })
            }
            SpecialMember::DefaultConstructor => {
                let target = member_of(self_expr.clone(), m.offset, m.type_id.make_mutable());
                if let Some(initializer) = &m.initializer_expression {
                    Statement::ExpressionStatement(Expression::Assign {
                        target: Box::new(target),
                        value: Box::new(initializer.clone()),
                    })
                } else {
                    let f = program.default_constructor_for(m.type_id);
                    Statement::ExpressionStatement(Expression::FunctionCall {
                        function_id: f,
                        parameters: vec![Expression::AddressOf { operand: Box::new(target), result_type: program.builtin_types.void }],
                        return_type: program.builtin_types.void,
                    })
                }
            }
        };
        statements.push(stmt);
    }

    Function {
        scope,
        parameter_count,
        parameter_size,
        return_type: program.builtin_types.void,
        preconditions: Vec::new(),
        statements,
        abi_name: String::new(),
        is_callable_at_compile_time: true,
        is_callable_at_runtime: true,
    }
}

/// Same shape as [`struct_member_wise`] but looping over `size` array elements via a synthesized
/// `for`, since the element count has no finite list of distinct members to unroll.
fn array_element_loop(program: &Program, element: TypeId, size: i32, member: SpecialMember) -> Function {
    let array_type = program
        .find_array_type(element, size)
        .expect("array type must already be registered before synthesizing its special members");

    let mut scope = Scope::new();
    let self_param = array_type.make_mutable();
    let self_offset = scope.add_variable("self", self_param, program.type_size(self_param), program.type_alignment(self_param));
    let other_offset = match member {
        SpecialMember::CopyConstructor => Some(scope.add_variable(
            "other",
            array_type.make_reference(),
            program.type_size(array_type.make_reference()),
            program.type_alignment(array_type.make_reference()),
        )),
        SpecialMember::MoveConstructor => Some(scope.add_variable(
            "other",
            array_type.make_mutable(),
            program.type_size(array_type.make_mutable()),
            program.type_alignment(array_type.make_mutable()),
        )),
        SpecialMember::Destructor | SpecialMember::DefaultConstructor => None,
    };
    let parameter_count = scope.variables.len() as i32;
    let parameter_size = scope.stack_frame_size;

    let mut loop_scope = Scope::new();
    let index_offset = loop_scope.add_variable(
        "i",
        program.builtin_types.int,
        program.type_size(program.builtin_types.int),
        program.type_alignment(program.builtin_types.int),
    );
    // `loop_scope` is pushed directly after this function's own (self, other) parameter scope, so
    // its absolute offset is the scope-local one plus everything already claimed by parameters --
    // mirrors `ScopeStack::scope_offset_at` for a scope one level below a function boundary.
    loop_scope.frame_base_offset = parameter_size;
    let index_var = Expression::LocalVariable { variable_type: program.builtin_types.int, offset: parameter_size + index_offset };

    let int_eq = find_intrinsic(program, "<=>", &[program.builtin_types.int, program.builtin_types.int]);
    let int_plus = find_intrinsic(program, "+", &[program.builtin_types.int, program.builtin_types.int]);
    let int_minus = find_intrinsic(program, "-", &[program.builtin_types.int, program.builtin_types.int]);

    let self_expr = Expression::LocalVariable { variable_type: self_param, offset: self_offset };
    let self_element =
        Expression::Subscript { array: Box::new(self_expr), index: Box::new(index_var.clone()), result_type: element.make_mutable() };

    let body_call = match member {
        SpecialMember::Destructor => {
            let f = program.destructor_for(element);
            Statement::ExpressionStatement(Expression::FunctionCall {
                function_id: f,
                parameters: vec![Expression::AddressOf { operand: Box::new(self_element), result_type: program.builtin_types.void }],
                return_type: program.builtin_types.void,
            })
        }
        SpecialMember::CopyConstructor | SpecialMember::MoveConstructor => {
            let f = if member == SpecialMember::CopyConstructor {
                program.copy_constructor_for(element)
            } else {
                program.move_constructor_for(element)
            };
            let other_offset = other_offset.expect("constructor has an other param");
            let other_ty = if member == SpecialMember::CopyConstructor { array_type.make_reference() } else { array_type.make_mutable() };
            let other_expr = Expression::LocalVariable { variable_type: other_ty, offset: other_offset };
            let other_element = Expression::Subscript { array: Box::new(other_expr), index: Box::new(index_var.clone()), result_type: element };
            Statement::ExpressionStatement(Expression::FunctionCall {
                function_id: f,
                parameters: vec![
                    Expression::AddressOf { operand: Box::new(self_element), result_type: program.builtin_types.void },
                    other_element,
                ],
                return_type: program.builtin_types.void,
            })
        }
        SpecialMember::DefaultConstructor => {
            let f = program.default_constructor_for(element);
            Statement::ExpressionStatement(Expression::FunctionCall {
                function_id: f,
                parameters: vec![Expression::AddressOf { operand: Box::new(self_element), result_type: program.builtin_types.void }],
                return_type: program.builtin_types.void,
            })
        }
    };

    let (init_value, condition, step) = if member == SpecialMember::Destructor {
        (
            Expression::IntLiteral((size - 1) as i64),
            Expression::RelationalOperatorCall {
                function_id: int_eq,
                op: crate::operator::Operator::GreaterEqual,
                parameters: Box::new([index_var.clone(), Expression::IntLiteral(0)]),
            },
            Expression::FunctionCall {
                function_id: int_minus,
                parameters: vec![index_var.clone(), Expression::IntLiteral(1)],
                return_type: program.builtin_types.int,
            },
        )
    } else {
        (
            Expression::IntLiteral(0),
            Expression::RelationalOperatorCall {
                function_id: int_eq,
                op: crate::operator::Operator::Less,
                parameters: Box::new([index_var.clone(), Expression::IntLiteral(size as i64)]),
            },
            Expression::FunctionCall {
                function_id: int_plus,
                parameters: vec![index_var.clone(), Expression::IntLiteral(1)],
                return_type: program.builtin_types.int,
            },
        )
    };

    let for_statement = Statement::For {
        scope: loop_scope,
        init_statement: Box::new(Statement::VariableDeclaration { variable_offset: index_offset, assigned_expression: init_value }),
        condition,
        end_expression: step,
        body: Box::new(body_call),
    };

    Function {
        scope,
        parameter_count,
        parameter_size,
        return_type: program.builtin_types.void,
        preconditions: Vec::new(),
        statements: vec![for_statement],
        abi_name: String::new(),
        is_callable_at_compile_time: true,
        is_callable_at_runtime: true,
    }
}

fn find_intrinsic(program: &Program, name: &str, params: &[TypeId]) -> FunctionId {
    program
        .intrinsic_functions
        .iter()
        .position(|f| f.name == name && f.parameter_types == params)
        .map(|idx| FunctionId::new(crate::id::FunctionIdKind::Intrinsic, idx as u32))
        .unwrap_or(function_id_constants::INVALID)
}
