//! The complete program: every entity the analyser has resolved so far, addressed by stable id.
//!
//! `Program` starts non-empty (the built-in type registry and intrinsic functions are seeded by
//! [`Program::new`]) and grows monotonically thereafter: the `add_*` functions below are the only
//! way to put something in it, and none of them ever invalidate an id obtained from an earlier
//! call. This is what lets the analyser hold a `FunctionId` for a struct's not-yet-synthesized
//! destructor while it is still in the middle of building that struct.

pub mod expression;
pub mod function;
pub mod scope;
pub mod statement;
pub mod types;

pub use expression::{ConversionKind, Expression};
pub use function::{
    CFunctionCaller, ExternFunction, Function, FunctionTemplate, IntrinsicFunction, IntrinsicFunctionTemplate,
    Namespace, OverloadSet, ResolvedTemplateParameter, ScopeStackSnapshot, StructTemplate, TemplateParamType,
    TemplateParamTypeValue,
};
pub use scope::{Constant, FunctionName, FunctionTemplateName, Scope, ScopeKind, StructTemplateName, Variable, align_up};
pub use statement::Statement;
pub use types::{BuiltIn, Constructor, MemberVariable, Struct, TemplateInstantiationOrigin, Type, TypeKind};

use crate::id::{FunctionId, FunctionIdKind, FunctionTemplateId, StructTemplateId, TypeId, function_id_constants};

/// Indices of the eight built-in types, fixed at `Program::new()` so every other module can refer
/// to e.g. `program.builtin_types.int` instead of re-deriving the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTypes {
    pub int: TypeId,
    pub float: TypeId,
    pub bool: TypeId,
    pub char: TypeId,
    pub byte: TypeId,
    pub type_: TypeId,
    pub null: TypeId,
    pub void: TypeId,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub types: Vec<Type>,
    pub structs: Vec<Struct>,
    pub struct_templates: Vec<StructTemplate>,
    pub overload_set_types: Vec<OverloadSet>,
    pub functions: Vec<Function>,
    pub extern_functions: Vec<ExternFunction>,
    pub intrinsic_functions: Vec<IntrinsicFunction>,
    pub intrinsic_function_templates: Vec<IntrinsicFunctionTemplate>,
    pub function_templates: Vec<FunctionTemplate>,
    pub global_initialization_statements: Vec<Statement>,
    pub global_scope: Namespace,
    pub main_function: FunctionId,
    pub builtin_types: BuiltinTypes,
}

impl Program {
    /// A fresh program containing only the built-in type registry and the intrinsic functions
    /// (`size`, `data`, `destroy`); see [`crate::intrinsics`].
    pub fn new() -> Self {
        let mut types = Vec::new();
        let push = |types: &mut Vec<Type>, kind: BuiltIn, size: i32, align: i32, name: &str| -> TypeId {
            types.push(Type::builtin(kind, size, align, name));
            TypeId::new((types.len() - 1) as u32)
        };
        let int = push(&mut types, BuiltIn::Int, 4, 4, "int");
        let float = push(&mut types, BuiltIn::Float, 8, 8, "float");
        let bool_ = push(&mut types, BuiltIn::Bool, 1, 1, "bool");
        let char_ = push(&mut types, BuiltIn::Char, 4, 4, "char");
        let byte = push(&mut types, BuiltIn::Byte, 1, 1, "byte");
        let type_ = push(&mut types, BuiltIn::Type, 4, 4, "type");
        let null = push(&mut types, BuiltIn::Null, 0, 1, "null");
        let void = push(&mut types, BuiltIn::Void, 0, 1, "void");

        let mut program = Program {
            types,
            structs: Vec::new(),
            struct_templates: Vec::new(),
            overload_set_types: Vec::new(),
            functions: Vec::new(),
            extern_functions: Vec::new(),
            intrinsic_functions: Vec::new(),
            intrinsic_function_templates: Vec::new(),
            function_templates: Vec::new(),
            global_initialization_statements: Vec::new(),
            global_scope: Namespace::new(""),
            main_function: function_id_constants::INVALID,
            builtin_types: BuiltinTypes { int, float, bool: bool_, char: char_, byte, type_, null, void },
        };
        for (name, id) in [
            ("int", int),
            ("float", float),
            ("bool", bool_),
            ("char", char_),
            ("byte", byte),
            ("type", type_),
            ("null", null),
            ("void", void),
        ] {
            program.global_scope.scope.types.push((name.to_string(), id));
        }
        crate::intrinsics::register(&mut program);
        program
    }

    // -- type registry -------------------------------------------------------------------

    pub fn add_type(&mut self, new_type: Type) -> TypeId {
        self.types.push(new_type);
        TypeId::new((self.types.len() - 1) as u32)
    }

    pub fn type_with_id(&self, id: TypeId) -> &Type {
        &self.types[id.index() as usize]
    }

    pub fn type_size(&self, id: TypeId) -> i32 {
        if id.is_reference() {
            std::mem::size_of::<usize>() as i32
        } else {
            self.type_with_id(id).size
        }
    }

    pub fn type_alignment(&self, id: TypeId) -> i32 {
        if id.is_reference() {
            std::mem::align_of::<usize>() as i32
        } else {
            self.type_with_id(id).alignment
        }
    }

    pub fn abi_name(&self, id: TypeId) -> &str {
        &self.type_with_id(id).abi_name
    }

    // -- structs ---------------------------------------------------------------------------

    /// Registers a struct type and its (initially incomplete) [`Struct`] entity, returning the
    /// new `TypeId` and the index into `self.structs`. The struct's special-member slots are left
    /// `function_id_constants::INVALID` -- it is the caller's job to synthesize or reject before
    /// anyone observes them (spec.md ยง3 lifecycle invariant).
    pub fn add_struct_type(&mut self, new_type: Type, new_struct: Struct) -> (TypeId, usize) {
        self.structs.push(new_struct);
        let struct_index = self.structs.len() - 1;
        let type_id = self.add_type(new_type);
        (type_id, struct_index)
    }

    pub fn add_struct_template(&mut self, new_template: StructTemplate) -> StructTemplateId {
        self.struct_templates.push(new_template);
        StructTemplateId((self.struct_templates.len() - 1) as u32)
    }

    pub fn is_struct(&self, type_id: TypeId) -> bool {
        self.type_with_id(type_id).is_struct()
    }

    pub fn struct_for_type(&self, type_id: TypeId) -> Option<&Struct> {
        match self.type_with_id(type_id).kind {
            TypeKind::Struct(index) => Some(&self.structs[index]),
            _ => None,
        }
    }

    pub fn struct_index_for_type(&self, type_id: TypeId) -> Option<usize> {
        match self.type_with_id(type_id).kind {
            TypeKind::Struct(index) => Some(index),
            _ => None,
        }
    }

    // -- pointers / arrays -------------------------------------------------------------------

    /// Pointer types are deduplicated by pointee identity (spec.md ยง4.2).
    pub fn pointer_type_for(&mut self, pointee: TypeId) -> TypeId {
        if let Some((idx, _)) = self
            .types
            .iter()
            .enumerate()
            .find(|(_, t)| matches!(t.kind, TypeKind::Pointer(p) if p == pointee))
        {
            return TypeId::new(idx as u32);
        }
        self.add_type(Type {
            size: std::mem::size_of::<usize>() as i32,
            alignment: std::mem::align_of::<usize>() as i32,
            abi_name: format!("{}*", self.abi_name(pointee)),
            kind: TypeKind::Pointer(pointee),
            template_instantiation: None,
        })
    }

    pub fn array_pointer_type_for(&mut self, value_type: TypeId) -> TypeId {
        if let Some((idx, _)) = self
            .types
            .iter()
            .enumerate()
            .find(|(_, t)| matches!(t.kind, TypeKind::ArrayPointer(p) if p == value_type))
        {
            return TypeId::new(idx as u32);
        }
        self.add_type(Type {
            size: std::mem::size_of::<usize>() as i32,
            alignment: std::mem::align_of::<usize>() as i32,
            abi_name: format!("{}[]", self.abi_name(value_type)),
            kind: TypeKind::ArrayPointer(value_type),
            template_instantiation: None,
        })
    }

    /// Looks for an already-registered `Array(value_type, size)` type; special members are
    /// synthesized by the caller (the dependent-type resolver) on first registration, not here --
    /// `Program` itself does not know how to analyse expressions.
    pub fn find_array_type(&self, value_type: TypeId, size: i32) -> Option<TypeId> {
        self.types.iter().enumerate().find_map(|(idx, t)| match &t.kind {
            TypeKind::Array { value_type: v, size: s, .. } if *v == value_type && *s == size => {
                Some(TypeId::new(idx as u32))
            }
            _ => None,
        })
    }

    pub fn pointee_type(&self, pointer_type_id: TypeId) -> Option<TypeId> {
        match self.type_with_id(pointer_type_id).kind {
            TypeKind::Pointer(p) | TypeKind::ArrayPointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn array_value_type(&self, array_type_id: TypeId) -> Option<TypeId> {
        match self.type_with_id(array_type_id).kind {
            TypeKind::Array { value_type, .. } => Some(value_type),
            _ => None,
        }
    }

    pub fn array_size(&self, array_type_id: TypeId) -> Option<i32> {
        match self.type_with_id(array_type_id).kind {
            TypeKind::Array { size, .. } => Some(size),
            _ => None,
        }
    }

    // -- functions ---------------------------------------------------------------------------

    pub fn add_function(&mut self, new_function: Function) -> FunctionId {
        self.functions.push(new_function);
        FunctionId::new(FunctionIdKind::Program, (self.functions.len() - 1) as u32)
    }

    pub fn add_extern_function(&mut self, new_function: ExternFunction) -> FunctionId {
        self.extern_functions.push(new_function);
        FunctionId::new(FunctionIdKind::ImportedExtern, (self.extern_functions.len() - 1) as u32)
    }

    pub fn add_function_template(&mut self, new_template: FunctionTemplate) -> FunctionTemplateId {
        self.function_templates.push(new_template);
        FunctionTemplateId::new(crate::id::FunctionTemplateIdKind::Program, (self.function_templates.len() - 1) as u32)
    }

    pub fn add_namespace(&mut self, path: &[String]) -> &mut Namespace {
        let mut ns = &mut self.global_scope;
        for name in path {
            ns = ns.add_namespace(name.clone());
        }
        ns
    }

    pub fn parameter_types_of(&self, id: FunctionId) -> Vec<TypeId> {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].parameter_types(),
            FunctionIdKind::ImportedExtern => self.extern_functions[id.index as usize].parameter_types.clone(),
            FunctionIdKind::Intrinsic => self.intrinsic_functions[id.index as usize].parameter_types.clone(),
        }
    }

    pub fn parameter_size(&self, id: FunctionId) -> i32 {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].parameter_size,
            FunctionIdKind::ImportedExtern => self.extern_functions[id.index as usize].parameter_size,
            FunctionIdKind::Intrinsic => {
                self.parameter_types_of(id).iter().map(|t| self.type_size(*t)).sum()
            }
        }
    }

    pub fn return_type(&self, id: FunctionId) -> TypeId {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].return_type,
            FunctionIdKind::ImportedExtern => self.extern_functions[id.index as usize].return_type,
            FunctionIdKind::Intrinsic => self.intrinsic_functions[id.index as usize].return_type,
        }
    }

    pub fn stack_frame_size(&self, id: FunctionId) -> i32 {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].scope.stack_frame_size,
            _ => self.parameter_size(id),
        }
    }

    pub fn is_callable_at_compile_time(&self, id: FunctionId) -> bool {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].is_callable_at_compile_time,
            FunctionIdKind::ImportedExtern => false,
            FunctionIdKind::Intrinsic => true,
        }
    }

    pub fn is_callable_at_runtime(&self, id: FunctionId) -> bool {
        match id.kind {
            FunctionIdKind::Program => self.functions[id.index as usize].is_callable_at_runtime,
            FunctionIdKind::ImportedExtern => true,
            FunctionIdKind::Intrinsic => self.intrinsic_functions[id.index as usize].is_callable_at_runtime,
        }
    }

    pub fn abi_name_of_function(&self, id: FunctionId) -> &str {
        match id.kind {
            FunctionIdKind::Program => &self.functions[id.index as usize].abi_name,
            FunctionIdKind::ImportedExtern => &self.extern_functions[id.index as usize].abi_name,
            FunctionIdKind::Intrinsic => self.intrinsic_functions[id.index as usize].name,
        }
    }

    // -- special members -------------------------------------------------------------------

    pub fn destructor_for(&self, type_id: TypeId) -> FunctionId {
        match &self.type_with_id(type_id).kind {
            TypeKind::Array { destructor, .. } => *destructor,
            TypeKind::Struct(idx) => self.structs[*idx].destructor,
            _ => function_id_constants::INVALID,
        }
    }

    pub fn copy_constructor_for(&self, type_id: TypeId) -> FunctionId {
        match &self.type_with_id(type_id).kind {
            TypeKind::Array { copy_constructor, .. } => *copy_constructor,
            TypeKind::Struct(idx) => self.structs[*idx].copy_constructor,
            _ => function_id_constants::INVALID,
        }
    }

    pub fn move_constructor_for(&self, type_id: TypeId) -> FunctionId {
        match &self.type_with_id(type_id).kind {
            TypeKind::Array { move_constructor, .. } => *move_constructor,
            TypeKind::Struct(idx) => self.structs[*idx].move_constructor,
            _ => function_id_constants::INVALID,
        }
    }

    /// The zero-argument constructor synthesized for `type_id`, if any. Arrays reuse their
    /// element type's default constructor (run once per element); built-ins and pointers have
    /// none since their default state is simply zeroed bytes.
    pub fn default_constructor_for(&self, type_id: TypeId) -> FunctionId {
        match &self.type_with_id(type_id).kind {
            TypeKind::Array { value_type, .. } => self.default_constructor_for(*value_type),
            TypeKind::Struct(idx) => self.structs[*idx].default_constructor,
            _ => function_id_constants::INVALID,
        }
    }

    /// A type is trivial when it has no destructor/copy/move to run: built-ins, pointers, and
    /// structs/arrays whose generated special members the synthesiser elided because every member
    /// is itself trivial (spec.md ยง4.7).
    pub fn is_trivially_destructible(&self, type_id: TypeId) -> bool {
        self.destructor_for(type_id) == function_id_constants::INVALID
    }

    pub fn is_trivially_copy_constructible(&self, type_id: TypeId) -> bool {
        self.copy_constructor_for(type_id) == function_id_constants::INVALID
    }

    pub fn is_trivially_move_constructible(&self, type_id: TypeId) -> bool {
        self.move_constructor_for(type_id) == function_id_constants::INVALID
    }

    pub fn is_default_constructible(&self, type_id: TypeId) -> bool {
        match &self.type_with_id(type_id).kind {
            TypeKind::BuiltIn(_) | TypeKind::Pointer(_) | TypeKind::ArrayPointer(_) => true,
            TypeKind::Array { value_type, .. } => self.is_default_constructible(*value_type),
            TypeKind::Struct(idx) => {
                let s = &self.structs[*idx];
                s.default_constructor != function_id_constants::INVALID
                    || s.member_variables.iter().all(|m| self.is_default_constructible(m.type_id))
            }
            TypeKind::OverloadSet(_) => false,
        }
    }

    // -- overload sets as values -------------------------------------------------------------

    pub fn type_for_overload_set(&mut self, overload_set: OverloadSet) -> TypeId {
        self.overload_set_types.push(overload_set);
        let index = self.overload_set_types.len() - 1;
        self.add_type(Type {
            size: 0,
            alignment: 1,
            abi_name: format!("$overload_set{index}"),
            kind: TypeKind::OverloadSet(index),
            template_instantiation: None,
        })
    }

    pub fn overload_set_for_type(&self, overload_set_type: TypeId) -> Option<&OverloadSet> {
        match self.type_with_id(overload_set_type).kind {
            TypeKind::OverloadSet(index) => self.overload_set_types.get(index),
            _ => None,
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new()
    }
}
