//! [`Type`] and the entities that hang off a struct type: members, constructors, special members.

use crate::id::{FunctionId, StructTemplateId, TypeId, function_id_constants};

/// The eight primitive kinds the language has no further structure for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    Int,
    Float,
    Bool,
    Char,
    Byte,
    Type,
    Null,
    Void,
}

/// Discriminant + payload for a registered [`Type`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    BuiltIn(BuiltIn),
    Pointer(TypeId),
    ArrayPointer(TypeId),
    Array {
        value_type: TypeId,
        size: i32,
        destructor: FunctionId,
        copy_constructor: FunctionId,
        move_constructor: FunctionId,
    },
    Struct(usize),
    /// Index into `program.overload_set_types`: overload sets are first-class values of this
    /// type so they can be bound and passed (spec.md ยง4.3's "overload sets as values").
    OverloadSet(usize),
}

/// Where a type came from, for reverse lookup and pretty-printing of `Foo<int, 3>`-shaped names.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInstantiationOrigin {
    pub template_id: StructTemplateId,
    pub parameters: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub size: i32,
    pub alignment: i32,
    pub abi_name: String,
    pub kind: TypeKind,
    pub template_instantiation: Option<TemplateInstantiationOrigin>,
}

impl Type {
    pub fn builtin(kind: BuiltIn, size: i32, alignment: i32, abi_name: &str) -> Self {
        Type { size, alignment, abi_name: abi_name.to_string(), kind: TypeKind::BuiltIn(kind), template_instantiation: None }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_array_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::ArrayPointer(_))
    }

    pub fn is_pointer_or_array_pointer(&self) -> bool {
        self.is_pointer() || self.is_array_pointer()
    }
}

/// A member variable of a struct, with its byte offset inside the struct and an optional
/// default-value expression used when a designated initializer omits it.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberVariable {
    pub name: String,
    pub type_id: TypeId,
    pub offset: i32,
    pub initializer_expression: Option<crate::program::expression::Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub function: FunctionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub member_variables: Vec<MemberVariable>,
    pub destructor: FunctionId,
    pub constructors: Vec<Constructor>,
    pub default_constructor: FunctionId,
    pub copy_constructor: FunctionId,
    pub move_constructor: FunctionId,
    /// False once any special member has been user-defined; controls whether future member
    /// additions may still auto-regenerate special members.
    pub has_compiler_generated_constructors: bool,
}

impl Struct {
    pub fn new_incomplete() -> Self {
        Struct {
            member_variables: Vec::new(),
            destructor: function_id_constants::INVALID,
            constructors: Vec::new(),
            default_constructor: function_id_constants::INVALID,
            copy_constructor: function_id_constants::INVALID,
            move_constructor: function_id_constants::INVALID,
            has_compiler_generated_constructors: true,
        }
    }

    pub fn find_member_variable(&self, name: &str) -> Option<usize> {
        self.member_variables.iter().position(|m| m.name == name)
    }

    pub fn constructor_overload_set(&self, constructor_name: &str) -> Vec<FunctionId> {
        self.constructors
            .iter()
            .filter(|c| c.name == constructor_name)
            .map(|c| c.function)
            .collect()
    }
}
