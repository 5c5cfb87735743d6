//! Callable entities: program-defined functions, extern (C-ABI) functions, intrinsics, and the
//! template-parameter-aware type grammar used to describe a template's declared signature before
//! its arguments are known.

use crate::id::{FunctionId, StructTemplateId, TypeId};
use crate::incomplete;
use crate::program::expression::Expression;
use crate::program::scope::{Scope, ScopeKind};
use crate::program::statement::Statement;

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub scope: Scope,
    /// How many of `scope.variables`, in order, are parameters rather than locals.
    pub parameter_count: i32,
    pub parameter_size: i32,
    pub return_type: TypeId,
    pub preconditions: Vec<Expression>,
    pub statements: Vec<Statement>,
    pub abi_name: String,
    pub is_callable_at_compile_time: bool,
    pub is_callable_at_runtime: bool,
}

impl Function {
    pub fn parameter_types(&self) -> Vec<TypeId> {
        self.scope.variables[..self.parameter_count as usize]
            .iter()
            .map(|v| v.type_id)
            .collect()
    }
}

/// The opaque caller thunk a C-ABI function is invoked through: `caller(fn_ptr, args, ret)`.
/// Marshalling argument/return bytes is the thunk's responsibility, not the evaluator's.
pub type CFunctionCaller = unsafe extern "C" fn(*const (), *const u8, *mut u8);

#[derive(Debug, Clone)]
pub struct ExternFunction {
    pub parameter_size: i32,
    pub parameter_alignment: i32,
    pub return_type: TypeId,
    pub parameter_types: Vec<TypeId>,
    pub caller: CFunctionCaller,
    pub function_pointer: *const (),
    pub abi_name: String,
}

// SAFETY: the raw pointers are opaque handles managed by the binding layer (out of scope, per
// spec.md ยง1); the evaluator only ever passes them back to `caller`, never dereferences them.
unsafe impl Send for ExternFunction {}
unsafe impl Sync for ExternFunction {}

#[derive(Debug, Clone)]
pub struct IntrinsicFunction {
    pub return_type: TypeId,
    pub parameter_types: Vec<TypeId>,
    pub name: &'static str,
    pub is_callable_at_runtime: bool,
}

/// Template-parameter-aware type grammar: describes a template's declared parameter/return types
/// before the template arguments are known, so overload resolution can attempt deduction against
/// it without instantiating first.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateParamTypeValue {
    /// A concrete, already-resolved type appearing in a template's signature (e.g. a
    /// non-template parameter of a function template).
    BaseCase(TypeId),
    /// References the template's `index`-th template parameter.
    TemplateParameter(usize),
    Pointer(Box<TemplateParamType>),
    Array { value_type: Box<TemplateParamType>, size: i32 },
    ArrayPointer(Box<TemplateParamType>),
    TemplateInstantiation { template_id: StructTemplateId, parameters: Vec<TemplateParamType> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParamType {
    pub value: TemplateParamTypeValue,
    pub is_mutable: bool,
    pub is_reference: bool,
}

impl TemplateParamType {
    pub fn base_case(type_id: TypeId) -> Self {
        TemplateParamType { value: TemplateParamTypeValue::BaseCase(type_id), is_mutable: false, is_reference: false }
    }

    pub fn template_parameter(index: usize) -> Self {
        TemplateParamType { value: TemplateParamTypeValue::TemplateParameter(index), is_mutable: false, is_reference: false }
    }
}

#[derive(Debug, Clone)]
pub struct IntrinsicFunctionTemplate {
    pub instantiation_function: fn(&[TypeId], &mut crate::program::Program) -> Function,
    pub parameter_types: Vec<TemplateParamType>,
    pub concepts: Vec<FunctionId>,
    pub abi_name: String,
    pub template_parameter_count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplateParameter {
    pub name: String,
    pub type_id: TypeId,
}

/// A frozen copy of the scope chain visible at a template's definition site, re-entered whenever
/// the template is instantiated. Snapshotting (rather than keeping a live reference) is what lets
/// `Program` grow after the template is registered without invalidating it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeStackSnapshot {
    pub entries: Vec<(Scope, ScopeKind)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTemplate {
    pub incomplete_function: incomplete::FunctionLiteral,
    pub concepts: Vec<FunctionId>,
    pub parameter_types: Vec<TemplateParamType>,
    pub scope_template_parameters: Vec<ResolvedTemplateParameter>,
    pub scope_stack: ScopeStackSnapshot,
    pub abi_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructTemplate {
    pub incomplete_struct: incomplete::Struct,
    pub concepts: Vec<FunctionId>,
    pub scope_template_parameters: Vec<ResolvedTemplateParameter>,
    pub scope_stack: ScopeStackSnapshot,
    pub abi_name: String,
}

/// The union of function and function-template declarations reachable by some name in some
/// scope. First-class: [`crate::program::Program::overload_set_types`] lets one be bound and
/// passed around as a value of `OverloadSetType`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverloadSet {
    pub function_ids: Vec<FunctionId>,
    pub function_template_ids: Vec<crate::id::FunctionTemplateId>,
}

impl OverloadSet {
    pub fn is_empty(&self) -> bool {
        self.function_ids.is_empty() && self.function_template_ids.is_empty()
    }

    pub fn extend(&mut self, other: &OverloadSet) {
        self.function_ids.extend(other.function_ids.iter().copied());
        self.function_template_ids.extend(other.function_template_ids.iter().copied());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub scope: Scope,
    pub name: String,
    pub nested_namespaces: Vec<Namespace>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Namespace { scope: Scope::new(), name: name.into(), nested_namespaces: Vec::new() }
    }

    pub fn find_namespace(&self, name: &str) -> Option<&Namespace> {
        self.nested_namespaces.iter().find(|n| n.name == name)
    }

    pub fn find_namespace_mut(&mut self, name: &str) -> Option<&mut Namespace> {
        self.nested_namespaces.iter_mut().find(|n| n.name == name)
    }

    pub fn add_namespace(&mut self, name: impl Into<String>) -> &mut Namespace {
        let name = name.into();
        if let Some(idx) = self.nested_namespaces.iter().position(|n| n.name == name) {
            return &mut self.nested_namespaces[idx];
        }
        self.nested_namespaces.push(Namespace::new(name));
        self.nested_namespaces.last_mut().expect("just pushed")
    }
}
