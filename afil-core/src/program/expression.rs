//! The complete (fully-resolved) expression tree.
//!
//! Every variant carries enough information for [`Expression::type_id`] to answer without
//! consulting anything but the [`Program`] type registry -- the analyser never leaves a node
//! whose type depends on context that isn't reachable from the node itself.

use crate::id::{FunctionId, TypeId};
use crate::operator::Operator;
use crate::program::{Program, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Identity,
    MutRefToConstRef,
    RefToValue,
    /// Value materialised into a temporary and bound as a const reference.
    ValueToConstRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    CharLiteral(char),
    ByteLiteral(u8),
    NullLiteral,
    /// A type used as a value (e.g. `int` passed to `typeof`-like machinery); has type `type`.
    TypeLiteral(TypeId),
    StructConstructor {
        constructed_type: TypeId,
        parameters: Vec<Expression>,
    },
    LocalVariable {
        variable_type: TypeId,
        offset: i32,
    },
    GlobalVariable {
        variable_type: TypeId,
        offset: i32,
    },
    MemberVariable {
        owner: Box<Expression>,
        variable_offset: i32,
        variable_type: TypeId,
    },
    FunctionCall {
        function_id: FunctionId,
        parameters: Vec<Expression>,
        return_type: TypeId,
    },
    /// `<, <=, >, >=, !=` synthesized from `==`/`<=>`.
    RelationalOperatorCall {
        function_id: FunctionId,
        op: Operator,
        parameters: Box<[Expression; 2]>,
    },
    OverloadSetValue {
        overload_set_type: TypeId,
    },
    If {
        condition: Box<Expression>,
        then_case: Box<Expression>,
        else_case: Box<Expression>,
        result_type: TypeId,
    },
    StatementBlock {
        scope: Scope,
        statements: Vec<crate::program::statement::Statement>,
        result_type: TypeId,
    },
    Dereference {
        pointer: Box<Expression>,
        result_type: TypeId,
    },
    AddressOf {
        operand: Box<Expression>,
        result_type: TypeId,
    },
    Subscript {
        array: Box<Expression>,
        index: Box<Expression>,
        result_type: TypeId,
    },
    Reinterpret {
        operand: Box<Expression>,
        target_type: TypeId,
    },
    Conversion {
        operand: Box<Expression>,
        kind: ConversionKind,
        target_type: TypeId,
    },
    /// A plain bytewise store into the address denoted by `target`; always has type `void`.
    /// Does not invoke `target`'s destructor on the value it overwrites.
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    /// The complete type of this node, as registered in `program`.
    pub fn type_id(&self, program: &Program) -> TypeId {
        match self {
            Expression::IntLiteral(_) => program.builtin_types.int,
            Expression::FloatLiteral(_) => program.builtin_types.float,
            Expression::BoolLiteral(_) => program.builtin_types.bool,
            Expression::CharLiteral(_) => program.builtin_types.char,
            Expression::ByteLiteral(_) => program.builtin_types.byte,
            Expression::NullLiteral => program.builtin_types.null,
            Expression::TypeLiteral(_) => program.builtin_types.type_,
            Expression::StructConstructor { constructed_type, .. } => *constructed_type,
            Expression::LocalVariable { variable_type, .. } => *variable_type,
            Expression::GlobalVariable { variable_type, .. } => *variable_type,
            Expression::MemberVariable { variable_type, .. } => *variable_type,
            Expression::FunctionCall { return_type, .. } => *return_type,
            Expression::RelationalOperatorCall { .. } => program.builtin_types.bool,
            Expression::OverloadSetValue { overload_set_type } => *overload_set_type,
            Expression::If { result_type, .. } => *result_type,
            Expression::StatementBlock { result_type, .. } => *result_type,
            Expression::Dereference { result_type, .. } => *result_type,
            Expression::AddressOf { result_type, .. } => *result_type,
            Expression::Subscript { result_type, .. } => *result_type,
            Expression::Reinterpret { target_type, .. } => *target_type,
            Expression::Conversion { target_type, .. } => *target_type,
            Expression::Assign { .. } => program.builtin_types.void,
        }
    }

    /// True if this node may legally appear where a constant expression is required --
    /// conservative: literals and calls are allowed, anything involving references to mutable
    /// runtime state is not. The authoritative check is performed by actually evaluating the
    /// expression with [`crate::eval::evaluate_constant_expression`] and seeing whether it
    /// succeeds; this is a cheap pre-filter used by error messages.
    pub fn looks_constant(&self) -> bool {
        !matches!(
            self,
            Expression::LocalVariable { .. } | Expression::GlobalVariable { .. } | Expression::Assign { .. }
        )
    }
}
