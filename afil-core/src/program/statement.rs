//! The complete (fully-resolved) statement tree. Mirrors `complete::Statement` in the original
//! implementation's `complete_statement.hh`: one variant per statement form, no shared base.

use crate::program::Scope;
use crate::program::expression::Expression;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    VariableDeclaration {
        variable_offset: i32,
        assigned_expression: Expression,
    },
    ExpressionStatement(Expression),
    Return(Expression),
    If {
        condition: Expression,
        then_case: Box<Statement>,
        else_case: Option<Box<Statement>>,
    },
    Block {
        scope: Scope,
        statements: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    For {
        scope: Scope,
        init_statement: Box<Statement>,
        condition: Expression,
        end_expression: Expression,
        body: Box<Statement>,
    },
    Break,
    Continue,
}
