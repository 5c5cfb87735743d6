//! Semantic analyser, template instantiator and stack evaluator for the afil language (spec.md
//! §1): turns a topologically-ordered list of [`incomplete::Module`]s into a complete
//! [`program::Program`], then runs it.
//!
//! Every failure path is an explicit `Result` -- `analysis::SyntaxError` for a source-attributable
//! analysis failure, `analysis::UnmetPrecondition` for a failed runtime contract. Nothing in this
//! crate writes to stdout or stderr; that's `afil-cli`'s job.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod analysis;
pub mod eval;
pub mod id;
pub mod incomplete;
pub mod intrinsics;
pub mod operator;
pub mod program;
pub mod span;

pub use analysis::{SyntaxError, UnmetPrecondition, analyse};
pub use program::Program;

/// Runs `program`'s global initializers and then `main`, returning `main`'s `i32` result (spec.md
/// §6). `stack_size` bounds the evaluator's byte-addressed stack; a program that nests deeper than
/// this returns no error here, it is expected to be caught earlier by analysis or to panic on
/// allocation exhaustion (spec.md's Non-goals exclude stack-depth diagnostics).
pub fn run(program: &Program, stack_size: usize) -> Result<i32, UnmetPrecondition> {
    eval::run(program, stack_size)
}

/// Evaluates `expr` -- which must already be known to be a constant expression, e.g. via
/// `analysis::expression::analyse_constant_expression` -- and memcopies its result bytes into
/// `out_bytes` (spec.md §6). `out_bytes` must be exactly `program.type_size(expr.type_id(program))`
/// bytes long.
pub fn evaluate_constant_expression(program: &Program, expr: &program::Expression, out_bytes: &mut [u8]) -> Result<(), UnmetPrecondition> {
    eval::evaluate_constant_expression(program, expr, out_bytes)
}

/// Default evaluator stack size (spec.md §6), used by `afil-cli` when `--stack-size` isn't given.
pub const DEFAULT_STACK_SIZE: usize = 2048;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incomplete::{Expression, ExpressionValue, FunctionLiteral, GlobalBinding, Literal, Module, Statement, StatementValue};
    use crate::span::Span;

    fn int_literal(n: i64) -> Expression {
        Expression { value: ExpressionValue::Literal(Literal::Int(n)), span: Span::empty() }
    }

    /// `let main = fn () -> int { return 42; };` analysed and run end to end.
    #[test]
    fn run_executes_main_and_returns_its_value() {
        let main = FunctionLiteral {
            template_parameters: Vec::new(),
            concepts: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            statements: vec![Statement { value: StatementValue::Return(int_literal(42)), span: Span::empty() }],
            span: Span::empty(),
        };
        let module = Module {
            name: "main".to_string(),
            dependencies: Vec::new(),
            structs: Vec::new(),
            globals: vec![GlobalBinding {
                name: "main".to_string(),
                declared_type: None,
                initializer: Expression { value: ExpressionValue::FunctionLiteral(Box::new(main)), span: Span::empty() },
                span: Span::empty(),
            }],
        };
        let program = analyse(&[module]).expect("analysis should succeed");
        assert_eq!(run(&program, DEFAULT_STACK_SIZE), Ok(42));
    }
}
