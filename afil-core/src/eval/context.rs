//! The two execution contexts the evaluator runs under (spec.md ยง4.8): ordinary runtime execution
//! of `main`, and the compile-time evaluation used for array sizes, struct member defaults, and
//! concept checks. Both share every other evaluator code path; only which functions are callable
//! differs (an extern/imported function has no meaning at compile time).
//!
//! Grounded on `RunTimeEnvironment`/`CompileTimeEnvironment` in the original implementation's
//! `interpreter.hh`.

use crate::id::FunctionId;
use crate::program::Program;

pub trait ExecutionContext {
    fn is_function_callable(&self, program: &Program, id: FunctionId) -> bool;
    /// A short label used only in error messages ("a compile-time constant" vs "at runtime").
    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeContext;

impl ExecutionContext for RuntimeContext {
    fn is_function_callable(&self, program: &Program, id: FunctionId) -> bool {
        program.is_callable_at_runtime(id)
    }
    fn label(&self) -> &'static str {
        "at runtime"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileTimeContext;

impl ExecutionContext for CompileTimeContext {
    fn is_function_callable(&self, program: &Program, id: FunctionId) -> bool {
        program.is_callable_at_compile_time(id)
    }
    fn label(&self) -> &'static str {
        "at compile time"
    }
}
