//! How a statement's execution propagates out of the block/loop/function that contains it
//! (spec.md ยง4.9).
//!
//! Grounded on `ControlFlowType`/`ControlFlow` in the original implementation's `interpreter.hh`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlowKind {
    Nothing,
    Return,
    Break,
    Continue,
}

/// `destroyed_frame_size` accumulates the size of every scope this control flow has already
/// unwound through on its way out -- each enclosing block adds its own scope size once, when it
/// observes a non-`Nothing` flow propagating out of one of its statements. Never consulted for
/// correctness here (every block also frees its own frame directly via `ProgramStack::free_up_to`
/// before returning), only carried forward to match spec.md ยง4.9's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlow {
    pub kind: ControlFlowKind,
    pub destroyed_frame_size: i32,
}

impl ControlFlow {
    pub const NOTHING: ControlFlow = ControlFlow { kind: ControlFlowKind::Nothing, destroyed_frame_size: 0 };

    pub fn is_nothing(self) -> bool {
        self.kind == ControlFlowKind::Nothing
    }

    /// Adds `frame_size` to the running total and keeps the same kind -- used by a block that is
    /// about to unwind past its own scope on the way out.
    #[must_use]
    pub fn unwind_through(mut self, frame_size: i32) -> Self {
        self.destroyed_frame_size += frame_size;
        self
    }
}
