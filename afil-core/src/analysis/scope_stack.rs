//! The analysis-time scope stack: an ordered list of scopes being analysed right now, each tagged
//! with the role it plays (global / namespace / function / block). Never serialised, never part
//! of [`crate::program::Program`] -- it exists only while [`crate::analysis::analyse`] is running,
//! or while a template capture is being replayed.

use crate::program::{Scope, ScopeKind, ScopeStackSnapshot};

#[derive(Debug, Clone)]
pub struct ScopeStack {
    pub entries: Vec<(Scope, ScopeKind)>,
    /// How many enclosing `while`/`for` bodies the current position is lexically inside of.
    /// Tracked separately from [`ScopeKind`] since a loop body is, scope-wise, an ordinary block.
    loop_depth: i32,
}

impl ScopeStack {
    pub fn new(global_scope: Scope) -> Self {
        ScopeStack { entries: vec![(global_scope, ScopeKind::Global)], loop_depth: 0 }
    }

    pub fn from_snapshot(snapshot: &ScopeStackSnapshot) -> Self {
        ScopeStack { entries: snapshot.entries.clone(), loop_depth: 0 }
    }

    pub fn snapshot(&self) -> ScopeStackSnapshot {
        ScopeStackSnapshot { entries: self.entries.clone() }
    }

    pub fn push(&mut self, scope: Scope, kind: ScopeKind) {
        self.entries.push((scope, kind));
    }

    pub fn pop(&mut self) -> (Scope, ScopeKind) {
        self.entries.pop().expect("scope stack must not be popped past the global scope")
    }

    pub fn current(&self) -> &Scope {
        &self.entries.last().expect("scope stack is never empty").0
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        &mut self.entries.last_mut().expect("scope stack is never empty").0
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.entries.last().expect("scope stack is never empty").1
    }

    /// Cumulative stack-frame bytes allocated by enclosing scopes above the current one, up to
    /// and including the nearest function/global scope -- the glossary's "scope offset". Adding
    /// this to a variable's scope-local offset gives its absolute stack address.
    pub fn current_scope_offset(&self) -> i32 {
        self.scope_offset_at(self.entries.len() - 1)
    }

    /// Same computation as [`Self::current_scope_offset`], anchored at `index` instead of the
    /// actual top of stack -- used by name lookup to compute a found variable's absolute offset
    /// from the scope it was actually declared in, not from the scope doing the looking-up (which
    /// may be nested arbitrarily deeper).
    pub(crate) fn scope_offset_at(&self, index: usize) -> i32 {
        let mut size = 0;
        for i in (0..index).rev() {
            size += self.entries[i].0.stack_frame_size;
            if matches!(self.entries[i].1, ScopeKind::Global | ScopeKind::Function) {
                break;
            }
        }
        size
    }

    /// True if a loop scope (while/for body) lexically encloses the current position -- used to
    /// validate `break`/`continue`.
    pub fn inside_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        self.loop_depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_accumulates_enclosing_block_frames() {
        let mut stack = ScopeStack::new(Scope::new());
        stack.push(Scope::new(), ScopeKind::Function);
        stack.current_mut().add_variable("x", crate::id::TypeId::new(0), 8, 8);
        stack.push(Scope::new(), ScopeKind::Block);
        assert_eq!(stack.current_scope_offset(), 8);
    }
}
