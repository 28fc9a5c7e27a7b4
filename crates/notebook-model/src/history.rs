//! Per-document undo/redo stacks.
//!
//! Each notebook document owns one `History`. Committing a forward command
//! pushes its inverse onto the undo stack and clears the redo stack; undo
//! and redo shuttle commands between the two stacks, re-deriving the
//! inverse on every application so repeated undo/redo cycles stay stable.

use crate::command::Command;

/// The undo/redo pair of command stacks. Bounded only by memory.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<Command>,
    redo: Vec<Command>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the inverse of a freshly committed forward command. Any new
    /// forward edit invalidates the redo stack.
    pub fn record(&mut self, inverse: Command) {
        self.undo.push(inverse);
        self.redo.clear();
    }

    pub fn pop_undo(&mut self) -> Option<Command> {
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<Command> {
        self.redo.pop()
    }

    /// Push the inverse produced by applying an undo command.
    pub fn push_redo(&mut self, inverse: Command) {
        self.redo.push(inverse);
    }

    /// Push the inverse produced by applying a redo command.
    pub fn push_undo(&mut self, inverse: Command) {
        self.undo.push(inverse);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new();
        history.push_redo(Command::delete(Uuid::new_v4()));
        assert!(history.can_redo());

        history.record(Command::delete(Uuid::new_v4()));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_stacks_are_lifo() {
        let mut history = History::new();
        let first = Command::delete(Uuid::new_v4());
        let second = Command::delete(Uuid::new_v4());
        history.record(first.clone());
        history.record(second.clone());

        assert_eq!(history.pop_undo(), Some(second));
        assert_eq!(history.pop_undo(), Some(first));
        assert_eq!(history.pop_undo(), None);
    }

    #[test]
    fn test_clear_empties_both_stacks() {
        let mut history = History::new();
        history.record(Command::delete(Uuid::new_v4()));
        history.push_redo(Command::delete(Uuid::new_v4()));

        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
