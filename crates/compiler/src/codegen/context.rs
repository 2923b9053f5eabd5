//! Compile-scoped state threaded through AST emission.

use super::label::Label;
use std::collections::HashMap;

/// Subroutine symbol table and the active `break` target.
#[derive(Debug, Clone, Default)]
pub struct CodegenContext {
    subroutines: HashMap<String, Label>,
    break_target: Option<Label>,
}

impl CodegenContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subroutine entry label.
    ///
    /// Returns `false` and keeps the existing label if `name` is taken.
    pub fn declare_subroutine(&mut self, name: &str, label: Label) -> bool {
        if self.subroutines.contains_key(name) {
            return false;
        }
        self.subroutines.insert(name.to_string(), label);
        true
    }

    pub fn subroutine(&self, name: &str) -> Option<Label> {
        self.subroutines.get(name).copied()
    }

    pub fn subroutine_count(&self) -> usize {
        self.subroutines.len()
    }

    pub fn break_target(&self) -> Option<Label> {
        self.break_target
    }

    /// Make `label` the break target, returning the one it shadows.
    pub fn push_break_target(&mut self, label: Label) -> Option<Label> {
        self.break_target.replace(label)
    }

    /// Undo a [`CodegenContext::push_break_target`].
    pub fn restore_break_target(&mut self, saved: Option<Label>) {
        self.break_target = saved;
    }
}
