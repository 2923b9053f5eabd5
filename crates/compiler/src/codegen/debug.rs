//! Code generator that also keeps names for disassembly dumps.

use super::generator::{CodeGenerator, Emitter};
use super::label::Label;
use super::linkable::Linkable;
use cmdflow_core::{CompiledFunction, FunctionId, Instruction};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Wraps a [`CodeGenerator`], recording an operation name per instruction
/// and the labels bound at each offset.
pub struct DebugCodeGenerator<A> {
    inner: CodeGenerator<A>,
    names: Vec<Option<&'static str>>,
    labels_at: BTreeMap<usize, Vec<Label>>,
}

impl<A> DebugCodeGenerator<A> {
    pub fn new() -> Self {
        Self {
            inner: CodeGenerator::new(),
            names: Vec::new(),
            labels_at: BTreeMap::new(),
        }
    }

    pub fn inner(&self) -> &CodeGenerator<A> {
        &self.inner
    }

    pub fn link(&mut self) {
        self.inner.link();
    }

    /// Render the stream as `<offset>: <name>` lines, with label lines
    /// (`<label>:`) ahead of the offset they are bound to.
    pub fn dump_disassembly(&self) -> String {
        let mut out = String::new();

        for offset in 0..=self.inner.len() {
            for label in self.labels_at.get(&offset).into_iter().flatten() {
                let _ = writeln!(out, "{}@{}:", self.inner.label_name(*label), label.index());
            }

            if offset == self.inner.len() {
                break;
            }

            let name = match (self.names[offset], self.inner.instruction(offset)) {
                (Some(name), _) => name,
                (None, Some(instruction)) => instruction.mnemonic(),
                (None, None) => "<unlinked>",
            };
            let _ = writeln!(out, "{}: {}", offset, name);
        }

        out
    }

    /// Link and produce the same artifact as [`CodeGenerator::define`].
    pub fn define(self, id: impl Into<FunctionId>) -> CompiledFunction<A> {
        self.inner.define(id)
    }
}

impl<A> Default for DebugCodeGenerator<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Emitter<A> for DebugCodeGenerator<A> {
    fn define_label(&mut self, name: &str) -> Label {
        self.inner.define_label(name)
    }

    fn emit_label(&mut self, label: Label) {
        self.labels_at.entry(self.inner.len()).or_default().push(label);
        self.inner.emit_label(label);
    }

    fn emit_plain(&mut self, action: A) {
        self.names.push(Some("plain"));
        self.inner.emit_plain(action);
    }

    fn emit_control(&mut self, instruction: Instruction<A>) {
        self.names.push(None);
        self.inner.emit_control(instruction);
    }

    fn emit_control_named(&mut self, name: &'static str, instruction: Instruction<A>) {
        self.names.push(Some(name));
        self.inner.emit_control(instruction);
    }

    fn emit_linkable(&mut self, linkable: Linkable<A>) {
        self.names.push(linkable.name());
        self.inner.emit_linkable(linkable);
    }

    fn position(&self) -> usize {
        self.inner.position()
    }
}
