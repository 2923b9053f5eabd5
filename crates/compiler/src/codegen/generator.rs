//! Two-pass code generation.
//!
//! Emission is a single left-to-right pass that allocates labels and records
//! which pending instructions depend on them. Linking is a second pass over
//! already-known offsets:
//! 1. Emit: append ready instructions, bind labels, queue linkables
//! 2. Link: materialize every linkable, in emission order, exactly once

use super::label::{Label, LabelSlot};
use super::linkable::Linkable;
use cmdflow_core::{CompiledFunction, FunctionId, Instruction};

/// Emission interface shared by the plain and debug generators.
pub trait Emitter<A> {
    /// Allocate a new, unbound label.
    fn define_label(&mut self, name: &str) -> Label;

    /// Bind `label` to the current end of the instruction stream.
    fn emit_label(&mut self, label: Label);

    /// Append a host action.
    fn emit_plain(&mut self, action: A);

    /// Append a control instruction with no label dependencies.
    fn emit_control(&mut self, instruction: Instruction<A>);

    /// Like [`Emitter::emit_control`], with a name for disassembly.
    fn emit_control_named(&mut self, name: &'static str, instruction: Instruction<A>);

    /// Append a placeholder resolved during linking.
    fn emit_linkable(&mut self, linkable: Linkable<A>);

    /// Offset the next instruction will occupy.
    fn position(&self) -> usize;
}

impl<'a, A: 'static> dyn Emitter<A> + 'a {
    /// Append a named control instruction built from resolved label offsets.
    pub fn emit_control_linkable(
        &mut self,
        name: &'static str,
        targets: Vec<Label>,
        link: impl FnOnce(&[usize]) -> Instruction<A> + 'static,
    ) {
        self.emit_linkable(Linkable::named(name, targets, link));
    }
}

enum Slot<A> {
    Ready(Instruction<A>),
    Pending(Linkable<A>),
}

/// Accumulates instructions and labels for one compiled function.
pub struct CodeGenerator<A> {
    labels: Vec<LabelSlot>,
    code: Vec<Slot<A>>,
}

impl<A> CodeGenerator<A> {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Bound offset of `label`, if it has been emitted.
    pub fn label_offset(&self, label: Label) -> Option<usize> {
        self.labels[label.0].offset
    }

    pub fn label_name(&self, label: Label) -> &str {
        &self.labels[label.0].name
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Instruction at `offset`, or `None` if it is still waiting on linking.
    pub fn instruction(&self, offset: usize) -> Option<&Instruction<A>> {
        match self.code.get(offset)? {
            Slot::Ready(instruction) => Some(instruction),
            Slot::Pending(_) => None,
        }
    }

    /// Number of instructions still waiting on the link pass.
    pub fn pending_count(&self) -> usize {
        self.code
            .iter()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }

    /// Resolve every pending instruction. Linking twice is a no-op.
    pub fn link(&mut self) {
        let labels = &self.labels;
        let code = std::mem::take(&mut self.code);

        self.code = code
            .into_iter()
            .map(|slot| match slot {
                Slot::Pending(linkable) => {
                    let offsets: Vec<usize> = linkable
                        .targets()
                        .iter()
                        .map(|label| labels[label.0].resolved())
                        .collect();
                    Slot::Ready(linkable.link(&offsets))
                }
                ready => ready,
            })
            .collect();
    }

    /// Link and produce the compiled function.
    pub fn define(mut self, id: impl Into<FunctionId>) -> CompiledFunction<A> {
        let id = id.into();
        self.link();

        let instructions: Vec<_> = self
            .code
            .into_iter()
            .map(|slot| match slot {
                Slot::Ready(instruction) => instruction,
                Slot::Pending(_) => unreachable!("link() resolves every pending slot"),
            })
            .collect();

        tracing::debug!(
            function = %id,
            instructions = instructions.len(),
            labels = self.labels.len(),
            "linked function"
        );

        CompiledFunction::new(id, instructions)
    }
}

impl<A> Default for CodeGenerator<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Emitter<A> for CodeGenerator<A> {
    fn define_label(&mut self, name: &str) -> Label {
        self.labels.push(LabelSlot::new(name));
        Label(self.labels.len() - 1)
    }

    fn emit_label(&mut self, label: Label) {
        let offset = self.code.len();
        self.labels[label.0].bind(offset);
    }

    fn emit_plain(&mut self, action: A) {
        self.code.push(Slot::Ready(Instruction::Plain(action)));
    }

    fn emit_control(&mut self, instruction: Instruction<A>) {
        self.code.push(Slot::Ready(instruction));
    }

    fn emit_control_named(&mut self, _name: &'static str, instruction: Instruction<A>) {
        self.emit_control(instruction);
    }

    fn emit_linkable(&mut self, linkable: Linkable<A>) {
        self.code.push(Slot::Pending(linkable));
    }

    fn position(&self) -> usize {
        self.code.len()
    }
}
