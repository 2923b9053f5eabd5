//! Instructions whose encoding waits on label offsets.

use super::label::Label;
use cmdflow_core::Instruction;
use std::fmt;

type LinkFn<A> = Box<dyn FnOnce(&[usize]) -> Instruction<A>>;

/// A deferred instruction.
///
/// Records the labels it depends on and a factory that receives their
/// resolved offsets, in the same order, during the link pass.
pub struct Linkable<A> {
    name: Option<&'static str>,
    targets: Vec<Label>,
    link: LinkFn<A>,
}

impl<A: 'static> Linkable<A> {
    pub fn new(
        targets: Vec<Label>,
        link: impl FnOnce(&[usize]) -> Instruction<A> + 'static,
    ) -> Self {
        Self {
            name: None,
            targets,
            link: Box::new(link),
        }
    }

    pub fn named(
        name: &'static str,
        targets: Vec<Label>,
        link: impl FnOnce(&[usize]) -> Instruction<A> + 'static,
    ) -> Self {
        Self {
            name: Some(name),
            ..Self::new(targets, link)
        }
    }

    pub fn branch(name: &'static str, target: Label) -> Self {
        Self::named(name, vec![target], |at| Instruction::Branch { target: at[0] })
    }

    pub fn call(name: &'static str, target: Label) -> Self {
        Self::named(name, vec![target], |at| Instruction::Call { target: at[0] })
    }

    pub fn push_instr_address(name: &'static str, target: Label) -> Self {
        Self::named(name, vec![target], |at| {
            Instruction::PushInstrAddress { target: at[0] }
        })
    }

    pub fn subroutine_call(name: &'static str, target: Label) -> Self {
        Self::named(name, vec![target], |at| {
            Instruction::SubroutineCall { target: at[0] }
        })
    }
}

impl<A> Linkable<A> {
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn targets(&self) -> &[Label] {
        &self.targets
    }

    pub(crate) fn link(self, offsets: &[usize]) -> Instruction<A> {
        (self.link)(offsets)
    }
}

impl<A> fmt::Debug for Linkable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linkable")
            .field("name", &self.name)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
