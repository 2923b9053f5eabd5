//! Instruction set understood by a conforming executor.
//!
//! The compiler only constructs these values; executing them is the host VM's
//! job. The VM keeps three explicit stacks per invocation (current source,
//! pending source list, saved instruction address) plus a separate return
//! stack for user subroutines, so every instruction boundary is a valid
//! suspend point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Branch target meaning "terminate the whole invocation".
pub const EXIT_TARGET: usize = usize::MAX;

/// A single instruction in a compiled function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction<A> {
    /// Opaque action produced by the host command grammar.
    Plain(A),
    /// Unconditional jump. `EXIT_TARGET` ends the invocation.
    Branch { target: usize },
    /// Push the address of the next instruction onto the saved-address stack,
    /// then jump.
    Call { target: usize },
    /// Push `target` onto the saved-address stack.
    PushInstrAddress { target: usize },
    /// Pop the saved-address stack and jump there.
    Return,
    /// Call a user subroutine through the subroutine return stack.
    ///
    /// The return-stack entry records the address of the next instruction
    /// together with the current depths of the frame stack and the
    /// saved-address stack.
    SubroutineCall { target: usize },
    /// Return from a user subroutine.
    ///
    /// Pops the return-stack entry, truncates the frame stack and the
    /// saved-address stack back to the recorded depths, and jumps to the
    /// recorded address. Truncating the frame stack restores the source
    /// that was current at the call, so a return from inside `run` or
    /// `loop` (at any recursion depth) leaves no frames behind.
    SubroutineReturn,
    /// Frame-stack operation used by `run` and `loop`.
    Control(ControlOp<A>),
}

/// Operations on the source / pending-list frame stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlOp<A> {
    /// Push the current source and an empty pending list, then execute
    /// `selector` so that every match is appended to that list.
    PushSourceAndMatch { selector: A },
    /// Jump to `exit` if the topmost pending list is empty; otherwise pop its
    /// front element and make it the current source.
    PopSourceOrBranch { exit: usize },
    /// Pop the pending list and restore the previous current source.
    PopFrame,
}

impl<A> Instruction<A> {
    /// The "terminate invocation" branch.
    pub fn exit() -> Self {
        Instruction::Branch {
            target: EXIT_TARGET,
        }
    }

    /// Short operation name, used by disassembly.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Plain(_) => "plain",
            Instruction::Branch { target } if *target == EXIT_TARGET => "exit",
            Instruction::Branch { .. } => "branch",
            Instruction::Call { .. } => "call",
            Instruction::PushInstrAddress { .. } => "push_instr_address",
            Instruction::Return => "return",
            Instruction::SubroutineCall { .. } => "subroutine_call",
            Instruction::SubroutineReturn => "subroutine_return",
            Instruction::Control(op) => op.mnemonic(),
        }
    }

    /// Jump target encoded in this instruction, if any.
    pub fn target(&self) -> Option<usize> {
        match self {
            Instruction::Branch { target }
            | Instruction::Call { target }
            | Instruction::PushInstrAddress { target }
            | Instruction::SubroutineCall { target } => Some(*target),
            Instruction::Control(ControlOp::PopSourceOrBranch { exit }) => Some(*exit),
            _ => None,
        }
    }

    /// Whether this instruction was produced by the host grammar.
    pub fn is_plain(&self) -> bool {
        matches!(self, Instruction::Plain(_))
    }
}

impl<A> ControlOp<A> {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ControlOp::PushSourceAndMatch { .. } => "push_source_and_match",
            ControlOp::PopSourceOrBranch { .. } => "pop_source_or_branch",
            ControlOp::PopFrame => "pop_frame",
        }
    }
}

impl<A: fmt::Debug> fmt::Display for Instruction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Plain(action) => write!(f, "plain {:?}", action),
            Instruction::Control(ControlOp::PushSourceAndMatch { selector }) => {
                write!(f, "push_source_and_match {:?}", selector)
            }
            other => match other.target() {
                Some(EXIT_TARGET) => write!(f, "{}", other.mnemonic()),
                Some(target) => write!(f, "{} {}", other.mnemonic(), target),
                None => write!(f, "{}", other.mnemonic()),
            },
        }
    }
}
