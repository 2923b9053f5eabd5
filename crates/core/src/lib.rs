//! Core types shared by the cmdflow compiler and its host.
//!
//! This crate defines the contract on both sides of the compiler:
//! - The instruction set a conforming VM executes
//! - The compiled function artifact
//! - The host grammar seam that turns one statement into an opaque action

pub mod function;
pub mod grammar;
pub mod instruction;

// Re-export commonly used types at the crate root
pub use function::{CompiledFunction, FunctionId};
pub use grammar::{CommandGrammar, SelectorKind, SyntaxError};
pub use instruction::{ControlOp, Instruction, EXIT_TARGET};
