//! Compiled function artifact.

use crate::instruction::Instruction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a compiled unit, e.g. `demo:spawn_wave`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FunctionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An ordered, 0-indexed instruction array tagged with its origin.
///
/// Offsets are stable and double as VM instruction-pointer values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledFunction<A> {
    pub id: FunctionId,
    pub instructions: Vec<Instruction<A>>,
}

impl<A> CompiledFunction<A> {
    pub fn new(id: FunctionId, instructions: Vec<Instruction<A>>) -> Self {
        Self { id, instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<&Instruction<A>> {
        self.instructions.get(offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction<A>> {
        self.instructions.iter()
    }

    /// Number of instructions that came from the host grammar.
    pub fn plain_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_plain()).count()
    }
}
