//! Code generation: labels, deferred instructions and the linker.

pub mod context;
pub mod debug;
pub mod generator;
pub mod label;
pub mod linkable;

pub use context::CodegenContext;
pub use debug::DebugCodeGenerator;
pub use generator::{CodeGenerator, Emitter};
pub use label::Label;
pub use linkable::Linkable;
