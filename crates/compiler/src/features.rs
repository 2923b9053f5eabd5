//! Compile-time feature flags toggled by `pragma` directives.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a pragma names a feature that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown pragma feature flag '{0}'")]
pub struct UnknownFeature(pub String);

/// Known feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Alternate control-flow syntax. Disables `run`/`loop` blocks.
    ControlFlowV2,
    /// `subroutine`, `subroutine_call` and `subroutine_return`.
    Subroutines,
    /// Log the AST and disassembly of the compiled function.
    DebugDump,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::ControlFlowV2, Feature::Subroutines, Feature::DebugDump];

    /// Name used in `pragma enable <name>`
    pub fn name(self) -> &'static str {
        match self {
            Feature::ControlFlowV2 => "cfv2",
            Feature::Subroutines => "subroutines",
            Feature::DebugDump => "debug",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.name() == name)
            .ok_or_else(|| UnknownFeature(name.to_string()))
    }
}

/// Which block syntax `run`/`loop` statements follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlowSyntax {
    /// `run <selector> { ... }` and `loop <selector> { ... }`
    Blocks,
    /// Reserved for the structured syntax; blocks are rejected.
    Structured,
}

/// Feature flags for one compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    control_flow_v2: bool,
    subroutines: bool,
    debug_dump: bool,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, name: &str) -> Result<(), UnknownFeature> {
        self.set(name.parse()?, true);
        Ok(())
    }

    pub fn disable(&mut self, name: &str) -> Result<(), UnknownFeature> {
        self.set(name.parse()?, false);
        Ok(())
    }

    pub fn set(&mut self, feature: Feature, value: bool) {
        match feature {
            Feature::ControlFlowV2 => self.control_flow_v2 = value,
            Feature::Subroutines => self.subroutines = value,
            Feature::DebugDump => self.debug_dump = value,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::ControlFlowV2 => self.control_flow_v2,
            Feature::Subroutines => self.subroutines,
            Feature::DebugDump => self.debug_dump,
        }
    }

    pub fn is_control_flow_v2(&self) -> bool {
        self.control_flow_v2
    }

    pub fn is_subroutines(&self) -> bool {
        self.subroutines
    }

    pub fn is_debug_dump(&self) -> bool {
        self.debug_dump
    }

    pub fn control_flow(&self) -> ControlFlowSyntax {
        if self.control_flow_v2 {
            ControlFlowSyntax::Structured
        } else {
            ControlFlowSyntax::Blocks
        }
    }
}
