//! Symbolic jump targets.

/// Handle to a label record owned by a code generator.
///
/// Labels are indices into the generator's label arena, so any number of
/// pending instructions can refer to the same label before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) usize);

impl Label {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena entry: debug name and the offset once bound.
#[derive(Debug, Clone)]
pub(crate) struct LabelSlot {
    pub(crate) name: String,
    pub(crate) offset: Option<usize>,
}

impl LabelSlot {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            offset: None,
        }
    }

    /// Bind the label. Binding twice is a generator bug.
    pub(crate) fn bind(&mut self, offset: usize) {
        if let Some(previous) = self.offset {
            panic!(
                "internal error: label '{}' emitted twice (first at offset {})",
                self.name, previous
            );
        }
        self.offset = Some(offset);
    }

    /// Offset for the link pass. An unbound label is a generator bug.
    pub(crate) fn resolved(&self) -> usize {
        match self.offset {
            Some(offset) => offset,
            None => panic!("internal error: label '{}' linked but never emitted", self.name),
        }
    }
}
