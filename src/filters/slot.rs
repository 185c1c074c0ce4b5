//! Slot of a QuotientFilter.

/// Content of a single QuotientFilter slot: a remainder plus three status bits.
///
/// The `is_occupied` bit belongs to the slot position, i.e. it stays in place when content is
/// shifted. The other bits and the remainder describe the content and travel with it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub(crate) remainder: u64,
    pub(crate) is_occupied: bool,
    pub(crate) is_continuation: bool,
    pub(crate) is_shifted: bool,
}

impl Slot {
    /// Stored remainder, `None` if the slot is empty.
    pub fn remainder(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.remainder)
        }
    }

    /// At least one element has this slot as its canonical position. The element itself may be
    /// stored elsewhere.
    pub fn is_occupied(&self) -> bool {
        self.is_occupied
    }

    /// Content of this slot continues a run instead of starting it.
    pub fn is_continuation(&self) -> bool {
        self.is_continuation
    }

    /// Content of this slot is not stored at its canonical position.
    pub fn is_shifted(&self) -> bool {
        self.is_shifted
    }

    /// Slot holds no content. An occupied slot is never empty.
    pub fn is_empty(&self) -> bool {
        !self.is_occupied && !self.is_continuation && !self.is_shifted
    }

    /// Content of this slot is the first remainder of a run.
    pub fn is_run_start(&self) -> bool {
        !self.is_empty() && !self.is_continuation
    }

    /// Content of this slot is the first remainder of a cluster, i.e. it sits at its canonical
    /// position.
    pub fn is_cluster_start(&self) -> bool {
        self.is_occupied && !self.is_continuation && !self.is_shifted
    }
}
