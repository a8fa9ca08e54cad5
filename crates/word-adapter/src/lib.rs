//! Word/byte buffering adapters between the register bank and the queues.
//!
//! Both directions use the same byte order: lane 0 (bits 7-0) travels
//! first, lane 3 (bits 31-24) last.

mod assembler;
mod splitter;

pub use assembler::{AssemblerInputs, AssemblerOutputs, AssemblerState, WordAssembler};
pub use splitter::{SplitterInputs, SplitterOutputs, SplitterState, WordSplitter};

/// Byte position within a 32-bit word. Always in `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteLane(u8);

impl ByteLane {
    /// First lane on the wire (least-significant byte).
    pub const FIRST: Self = Self(0);
    /// Last lane on the wire (most-significant byte).
    pub const LAST: Self = Self(3);

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The following lane, or `None` after the last one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 < Self::LAST.0 {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }

    const fn shift(self) -> u32 {
        self.0 as u32 * 8
    }

    /// The byte occupying this lane of `word`.
    #[must_use]
    pub const fn extract(self, word: u32) -> u8 {
        (word >> self.shift()) as u8
    }

    /// `word` with this lane replaced by `byte`.
    #[must_use]
    pub const fn insert(self, word: u32, byte: u8) -> u32 {
        (word & !(0xFF << self.shift())) | ((byte as u32) << self.shift())
    }
}
