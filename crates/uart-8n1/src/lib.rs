//! 8N1 serial framing.
//!
//! One frame on the line:
//!
//! ```text
//! idle ‾‾‾‾|____|D0|D1|D2|D3|D4|D5|D6|D7|‾‾‾‾|‾‾‾ idle
//!          start  least-significant first stop
//! ```
//!
//! Every symbol lasts `clks_per_bit` clock cycles. The idle level is high.
//! There is no parity bit and a single stop bit, which the receiver does
//! not check.

mod rx;
mod sync;
mod tx;

pub use rx::{RxInputs, RxOutputs, RxState, UartRx};
pub use sync::{SYNC_STAGES, Synchronizer};
pub use tx::{TxInputs, TxOutputs, TxState, UartTx};

/// Data bits per frame.
pub const DATA_BITS: u8 = 8;

/// Shortest bit period the receiver can find a midpoint in.
pub const MIN_CLKS_PER_BIT: u32 = 2;

/// Data bit position within a frame. Always in `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitIndex(u8);

impl BitIndex {
    pub const FIRST: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The following bit, or `None` after bit 7.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 + 1 < DATA_BITS {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }

    /// This bit's level within `byte`.
    #[must_use]
    pub const fn of(self, byte: u8) -> bool {
        byte & (1 << self.0) != 0
    }

    /// `byte` with this bit set to `level`.
    #[must_use]
    pub const fn with(self, byte: u8, level: bool) -> u8 {
        if level {
            byte | (1 << self.0)
        } else {
            byte & !(1 << self.0)
        }
    }
}

/// Expand `byte` into the line levels of one frame, one entry per cycle.
#[must_use]
pub fn frame_levels(byte: u8, clks_per_bit: u32) -> Vec<bool> {
    let mut symbols = vec![false];
    let mut bit = Some(BitIndex::FIRST);
    while let Some(index) = bit {
        symbols.push(index.of(byte));
        bit = index.next();
    }
    symbols.push(true);

    symbols
        .into_iter()
        .flat_map(|level| std::iter::repeat_n(level, clks_per_bit as usize))
        .collect()
}
