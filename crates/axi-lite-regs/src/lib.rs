//! Memory-mapped register target for the serial bridge.
//!
//! The host sees two 32-bit registers on an AXI-Lite style bus:
//!
//! | Offset | Name | Read                         | Write                        |
//! |--------|------|------------------------------|------------------------------|
//! | $0     | TX   | last value written           | word to transmit (4 bytes)   |
//! | $4     | RX   | last word received           | overwrites the held value    |
//!
//! Only address bit 2 selects the register. Bits 0-1 are ignored (any byte
//! address inside a register aliases it) and bits 31-3 must be zero, or the
//! access completes with `SLVERR` and changes nothing.
//!
//! Three pieces live here:
//! - [`TransactionEngine`]: one write and one read channel state machine,
//!   each with at most one transaction in flight.
//! - [`RegisterBank`]: the TX/RX slots and the `send-pending` flag.
//! - [`Initiator`]: a minimal host that issues one transaction at a time.

pub mod bank;
pub mod engine;
pub mod initiator;

pub use bank::{BankInputs, BankOutputs, RegisterBank};
pub use engine::{EngineInputs, EngineOutputs, ReadState, TransactionEngine, WriteState};
pub use initiator::{Completion, Initiator, InitiatorInputs, InitiatorOutputs, Request};

/// Byte offset of the TX register.
pub const TX_OFFSET: u32 = 0x0;
/// Byte offset of the RX register.
pub const RX_OFFSET: u32 = 0x4;

const SELECT_BIT: u32 = 1 << 2;
const RESERVED_SHIFT: u32 = 3;

/// Bus response code, encoded as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Resp {
    Okay = 0b00,
    SlvErr = 0b10,
}

impl Resp {
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_okay(self) -> bool {
        matches!(self, Self::Okay)
    }
}

/// One of the two register slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegSlot {
    Tx,
    Rx,
}

/// Decode a bus address to a register slot.
///
/// Returns `None` when any of bits 31-3 is set.
#[must_use]
pub const fn decode(addr: u32) -> Option<RegSlot> {
    if addr >> RESERVED_SHIFT != 0 {
        None
    } else if addr & SELECT_BIT != 0 {
        Some(RegSlot::Rx)
    } else {
        Some(RegSlot::Tx)
    }
}

/// Per-byte write enables. Bit `i` enables bits `8i..8i+7` of the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strobe(u8);

impl Strobe {
    /// All four byte lanes enabled.
    pub const ALL: Self = Self(0b1111);
    /// No lanes enabled.
    pub const NONE: Self = Self(0);

    /// Build from the low four bits of `bits`; higher bits are ignored.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Bit mask covering every enabled lane.
    #[must_use]
    pub const fn mask(self) -> u32 {
        let mut mask = 0u32;
        let mut lane = 0;
        while lane < 4 {
            if self.0 & (1 << lane) != 0 {
                mask |= 0xFF << (lane * 8);
            }
            lane += 1;
        }
        mask
    }

    /// Overwrite the enabled lanes of `old` with those of `new`.
    #[must_use]
    pub const fn merge(self, old: u32, new: u32) -> u32 {
        let mask = self.mask();
        (old & !mask) | (new & mask)
    }
}

/// Write-data channel beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBeat {
    pub data: u32,
    pub strb: Strobe,
}

/// Read-data channel beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBeat {
    pub data: u32,
    pub resp: Resp,
}

/// A decoded write presented by the engine to the register bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub slot: RegSlot,
    pub data: u32,
    pub strb: Strobe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_uses_bit_two_only() {
        assert_eq!(decode(0x0000_0000), Some(RegSlot::Tx));
        assert_eq!(decode(0x0000_0004), Some(RegSlot::Rx));
        assert_eq!(decode(0x0000_0003), Some(RegSlot::Tx));
        assert_eq!(decode(0x0000_0007), Some(RegSlot::Rx));
    }

    #[test]
    fn decode_rejects_high_bits() {
        assert_eq!(decode(0x0000_0008), None);
        assert_eq!(decode(0x0000_000C), None);
        assert_eq!(decode(0x8000_0000), None);
    }

    #[test]
    fn strobe_merges_enabled_lanes() {
        assert_eq!(
            Strobe::new(0b0001).merge(0x1234_5678, 0xFFFF_FFFF),
            0x1234_56FF
        );
        assert_eq!(
            Strobe::new(0b1010).merge(0x1234_5678, 0xAABB_CCDD),
            0xAA34_CC78
        );
        assert_eq!(Strobe::ALL.merge(0, 0xDEAD_BEEF), 0xDEAD_BEEF);
        assert_eq!(Strobe::NONE.merge(0x55, 0xFF), 0x55);
    }

    #[test]
    fn strobe_ignores_bits_above_lane_three() {
        assert_eq!(Strobe::new(0xF1).bits(), 0x1);
    }

    #[test]
    fn response_encoding() {
        assert_eq!(Resp::Okay.bits(), 0b00);
        assert_eq!(Resp::SlvErr.bits(), 0b10);
    }
}
