//! Master clock configuration.

use crate::Ticks;

/// Master clock driving every block.
///
/// Serial bit timing is expressed in whole clock cycles per bit, so the
/// achievable baud rate is `frequency_hz / clks_per_bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g., `50_000_000` for a 50 MHz board oscillator).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Clock cycles per serial bit for `baud`, rounded to nearest.
    ///
    /// Returns `None` when the bit period would be shorter than two cycles
    /// (the receiver cannot find a midpoint) or does not fit in `u32`.
    #[must_use]
    pub fn clks_per_bit_for(&self, baud: u32) -> Option<u32> {
        if baud == 0 {
            return None;
        }
        let baud = u64::from(baud);
        let clks = (self.frequency_hz + baud / 2) / baud;
        u32::try_from(clks).ok().filter(|&c| c >= 2)
    }

    /// Baud rate produced by a given bit period (integer division).
    #[must_use]
    pub const fn baud_for(&self, clks_per_bit: u32) -> u64 {
        if clks_per_bit == 0 {
            return 0;
        }
        self.frequency_hz / clks_per_bit as u64
    }

    /// Clock period in picoseconds, used as the waveform timescale.
    #[must_use]
    pub const fn period_ps(&self) -> u64 {
        if self.frequency_hz == 0 {
            return 0;
        }
        1_000_000_000_000 / self.frequency_hz
    }

    /// Ticks needed to shift one complete 8N1 frame (10 bit periods).
    #[must_use]
    pub const fn ticks_per_frame(clks_per_bit: u32) -> Ticks {
        Ticks::new(clks_per_bit as u64 * 10)
    }
}
