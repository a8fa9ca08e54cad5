//! Bridge configuration.

use byte_fifo::MAX_DEPTH_LOG2;
use sim_core::MasterClock;
use uart_8n1::MIN_CLKS_PER_BIT;

/// Bridge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Master clock frequency in Hz. Defaults to 50 MHz.
    pub clock_hz: u64,
    /// Clock cycles per serial bit. Defaults to 434 (115200 baud at 50 MHz).
    pub clks_per_bit: u32,
    /// Each byte queue has `2^fifo_depth_log2` slots. Defaults to 4.
    pub fifo_depth_log2: u8,
    /// Feed the transmitter line straight back into the receiver instead
    /// of listening to the line peer.
    pub loopback: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            clock_hz: 50_000_000,
            clks_per_bit: 434,
            fifo_depth_log2: 4,
            loopback: false,
        }
    }
}

impl BridgeConfig {
    #[must_use]
    pub fn clock(&self) -> MasterClock {
        MasterClock::new(self.clock_hz)
    }

    /// Replace the bit period with the one closest to `baud` at the
    /// configured clock.
    ///
    /// # Errors
    ///
    /// Returns an error if `baud` is zero or too fast for the clock.
    pub fn with_baud(self, baud: u32) -> Result<Self, String> {
        let Some(clks_per_bit) = self.clock().clks_per_bit_for(baud) else {
            return Err(format!(
                "{baud} baud is not reachable with a {} Hz clock",
                self.clock_hz
            ));
        };
        Ok(Self {
            clks_per_bit,
            ..self
        })
    }

    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// Returns a description of the first field that is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.clock_hz == 0 {
            return Err("clock frequency must be non-zero".to_string());
        }
        if self.clks_per_bit < MIN_CLKS_PER_BIT {
            return Err(format!(
                "clks_per_bit {} is below the minimum of {MIN_CLKS_PER_BIT}",
                self.clks_per_bit
            ));
        }
        if !(1..=MAX_DEPTH_LOG2).contains(&self.fifo_depth_log2) {
            return Err(format!(
                "fifo_depth_log2 {} out of range 1..={MAX_DEPTH_LOG2}",
                self.fifo_depth_log2
            ));
        }
        Ok(())
    }
}
