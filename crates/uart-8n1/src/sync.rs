//! Two-flop synchronizer for the asynchronous serial input.
//!
//! The line is re-sampled through a chain of registers before anything
//! looks at it, so a level change reaches the consumer two edges late.

/// Register stages between the pin and the receiver state machine.
pub const SYNC_STAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synchronizer {
    stages: [bool; SYNC_STAGES],
}

impl Synchronizer {
    /// Reset state: every stage at the idle line level (high).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stages: [true; SYNC_STAGES],
        }
    }

    /// Level presented to the consumer this cycle.
    #[must_use]
    pub const fn output(&self) -> bool {
        self.stages[SYNC_STAGES - 1]
    }

    /// Shift the raw line level in on a clock edge.
    pub fn tick(&mut self, line: bool) {
        self.stages.rotate_right(1);
        self.stages[0] = line;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}
