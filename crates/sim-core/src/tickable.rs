//! Traits for components advanced by clock edges.

use crate::Ticks;

/// A self-contained system that can be advanced by clock ticks.
///
/// Top-level machines own their inputs and implement this; individual
/// blocks inside them implement [`Clocked`] instead.
pub trait Tickable {
    /// Advance by one master clock edge.
    fn tick(&mut self);

    /// Advance by multiple ticks.
    ///
    /// Default implementation calls `tick()` in a loop. Implementors may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}

/// A block of synchronous logic with registered outputs.
///
/// `outputs()` is a pure function of the block's registers: it is what the
/// rest of the system sees during a cycle. `tick()` latches the next state
/// from inputs that were themselves derived from other blocks' `outputs()`
/// taken before any block ticked. Callers must snapshot every block first
/// and only then tick them; no block may see another's post-edge state
/// within the same cycle.
pub trait Clocked {
    /// Signals sampled on the clock edge.
    type Inputs;
    /// Signals driven during the cycle.
    type Outputs;

    /// Outputs driven by the current register state.
    fn outputs(&self) -> Self::Outputs;

    /// Latch the next state on a rising clock edge.
    fn tick(&mut self, inputs: &Self::Inputs);

    /// Asynchronous reset: force every register to its reset value.
    ///
    /// Takes effect immediately, independent of the clock.
    fn reset(&mut self);
}
