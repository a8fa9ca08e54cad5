//! Frame transmitter.
//!
//! `Idle` holds the line high and takes a byte whenever one is offered and
//! the caller allows it (the bridge gates this with send-enable). `Start`,
//! each `Data` bit and `Stop` each drive the line for `clks_per_bit`
//! cycles; `active` is high across all three. `Cleanup` is one idle cycle
//! during which `done` pulses.

use log::trace;
use sim_core::{Clocked, Observable, Value};

use crate::BitIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Start,
    Data(BitIndex),
    Stop,
    Cleanup,
}

impl TxState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Start => "start",
            Self::Data(_) => "data",
            Self::Stop => "stop",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Signals sampled by the transmitter on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxInputs {
    /// Byte transferred in on this edge.
    pub byte: Option<u8>,
}

/// Signals driven by the transmitter during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutputs {
    /// Serial line level.
    pub line: bool,
    /// A frame is on the line.
    pub active: bool,
    /// One-cycle pulse after the stop bit.
    pub done: bool,
    /// Able to take a byte on this edge.
    pub ready: bool,
}

#[derive(Debug)]
pub struct UartTx {
    clks_per_bit: u32,
    state: TxState,
    clock_count: u32,
    shifter: u8,
}

impl UartTx {
    #[must_use]
    pub fn new(clks_per_bit: u32) -> Self {
        Self {
            clks_per_bit: clks_per_bit.max(1),
            state: TxState::Idle,
            clock_count: 0,
            shifter: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn clks_per_bit(&self) -> u32 {
        self.clks_per_bit
    }

    /// Count one cycle of the current symbol. Returns true on its last cycle.
    fn symbol_elapsed(&mut self) -> bool {
        if self.clock_count < self.clks_per_bit - 1 {
            self.clock_count += 1;
            false
        } else {
            self.clock_count = 0;
            true
        }
    }
}

impl Clocked for UartTx {
    type Inputs = TxInputs;
    type Outputs = TxOutputs;

    fn outputs(&self) -> TxOutputs {
        let line = match self.state {
            TxState::Start => false,
            TxState::Data(bit) => bit.of(self.shifter),
            TxState::Idle | TxState::Stop | TxState::Cleanup => true,
        };
        TxOutputs {
            line,
            active: !matches!(self.state, TxState::Idle | TxState::Cleanup),
            done: self.state == TxState::Cleanup,
            ready: self.state == TxState::Idle,
        }
    }

    fn tick(&mut self, inputs: &TxInputs) {
        let state = self.state;
        self.state = match state {
            TxState::Idle => match inputs.byte {
                Some(byte) => {
                    trace!("tx frame {byte:#04X}");
                    self.shifter = byte;
                    self.clock_count = 0;
                    TxState::Start
                }
                None => TxState::Idle,
            },
            TxState::Start if self.symbol_elapsed() => TxState::Data(BitIndex::FIRST),
            TxState::Data(bit) if self.symbol_elapsed() => match bit.next() {
                Some(next) => TxState::Data(next),
                None => TxState::Stop,
            },
            TxState::Stop if self.symbol_elapsed() => TxState::Cleanup,
            TxState::Cleanup => TxState::Idle,
            _ => state,
        };
    }

    fn reset(&mut self) {
        self.state = TxState::Idle;
        self.clock_count = 0;
        self.shifter = 0;
    }
}

impl Observable for UartTx {
    fn query(&self, path: &str) -> Option<Value> {
        let out = self.outputs();
        match path {
            "state" => Some(self.state.name().into()),
            "bit" => match self.state {
                TxState::Data(bit) => Some(bit.get().into()),
                _ => None,
            },
            "line" => Some(out.line.into()),
            "active" => Some(out.active.into()),
            "done" => Some(out.done.into()),
            "clock_count" => Some(u64::from(self.clock_count).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["state", "bit", "line", "active", "done", "clock_count"]
    }
}
