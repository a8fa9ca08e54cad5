//! Word assembler: four queued bytes to one RX register word.
//!
//! `Collect` takes bytes from the inbound queue as they appear, filling
//! lanes 0 to 3. A half-built word waits indefinitely for the rest.
//! `Send` offers the finished word to the register bank; the transfer is a
//! single-cycle pulse, after which collection starts over.

use log::debug;
use sim_core::{Clocked, Observable, Value};

use crate::ByteLane;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Collect(ByteLane),
    Send,
}

impl AssemblerState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Collect(_) => "collect",
            Self::Send => "send",
        }
    }
}

/// Signals sampled by the assembler on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerInputs {
    /// Byte transferred from the inbound queue on this edge.
    pub byte: Option<u8>,
    /// The register bank took the offered word on this edge.
    pub word_taken: bool,
}

/// Signals driven by the assembler during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerOutputs {
    /// Ready to take a byte from the inbound queue.
    pub byte_ready: bool,
    /// Finished word offered to the register bank.
    pub word: Option<u32>,
}

#[derive(Debug)]
pub struct WordAssembler {
    state: AssemblerState,
    word: u32,
}

impl WordAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AssemblerState::Collect(ByteLane::FIRST),
            word: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> AssemblerState {
        self.state
    }
}

impl Default for WordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocked for WordAssembler {
    type Inputs = AssemblerInputs;
    type Outputs = AssemblerOutputs;

    fn outputs(&self) -> AssemblerOutputs {
        AssemblerOutputs {
            byte_ready: matches!(self.state, AssemblerState::Collect(_)),
            word: (self.state == AssemblerState::Send).then_some(self.word),
        }
    }

    fn tick(&mut self, inputs: &AssemblerInputs) {
        self.state = match self.state {
            AssemblerState::Collect(lane) => match inputs.byte {
                Some(byte) => {
                    self.word = lane.insert(self.word, byte);
                    if let Some(next) = lane.next() {
                        AssemblerState::Collect(next)
                    } else {
                        debug!("assembled word {:#010X}", self.word);
                        AssemblerState::Send
                    }
                }
                None => AssemblerState::Collect(lane),
            },
            AssemblerState::Send if inputs.word_taken => AssemblerState::Collect(ByteLane::FIRST),
            AssemblerState::Send => AssemblerState::Send,
        };
    }

    fn reset(&mut self) {
        self.state = AssemblerState::Collect(ByteLane::FIRST);
        self.word = 0;
    }
}

impl Observable for WordAssembler {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "state" => Some(self.state.name().into()),
            "index" => match self.state {
                AssemblerState::Collect(lane) => Some(lane.index().into()),
                AssemblerState::Send => Some(ByteLane::LAST.index().into()),
            },
            "word" => Some(self.word.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["state", "index", "word"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(asm: &mut WordAssembler, byte: u8) {
        asm.tick(&AssemblerInputs {
            byte: Some(byte),
            word_taken: false,
        });
    }

    #[test]
    fn builds_word_low_byte_first() {
        let mut asm = WordAssembler::new();
        for byte in [0x78, 0x56, 0x34, 0x12] {
            assert!(asm.outputs().byte_ready);
            feed(&mut asm, byte);
        }
        assert_eq!(asm.outputs().word, Some(0x1234_5678));
        assert!(!asm.outputs().byte_ready);
    }

    #[test]
    fn word_is_a_single_cycle_pulse_once_taken() {
        let mut asm = WordAssembler::new();
        for byte in [1, 2, 3, 4] {
            feed(&mut asm, byte);
        }
        asm.tick(&AssemblerInputs {
            byte: None,
            word_taken: true,
        });
        assert_eq!(asm.outputs().word, None);
        assert_eq!(asm.state(), AssemblerState::Collect(ByteLane::FIRST));
    }

    #[test]
    fn holds_word_until_bank_ready() {
        let mut asm = WordAssembler::new();
        for byte in [1, 2, 3, 4] {
            feed(&mut asm, byte);
        }
        for _ in 0..5 {
            asm.tick(&AssemblerInputs::default());
        }
        assert_eq!(asm.outputs().word, Some(0x0403_0201));
    }

    #[test]
    fn partial_word_waits() {
        let mut asm = WordAssembler::new();
        feed(&mut asm, 0xAA);
        feed(&mut asm, 0xBB);
        for _ in 0..100 {
            asm.tick(&AssemblerInputs::default());
        }
        assert_eq!(asm.query("index"), Some(Value::U8(2)));
        assert_eq!(asm.query("state"), Some(Value::from("collect")));
        feed(&mut asm, 0xCC);
        feed(&mut asm, 0xDD);
        assert_eq!(asm.outputs().word, Some(0xDDCC_BBAA));
    }
}
