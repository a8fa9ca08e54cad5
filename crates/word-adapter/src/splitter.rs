//! Word splitter: TX register word to four queued bytes.
//!
//! `Idle` takes the pending word from the register bank and latches it.
//! `Send` offers one byte per cycle to the outbound queue, lane 0 first,
//! moving on only when the queue takes it; a queue that never drains parks
//! the splitter here forever. `Cleanup` lasts one cycle and tells the bank
//! the word is done, which drops `send-pending` on the same edge the
//! splitter returns to `Idle`.

use log::debug;
use sim_core::{Clocked, Observable, Value};

use crate::ByteLane;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterState {
    Idle,
    Send(ByteLane),
    Cleanup,
}

impl SplitterState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Send(_) => "send",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Signals sampled by the splitter on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitterInputs {
    /// Word transferred from the register bank on this edge.
    pub word: Option<u32>,
    /// The outbound queue took the offered byte on this edge.
    pub byte_taken: bool,
}

/// Signals driven by the splitter during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterOutputs {
    /// Ready to take a word from the register bank.
    pub word_ready: bool,
    /// Byte offered to the outbound queue.
    pub byte: Option<u8>,
    /// Finished with the latched word.
    pub ack: bool,
}

#[derive(Debug)]
pub struct WordSplitter {
    state: SplitterState,
    word: u32,
}

impl WordSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SplitterState::Idle,
            word: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SplitterState {
        self.state
    }
}

impl Default for WordSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocked for WordSplitter {
    type Inputs = SplitterInputs;
    type Outputs = SplitterOutputs;

    fn outputs(&self) -> SplitterOutputs {
        SplitterOutputs {
            word_ready: self.state == SplitterState::Idle,
            byte: match self.state {
                SplitterState::Send(lane) => Some(lane.extract(self.word)),
                _ => None,
            },
            ack: self.state == SplitterState::Cleanup,
        }
    }

    fn tick(&mut self, inputs: &SplitterInputs) {
        self.state = match self.state {
            SplitterState::Idle => match inputs.word {
                Some(word) => {
                    debug!("splitting word {word:#010X}");
                    self.word = word;
                    SplitterState::Send(ByteLane::FIRST)
                }
                None => SplitterState::Idle,
            },
            SplitterState::Send(lane) if inputs.byte_taken => match lane.next() {
                Some(next) => SplitterState::Send(next),
                None => SplitterState::Cleanup,
            },
            SplitterState::Send(lane) => SplitterState::Send(lane),
            SplitterState::Cleanup => SplitterState::Idle,
        };
    }

    fn reset(&mut self) {
        self.state = SplitterState::Idle;
        self.word = 0;
    }
}

impl Observable for WordSplitter {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "state" => Some(self.state.name().into()),
            "index" => match self.state {
                SplitterState::Send(lane) => Some(lane.index().into()),
                _ => Some(0u8.into()),
            },
            "word" => Some(self.word.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["state", "index", "word"]
    }
}
