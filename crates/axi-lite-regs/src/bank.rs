//! Two-entry register bank.
//!
//! TX has one writer (the bus engine) and one reader (the word splitter).
//! A completed bus write to TX raises `send-pending`, which offers the word
//! to the splitter. The flag drops when the splitter signals that it has
//! finished with the word. While the flag is up, further TX writes are
//! refused so that a word can never be overwritten before it is sent.
//!
//! RX is written whenever the word assembler delivers a word and can be
//! read by the bus at any time without waiting. A host write to RX is
//! applied too; if the assembler delivers on the same edge, its word wins.

use sim_core::{Clocked, Observable, Value};

use crate::{RegSlot, RegWrite};

/// Signals sampled by the bank on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankInputs {
    /// Legal write from the bus engine that the bank said it accepts.
    pub host_write: Option<RegWrite>,
    /// Splitter is done with the pending word.
    pub splitter_ack: bool,
    /// Word delivered by the assembler.
    pub rx_word: Option<u32>,
}

/// Signals driven by the bank during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankOutputs {
    pub tx: u32,
    pub rx: u32,
    pub send_pending: bool,
    /// The RX slot takes a new word on any edge.
    pub rx_ready: bool,
}

impl BankOutputs {
    /// TX word offered to the splitter; valid while `send-pending`.
    #[must_use]
    pub const fn tx_offer(&self) -> Option<u32> {
        if self.send_pending {
            Some(self.tx)
        } else {
            None
        }
    }

    /// Whether a host write to `slot` would be applied on this edge.
    #[must_use]
    pub const fn accepts(&self, slot: RegSlot) -> bool {
        match slot {
            RegSlot::Tx => !self.send_pending,
            RegSlot::Rx => true,
        }
    }

    /// Current value of `slot` as seen by a bus read.
    #[must_use]
    pub const fn value(&self, slot: RegSlot) -> u32 {
        match slot {
            RegSlot::Tx => self.tx,
            RegSlot::Rx => self.rx,
        }
    }
}

/// TX/RX register pair.
#[derive(Debug, Default)]
pub struct RegisterBank {
    tx: u32,
    rx: u32,
    send_pending: bool,
}

impl RegisterBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tx(&self) -> u32 {
        self.tx
    }

    #[must_use]
    pub fn rx(&self) -> u32 {
        self.rx
    }

    #[must_use]
    pub fn send_pending(&self) -> bool {
        self.send_pending
    }
}

impl Clocked for RegisterBank {
    type Inputs = BankInputs;
    type Outputs = BankOutputs;

    fn outputs(&self) -> BankOutputs {
        BankOutputs {
            tx: self.tx,
            rx: self.rx,
            send_pending: self.send_pending,
            rx_ready: true,
        }
    }

    fn tick(&mut self, inputs: &BankInputs) {
        let tx_accepting = !self.send_pending;

        if inputs.splitter_ack {
            self.send_pending = false;
        }

        if let Some(write) = inputs.host_write {
            match write.slot {
                RegSlot::Tx if tx_accepting => {
                    self.tx = write.strb.merge(self.tx, write.data);
                    self.send_pending = true;
                }
                RegSlot::Tx => {}
                RegSlot::Rx => self.rx = write.strb.merge(self.rx, write.data),
            }
        }

        if let Some(word) = inputs.rx_word {
            self.rx = word;
        }
    }

    fn reset(&mut self) {
        self.tx = 0;
        self.rx = 0;
        self.send_pending = false;
    }
}

impl Observable for RegisterBank {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "tx" => Some(self.tx.into()),
            "rx" => Some(self.rx.into()),
            "send_pending" => Some(self.send_pending.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["tx", "rx", "send_pending"]
    }
}
