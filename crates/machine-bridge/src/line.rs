//! The far end of the serial line.
//!
//! A second transmitter/receiver pair running at the same bit period as
//! the bridge. Its host side is a pair of unbounded byte queues and its
//! send-enable is always asserted.

use std::collections::VecDeque;

use sim_core::{Clocked, Link, Observable, Value};
use uart_8n1::{RxInputs, TxInputs, UartRx, UartTx};

/// Serial device attached to the bridge's line.
#[derive(Debug)]
pub struct LinePeer {
    tx: UartTx,
    rx: UartRx,
    outbox: VecDeque<u8>,
    inbox: Vec<u8>,
    /// Overrides the transmitter's line level while `Some`.
    forced: Option<bool>,
}

impl LinePeer {
    #[must_use]
    pub fn new(clks_per_bit: u32) -> Self {
        Self {
            tx: UartTx::new(clks_per_bit),
            rx: UartRx::new(clks_per_bit),
            outbox: VecDeque::new(),
            inbox: Vec::new(),
            forced: None,
        }
    }

    /// Queue bytes for transmission to the bridge.
    pub fn send(&mut self, bytes: &[u8]) {
        self.outbox.extend(bytes);
    }

    /// Bytes still waiting to be framed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Nothing queued and the transmitter is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.outbox.is_empty() && self.tx.outputs().ready
    }

    /// Drain the bytes decoded from the bridge's transmitter.
    pub fn take_received(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.inbox)
    }

    /// Drive the line to a fixed level, or hand it back to the
    /// transmitter with `None`.
    pub fn force_line(&mut self, level: Option<bool>) {
        self.forced = level;
    }

    /// Level this peer drives onto the bridge's receive line.
    #[must_use]
    pub fn line(&self) -> bool {
        self.forced.unwrap_or(self.tx.outputs().line)
    }
}

impl Clocked for LinePeer {
    /// Level of the bridge's transmit line.
    type Inputs = bool;
    /// Level driven onto the bridge's receive line.
    type Outputs = bool;

    fn outputs(&self) -> bool {
        self.line()
    }

    fn tick(&mut self, bridge_line: &bool) {
        let tx = self.tx.outputs();
        let rx = self.rx.outputs();

        let byte = Link::new(self.outbox.front().copied(), tx.ready).fired();
        if byte.is_some() {
            self.outbox.pop_front();
        }
        self.inbox.extend(rx.byte);

        self.tx.tick(&TxInputs { byte });
        self.rx.tick(&RxInputs {
            line: *bridge_line,
            byte_taken: rx.byte.is_some(),
        });
    }

    fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
        self.outbox.clear();
        self.inbox.clear();
        self.forced = None;
    }
}

impl Observable for LinePeer {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("tx.") {
            self.tx.query(rest)
        } else if let Some(rest) = path.strip_prefix("rx.") {
            self.rx.query(rest)
        } else {
            match path {
                "line" => Some(self.line().into()),
                "pending" => Some(self.outbox.len().into()),
                "received" => Some(self.inbox.len().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "tx.<uart_tx_paths>",
            "rx.<uart_rx_paths>",
            "line",
            "pending",
            "received",
        ]
    }
}
