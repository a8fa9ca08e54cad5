//! Top-level bridge.
//!
//! One call to [`Tickable::tick`] is one rising clock edge:
//! 1. every block's outputs are snapshotted;
//! 2. each ready/valid link fires if its producer is valid and its
//!    consumer ready in that snapshot;
//! 3. every block latches its next state from the snapshot and the fires.
//!
//! No block sees another block's post-edge state within the same edge, so
//! the order blocks tick in does not matter.
//!
//! Reset is asynchronous: asserting it forces every block to its reset
//! state immediately and holds them there on each edge until released.

use std::collections::VecDeque;

use axi_lite_regs::{
    BankInputs, Completion, EngineInputs, Initiator, InitiatorInputs, ReadBeat, RegisterBank,
    Request, Resp, Strobe, TX_OFFSET, TransactionEngine,
};
use byte_fifo::{ByteFifo, FifoInputs};
use log::{debug, warn};
use sim_core::{Clocked, Link, MasterClock, Observable, Tickable, Value};
use uart_8n1::{RxInputs, TxInputs, UartRx, UartTx};
use word_adapter::{AssemblerInputs, SplitterInputs, WordAssembler, WordSplitter};

use crate::config::BridgeConfig;
use crate::line::LinePeer;

/// Edges a blocking bus helper waits for a response before giving up.
pub const BUS_TICK_LIMIT: u64 = 64;

/// Line-level signals captured once per edge for waveform dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tx_line: bool,
    pub tx_active: bool,
    pub rx_line: bool,
    pub cts: bool,
    pub send_pending: bool,
    pub tx_fifo_count: usize,
    pub rx_fifo_count: usize,
}

/// Register bus to serial bridge with its host and line peer attached.
pub struct Bridge {
    config: BridgeConfig,
    host: Initiator,
    engine: TransactionEngine,
    bank: RegisterBank,
    splitter: WordSplitter,
    tx_fifo: ByteFifo,
    uart_tx: UartTx,
    uart_rx: UartRx,
    rx_fifo: ByteFifo,
    assembler: WordAssembler,
    peer: LinePeer,
    /// External gate on the transmitter draining its queue.
    send_enable: bool,
    /// Reset input level.
    reset_asserted: bool,
    /// Master clock: counts edges, including those spent in reset.
    master_clock: u64,
    /// Words delivered into the RX register, oldest first.
    rx_words: VecDeque<u32>,
}

impl Bridge {
    /// Create a bridge in its reset state with send-enable asserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &BridgeConfig) -> Result<Self, String> {
        config.validate()?;
        debug!(
            "bridge: {} Hz clock, {} clks/bit, {} byte queues, loopback {}",
            config.clock_hz,
            config.clks_per_bit,
            (1usize << config.fifo_depth_log2) - 1,
            config.loopback
        );
        Ok(Self {
            config: *config,
            host: Initiator::new(),
            engine: TransactionEngine::new(),
            bank: RegisterBank::new(),
            splitter: WordSplitter::new(),
            tx_fifo: ByteFifo::new(config.fifo_depth_log2),
            uart_tx: UartTx::new(config.clks_per_bit),
            uart_rx: UartRx::new(config.clks_per_bit),
            rx_fifo: ByteFifo::new(config.fifo_depth_log2),
            assembler: WordAssembler::new(),
            peer: LinePeer::new(config.clks_per_bit),
            send_enable: true,
            reset_asserted: false,
            master_clock: 0,
            rx_words: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> MasterClock {
        self.config.clock()
    }

    /// Master clock tick count.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// Drive the reset input. Asserting it resets every block at once.
    pub fn set_reset(&mut self, asserted: bool) {
        if asserted && !self.reset_asserted {
            debug!("reset asserted at tick {}", self.master_clock);
            self.reset_blocks();
        }
        self.reset_asserted = asserted;
    }

    #[must_use]
    pub fn in_reset(&self) -> bool {
        self.reset_asserted
    }

    /// Pulse reset: every block returns to its initial state.
    pub fn reset(&mut self) {
        self.set_reset(true);
        self.set_reset(false);
    }

    fn reset_blocks(&mut self) {
        self.host.reset();
        self.engine.reset();
        self.bank.reset();
        self.splitter.reset();
        self.tx_fifo.reset();
        self.uart_tx.reset();
        self.uart_rx.reset();
        self.rx_fifo.reset();
        self.assembler.reset();
    }

    pub fn set_send_enable(&mut self, enabled: bool) {
        self.send_enable = enabled;
    }

    #[must_use]
    pub fn send_enable(&self) -> bool {
        self.send_enable
    }

    /// Start a bus transaction on the host side. Returns `false` if one is
    /// already in flight.
    pub fn issue(&mut self, request: Request) -> bool {
        self.host.issue(request)
    }

    #[must_use]
    pub fn host_busy(&self) -> bool {
        self.host.is_busy()
    }

    /// Collect the result of the host's last finished transaction.
    pub fn take_completion(&mut self) -> Option<Completion> {
        self.host.take_completion()
    }

    /// Write one register, ticking until the response arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already in flight or no response
    /// arrives within [`BUS_TICK_LIMIT`] edges.
    pub fn bus_write(&mut self, addr: u32, data: u32, strb: Strobe) -> Result<Resp, String> {
        match self.run_transaction(Request::Write { addr, data, strb })? {
            Completion::Write(resp) => Ok(resp),
            Completion::Read(_) => Err("read completion for a write request".to_string()),
        }
    }

    /// Read one register, ticking until the response arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already in flight or no response
    /// arrives within [`BUS_TICK_LIMIT`] edges.
    pub fn bus_read(&mut self, addr: u32) -> Result<ReadBeat, String> {
        match self.run_transaction(Request::Read { addr })? {
            Completion::Read(beat) => Ok(beat),
            Completion::Write(_) => Err("write completion for a read request".to_string()),
        }
    }

    fn run_transaction(&mut self, request: Request) -> Result<Completion, String> {
        if !self.host.issue(request) {
            return Err("a bus transaction is already in flight".to_string());
        }
        for _ in 0..BUS_TICK_LIMIT {
            self.tick();
            if let Some(completion) = self.host.take_completion() {
                return Ok(completion);
            }
        }
        self.host.reset();
        Err(format!("no bus response within {BUS_TICK_LIMIT} ticks"))
    }

    /// Write `word` to TX once the previous word has left the register,
    /// retrying refused writes. Gives up after `tick_limit` edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the word was not accepted in time.
    pub fn send_word(&mut self, word: u32, tick_limit: u64) -> Result<(), String> {
        let start = self.master_clock;
        while self.master_clock - start < tick_limit {
            if self.bank.send_pending() {
                self.tick();
                continue;
            }
            if self.bus_write(TX_OFFSET, word, Strobe::ALL)?.is_okay() {
                return Ok(());
            }
        }
        Err(format!("TX word {word:#010X} not accepted within {tick_limit} ticks"))
    }

    /// Tick until `count` words have reached the RX register, or
    /// `tick_limit` edges pass. Returns every word collected so far.
    pub fn receive_words(&mut self, count: usize, tick_limit: u64) -> Vec<u32> {
        let start = self.master_clock;
        while self.rx_words.len() < count && self.master_clock - start < tick_limit {
            self.tick();
        }
        self.take_rx_words()
    }

    /// Drain the log of words delivered into the RX register.
    pub fn take_rx_words(&mut self) -> Vec<u32> {
        self.rx_words.drain(..).collect()
    }

    /// Level on the receiver's line input.
    #[must_use]
    pub fn rx_line(&self) -> bool {
        if self.config.loopback {
            self.uart_tx.outputs().line
        } else {
            self.peer.line()
        }
    }

    /// Current line-level signals.
    #[must_use]
    pub fn sample(&self) -> Sample {
        let tx = self.uart_tx.outputs();
        Sample {
            tx_line: tx.line,
            tx_active: tx.active,
            rx_line: self.rx_line(),
            cts: self.uart_rx.outputs().cts,
            send_pending: self.bank.send_pending(),
            tx_fifo_count: self.tx_fifo.count(),
            rx_fifo_count: self.rx_fifo.count(),
        }
    }

    #[must_use]
    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    #[must_use]
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }

    #[must_use]
    pub fn splitter(&self) -> &WordSplitter {
        &self.splitter
    }

    #[must_use]
    pub fn assembler(&self) -> &WordAssembler {
        &self.assembler
    }

    #[must_use]
    pub fn tx_fifo(&self) -> &ByteFifo {
        &self.tx_fifo
    }

    #[must_use]
    pub fn rx_fifo(&self) -> &ByteFifo {
        &self.rx_fifo
    }

    #[must_use]
    pub fn uart_tx(&self) -> &UartTx {
        &self.uart_tx
    }

    #[must_use]
    pub fn uart_rx(&self) -> &UartRx {
        &self.uart_rx
    }

    /// Mutable reference to the host, e.g. to delay write data.
    pub fn host_mut(&mut self) -> &mut Initiator {
        &mut self.host
    }

    #[must_use]
    pub fn peer(&self) -> &LinePeer {
        &self.peer
    }

    pub fn peer_mut(&mut self) -> &mut LinePeer {
        &mut self.peer
    }
}

impl Tickable for Bridge {
    fn tick(&mut self) {
        self.master_clock += 1;

        if self.reset_asserted {
            self.reset_blocks();
            self.peer.tick(&true);
            return;
        }

        let host = self.host.outputs();
        let engine = self.engine.outputs();
        let bank = self.bank.outputs();
        let splitter = self.splitter.outputs();
        let tx_fifo = self.tx_fifo.outputs();
        let uart_tx = self.uart_tx.outputs();
        let uart_rx = self.uart_rx.outputs();
        let rx_fifo = self.rx_fifo.outputs();
        let assembler = self.assembler.outputs();
        let peer_line = self.peer.outputs();

        let aw = Link::new(host.aw, engine.aw_ready).fired();
        let w = Link::new(host.w, engine.w_ready).fired();
        let b = Link::new(engine.b, host.b_ready).fired();
        let ar = Link::new(host.ar, engine.ar_ready).fired();
        let r = Link::new(engine.r, host.r_ready).fired();
        let bank_ready = engine.reg_write.is_some_and(|w| bank.accepts(w.slot));
        let reg_write = Link::new(engine.reg_write, bank_ready).fired();
        if let Some(refused) = engine.reg_write.filter(|_| !bank_ready) {
            warn!(
                "TX write {:#010X} refused: previous word still pending",
                refused.data
            );
        }
        let tx_word = Link::new(bank.tx_offer(), splitter.word_ready).fired();
        let split_byte = Link::new(splitter.byte, tx_fifo.write_ready()).fired();
        let tx_byte = Link::new(tx_fifo.head, uart_tx.ready && self.send_enable).fired();
        let rx_byte = Link::new(uart_rx.byte, rx_fifo.write_ready()).fired();
        let rx_pop = Link::new(rx_fifo.head, assembler.byte_ready).fired();
        let rx_word = Link::new(assembler.word, bank.rx_ready).fired();
        let rx_line = if self.config.loopback {
            uart_tx.line
        } else {
            peer_line
        };

        self.host.tick(&InitiatorInputs {
            aw_fired: aw.is_some(),
            w_fired: w.is_some(),
            b,
            ar_fired: ar.is_some(),
            r,
        });
        self.engine.tick(&EngineInputs {
            aw,
            w,
            b_taken: b.is_some(),
            ar,
            r_taken: r.is_some(),
            write_accepted: reg_write.is_some(),
            bank,
        });
        self.bank.tick(&BankInputs {
            host_write: reg_write,
            splitter_ack: splitter.ack,
            rx_word,
        });
        self.splitter.tick(&SplitterInputs {
            word: tx_word,
            byte_taken: split_byte.is_some(),
        });
        self.tx_fifo.tick(&FifoInputs {
            write: split_byte,
            read: tx_byte.is_some(),
        });
        self.uart_tx.tick(&TxInputs { byte: tx_byte });
        self.uart_rx.tick(&RxInputs {
            line: rx_line,
            byte_taken: rx_byte.is_some(),
        });
        self.rx_fifo.tick(&FifoInputs {
            write: rx_byte,
            read: rx_pop.is_some(),
        });
        self.assembler.tick(&AssemblerInputs {
            byte: rx_pop,
            word_taken: rx_word.is_some(),
        });
        self.peer.tick(&uart_tx.line);

        self.rx_words.extend(rx_word);
    }
}

impl Observable for Bridge {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("bank.") {
            self.bank.query(rest)
        } else if let Some(rest) = path.strip_prefix("engine.") {
            self.engine.query(rest)
        } else if let Some(rest) = path.strip_prefix("host.") {
            self.host.query(rest)
        } else if let Some(rest) = path.strip_prefix("splitter.") {
            self.splitter.query(rest)
        } else if let Some(rest) = path.strip_prefix("assembler.") {
            self.assembler.query(rest)
        } else if let Some(rest) = path.strip_prefix("tx_fifo.") {
            self.tx_fifo.query(rest)
        } else if let Some(rest) = path.strip_prefix("rx_fifo.") {
            self.rx_fifo.query(rest)
        } else if let Some(rest) = path.strip_prefix("uart_tx.") {
            self.uart_tx.query(rest)
        } else if let Some(rest) = path.strip_prefix("uart_rx.") {
            self.uart_rx.query(rest)
        } else if let Some(rest) = path.strip_prefix("peer.") {
            self.peer.query(rest)
        } else {
            match path {
                "master_clock" => Some(self.master_clock.into()),
                "send_enable" => Some(self.send_enable.into()),
                "reset" => Some(self.reset_asserted.into()),
                "rx_line" => Some(self.rx_line().into()),
                "loopback" => Some(self.config.loopback.into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "bank.tx",
            "bank.rx",
            "bank.send_pending",
            "engine.write_state",
            "engine.read_state",
            "host.busy",
            "host.state",
            "splitter.state",
            "splitter.index",
            "assembler.state",
            "assembler.index",
            "tx_fifo.<fifo_paths>",
            "rx_fifo.<fifo_paths>",
            "uart_tx.state",
            "uart_tx.line",
            "uart_tx.active",
            "uart_rx.state",
            "uart_rx.cts",
            "peer.<peer_paths>",
            "master_clock",
            "send_enable",
            "reset",
            "rx_line",
            "loopback",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axi_lite_regs::RX_OFFSET;

    fn make_bridge(loopback: bool) -> Bridge {
        let config = BridgeConfig {
            clks_per_bit: 4,
            fifo_depth_log2: 3,
            loopback,
            ..BridgeConfig::default()
        };
        Bridge::new(&config).expect("valid config")
    }

    #[test]
    fn rejects_invalid_config() {
        let config = BridgeConfig {
            clks_per_bit: 0,
            ..BridgeConfig::default()
        };
        assert!(Bridge::new(&config).is_err());
    }

    #[test]
    fn master_clock_advances() {
        let mut bridge = make_bridge(false);
        assert_eq!(bridge.master_clock(), 0);
        bridge.tick();
        assert_eq!(bridge.master_clock(), 1);
    }

    #[test]
    fn idle_bridge_holds_line_high() {
        let mut bridge = make_bridge(false);
        for _ in 0..100 {
            bridge.tick();
            assert!(bridge.sample().tx_line);
        }
        assert_eq!(bridge.query("uart_tx.state"), Some(Value::from("idle")));
    }

    #[test]
    fn rx_register_reads_back() {
        let mut bridge = make_bridge(false);
        assert_eq!(
            bridge.bus_write(RX_OFFSET, 0x1234_5678, Strobe::ALL),
            Ok(Resp::Okay)
        );
        let beat = bridge.bus_read(RX_OFFSET).expect("read completes");
        assert_eq!(
            beat,
            ReadBeat {
                data: 0x1234_5678,
                resp: Resp::Okay,
            }
        );
        assert_eq!(bridge.query("bank.rx"), Some(Value::U32(0x1234_5678)));
    }

    #[test]
    fn tx_write_raises_send_pending_until_split() {
        let mut bridge = make_bridge(false);
        bridge.set_send_enable(false);
        assert_eq!(
            bridge.bus_write(TX_OFFSET, 0xA1B2_C3D4, Strobe::ALL),
            Ok(Resp::Okay)
        );
        for _ in 0..8 {
            bridge.tick();
        }
        assert!(!bridge.bank().send_pending());
        assert_eq!(bridge.tx_fifo().contents(), vec![0xD4, 0xC3, 0xB2, 0xA1]);
    }

    #[test]
    fn loopback_round_trip() {
        let mut bridge = make_bridge(true);
        bridge.send_word(0xCAFE_F00D, 1000).expect("word accepted");
        let words = bridge.receive_words(1, 1000);
        assert_eq!(words, vec![0xCAFE_F00D]);
        assert_eq!(bridge.bus_read(RX_OFFSET).map(|b| b.data), Ok(0xCAFE_F00D));
    }

    #[test]
    fn observable_routes_prefixes() {
        let bridge = make_bridge(false);
        assert_eq!(bridge.query("bank.send_pending"), Some(Value::Bool(false)));
        assert_eq!(bridge.query("tx_fifo.empty"), Some(Value::Bool(true)));
        assert_eq!(bridge.query("uart_rx.cts"), Some(Value::Bool(true)));
        assert_eq!(
            bridge.query("engine.write_state"),
            Some(Value::from("idle"))
        );
        assert_eq!(bridge.query("master_clock"), Some(Value::U64(0)));
        assert_eq!(bridge.query("nonsense"), None);
    }

    #[test]
    fn reset_held_keeps_blocks_idle() {
        let mut bridge = make_bridge(true);
        bridge.set_send_enable(false);
        assert_eq!(
            bridge.bus_write(TX_OFFSET, 0xFFFF_FFFF, Strobe::ALL),
            Ok(Resp::Okay)
        );
        bridge.tick();
        bridge.set_reset(true);
        assert!(!bridge.bank().send_pending());
        assert_eq!(bridge.bank().tx(), 0);
        assert!(bridge.bus_write(TX_OFFSET, 1, Strobe::ALL).is_err());
        bridge.set_reset(false);
        assert!(!bridge.host_busy());
        assert_eq!(bridge.bus_write(TX_OFFSET, 1, Strobe::ALL), Ok(Resp::Okay));
    }
}
