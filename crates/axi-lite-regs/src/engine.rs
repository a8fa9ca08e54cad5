//! Bus transaction engine.
//!
//! Two independent channel state machines:
//!
//! ```text
//! write: Idle -> WaitAddr -> WaitData -> Exec -> Resp -> WaitAddr ...
//!                   \________________________/
//!                    (address and data together)
//! read:  Idle -> WaitAddr -> Exec -> WaitAddr ...
//! ```
//!
//! `Idle` is only the cycle after reset. In `WaitAddr` both address and
//! data ready are raised, so the host may present them together or address
//! first; a data beat that arrives alone is held until its address comes.
//! `Exec` presents the decoded write to the register bank for one cycle,
//! then `Resp` holds the response until the host takes it. A read is
//! answered on the cycle after its address is accepted and held until the
//! host takes it. Neither channel accepts a new request before the previous
//! response has been taken.

use log::debug;
use sim_core::{Clocked, Observable, Value};

use crate::bank::BankOutputs;
use crate::{ReadBeat, RegWrite, Resp, WriteBeat, decode};

/// Write channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    WaitAddr { held: Option<WriteBeat> },
    WaitData { addr: u32 },
    Exec { addr: u32, beat: WriteBeat },
    Resp(Resp),
}

impl WriteState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitAddr { .. } => "wait_addr",
            Self::WaitData { .. } => "wait_data",
            Self::Exec { .. } => "exec",
            Self::Resp(_) => "resp",
        }
    }
}

/// Read channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Idle,
    WaitAddr,
    Exec(ReadBeat),
}

impl ReadState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitAddr => "wait_addr",
            Self::Exec(_) => "exec",
        }
    }
}

/// Signals sampled by the engine on a clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInputs {
    /// Write address transferred on this edge.
    pub aw: Option<u32>,
    /// Write data transferred on this edge.
    pub w: Option<WriteBeat>,
    /// Host took the write response.
    pub b_taken: bool,
    /// Read address transferred on this edge.
    pub ar: Option<u32>,
    /// Host took the read response.
    pub r_taken: bool,
    /// Register bank accepted the write presented in `Exec`.
    pub write_accepted: bool,
    /// Register values visible to reads this cycle.
    pub bank: BankOutputs,
}

/// Signals driven by the engine during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOutputs {
    pub aw_ready: bool,
    pub w_ready: bool,
    /// Write response, valid while waiting for the host.
    pub b: Option<Resp>,
    pub ar_ready: bool,
    /// Read response, valid while waiting for the host.
    pub r: Option<ReadBeat>,
    /// Decoded write for the register bank; `None` for illegal addresses.
    pub reg_write: Option<RegWrite>,
}

/// Bus-side transaction engine.
#[derive(Debug)]
pub struct TransactionEngine {
    write: WriteState,
    read: ReadState,
}

impl TransactionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            write: WriteState::Idle,
            read: ReadState::Idle,
        }
    }

    #[must_use]
    pub fn write_state(&self) -> WriteState {
        self.write
    }

    #[must_use]
    pub fn read_state(&self) -> ReadState {
        self.read
    }

    fn next_write(&self, inputs: &EngineInputs) -> WriteState {
        match self.write {
            WriteState::Idle => WriteState::WaitAddr { held: None },
            WriteState::WaitAddr { held } => match (inputs.aw, held.or(inputs.w)) {
                (Some(addr), Some(beat)) => WriteState::Exec { addr, beat },
                (Some(addr), None) => WriteState::WaitData { addr },
                (None, held) => WriteState::WaitAddr { held },
            },
            WriteState::WaitData { addr } => match inputs.w {
                Some(beat) => WriteState::Exec { addr, beat },
                None => self.write,
            },
            WriteState::Exec { addr, beat } => {
                let resp = if decode(addr).is_some() && inputs.write_accepted {
                    Resp::Okay
                } else {
                    Resp::SlvErr
                };
                debug!(
                    "bus write {addr:#010X} <- {:#010X} strb {:04b}: {resp:?}",
                    beat.data,
                    beat.strb.bits()
                );
                WriteState::Resp(resp)
            }
            WriteState::Resp(_) if inputs.b_taken => WriteState::WaitAddr { held: None },
            WriteState::Resp(_) => self.write,
        }
    }

    fn next_read(&self, inputs: &EngineInputs) -> ReadState {
        match self.read {
            ReadState::Idle => ReadState::WaitAddr,
            ReadState::WaitAddr => match inputs.ar {
                Some(addr) => {
                    let beat = match decode(addr) {
                        Some(slot) => ReadBeat {
                            data: inputs.bank.value(slot),
                            resp: Resp::Okay,
                        },
                        None => ReadBeat {
                            data: 0,
                            resp: Resp::SlvErr,
                        },
                    };
                    debug!(
                        "bus read {addr:#010X} -> {:#010X}: {:?}",
                        beat.data, beat.resp
                    );
                    ReadState::Exec(beat)
                }
                None => ReadState::WaitAddr,
            },
            ReadState::Exec(_) if inputs.r_taken => ReadState::WaitAddr,
            ReadState::Exec(_) => self.read,
        }
    }
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocked for TransactionEngine {
    type Inputs = EngineInputs;
    type Outputs = EngineOutputs;

    fn outputs(&self) -> EngineOutputs {
        let (aw_ready, w_ready) = match self.write {
            WriteState::WaitAddr { held } => (true, held.is_none()),
            WriteState::WaitData { .. } => (false, true),
            _ => (false, false),
        };
        let reg_write = match self.write {
            WriteState::Exec { addr, beat } => decode(addr).map(|slot| RegWrite {
                slot,
                data: beat.data,
                strb: beat.strb,
            }),
            _ => None,
        };
        EngineOutputs {
            aw_ready,
            w_ready,
            b: match self.write {
                WriteState::Resp(resp) => Some(resp),
                _ => None,
            },
            ar_ready: self.read == ReadState::WaitAddr,
            r: match self.read {
                ReadState::Exec(beat) => Some(beat),
                _ => None,
            },
            reg_write,
        }
    }

    fn tick(&mut self, inputs: &EngineInputs) {
        let write = self.next_write(inputs);
        let read = self.next_read(inputs);
        self.write = write;
        self.read = read;
    }

    fn reset(&mut self) {
        self.write = WriteState::Idle;
        self.read = ReadState::Idle;
    }
}

impl Observable for TransactionEngine {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "write_state" => Some(self.write.name().into()),
            "read_state" => Some(self.read.name().into()),
            "write_addr" => match self.write {
                WriteState::WaitData { addr } | WriteState::Exec { addr, .. } => Some(addr.into()),
                _ => None,
            },
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["write_state", "read_state", "write_addr"]
    }
}
