//! Minimal bus host issuing one transaction at a time.
//!
//! Holds each request channel valid until the engine accepts it, keeps its
//! response ready raised while waiting, and records the result for the
//! caller to collect.

use sim_core::{Clocked, Observable, Value};

use crate::{ReadBeat, Resp, Strobe, WriteBeat};

/// A single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Write { addr: u32, data: u32, strb: Strobe },
    Read { addr: u32 },
}

/// Result of a finished transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Write(Resp),
    Read(ReadBeat),
}

impl Completion {
    #[must_use]
    pub const fn resp(&self) -> Resp {
        match self {
            Self::Write(resp) => *resp,
            Self::Read(beat) => beat.resp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Channels still to transfer are `Some`; both `None` means waiting on B.
    Write {
        addr: Option<u32>,
        beat: Option<WriteBeat>,
        lag: u32,
    },
    /// `None` once the address has transferred.
    Read { addr: Option<u32> },
}

/// Signals sampled by the initiator on a clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitiatorInputs {
    pub aw_fired: bool,
    pub w_fired: bool,
    pub b: Option<Resp>,
    pub ar_fired: bool,
    pub r: Option<ReadBeat>,
}

/// Signals driven by the initiator during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiatorOutputs {
    pub aw: Option<u32>,
    pub w: Option<WriteBeat>,
    pub b_ready: bool,
    pub ar: Option<u32>,
    pub r_ready: bool,
}

/// Single-outstanding bus host.
#[derive(Debug)]
pub struct Initiator {
    state: State,
    completion: Option<Completion>,
    /// Cycles to hold back write data after issuing the address.
    data_lag: u32,
}

impl Initiator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            completion: None,
            data_lag: 0,
        }
    }

    /// Present write data `cycles` cycles after the address.
    pub fn set_data_lag(&mut self, cycles: u32) {
        self.data_lag = cycles;
    }

    /// Start a transaction. Returns `false` if one is already in flight.
    pub fn issue(&mut self, request: Request) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = match request {
            Request::Write { addr, data, strb } => State::Write {
                addr: Some(addr),
                beat: Some(WriteBeat { data, strb }),
                lag: self.data_lag,
            },
            Request::Read { addr } => State::Read { addr: Some(addr) },
        };
        true
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state != State::Idle
    }

    /// Collect the result of the last finished transaction.
    pub fn take_completion(&mut self) -> Option<Completion> {
        self.completion.take()
    }
}

impl Default for Initiator {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocked for Initiator {
    type Inputs = InitiatorInputs;
    type Outputs = InitiatorOutputs;

    fn outputs(&self) -> InitiatorOutputs {
        match self.state {
            State::Idle => InitiatorOutputs {
                aw: None,
                w: None,
                b_ready: false,
                ar: None,
                r_ready: false,
            },
            State::Write { addr, beat, lag } => InitiatorOutputs {
                aw: addr,
                w: if lag == 0 { beat } else { None },
                b_ready: true,
                ar: None,
                r_ready: false,
            },
            State::Read { addr } => InitiatorOutputs {
                aw: None,
                w: None,
                b_ready: false,
                ar: addr,
                r_ready: true,
            },
        }
    }

    fn tick(&mut self, inputs: &InitiatorInputs) {
        match self.state {
            State::Idle => {}
            State::Write { addr, beat, lag } => {
                if let Some(resp) = inputs.b {
                    self.completion = Some(Completion::Write(resp));
                    self.state = State::Idle;
                } else {
                    self.state = State::Write {
                        addr: addr.filter(|_| !inputs.aw_fired),
                        beat: beat.filter(|_| !inputs.w_fired),
                        lag: lag.saturating_sub(1),
                    };
                }
            }
            State::Read { addr } => {
                if let Some(beat) = inputs.r {
                    self.completion = Some(Completion::Read(beat));
                    self.state = State::Idle;
                } else {
                    self.state = State::Read {
                        addr: addr.filter(|_| !inputs.ar_fired),
                    };
                }
            }
        }
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.completion = None;
    }
}

impl Observable for Initiator {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "busy" => Some(self.is_busy().into()),
            "state" => Some(
                match self.state {
                    State::Idle => "idle",
                    State::Write { .. } => "write",
                    State::Read { .. } => "read",
                }
                .into(),
            ),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["busy", "state"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_holds_channels_until_fired() {
        let mut host = Initiator::new();
        assert!(host.issue(Request::Write {
            addr: 0,
            data: 5,
            strb: Strobe::ALL,
        }));
        assert!(!host.issue(Request::Read { addr: 0 }));

        let out = host.outputs();
        assert_eq!(out.aw, Some(0));
        assert_eq!(out.w.map(|b| b.data), Some(5));

        host.tick(&InitiatorInputs {
            aw_fired: true,
            ..InitiatorInputs::default()
        });
        assert_eq!(host.outputs().aw, None);
        assert!(host.outputs().w.is_some());

        host.tick(&InitiatorInputs {
            w_fired: true,
            ..InitiatorInputs::default()
        });
        assert!(host.outputs().b_ready);

        host.tick(&InitiatorInputs {
            b: Some(Resp::Okay),
            ..InitiatorInputs::default()
        });
        assert!(!host.is_busy());
        let done = host.take_completion();
        assert_eq!(done, Some(Completion::Write(Resp::Okay)));
        assert_eq!(host.take_completion(), None);
    }

    #[test]
    fn data_lag_delays_write_data() {
        let mut host = Initiator::new();
        host.set_data_lag(2);
        host.issue(Request::Write {
            addr: 4,
            data: 1,
            strb: Strobe::ALL,
        });
        assert_eq!(host.outputs().w, None);
        host.tick(&InitiatorInputs {
            aw_fired: true,
            ..InitiatorInputs::default()
        });
        assert_eq!(host.outputs().w, None);
        host.tick(&InitiatorInputs::default());
        assert!(host.outputs().w.is_some());
    }

    #[test]
    fn read_completes_with_beat() {
        let mut host = Initiator::new();
        host.issue(Request::Read { addr: 4 });
        assert_eq!(host.outputs().ar, Some(4));
        host.tick(&InitiatorInputs {
            ar_fired: true,
            ..InitiatorInputs::default()
        });
        assert_eq!(host.outputs().ar, None);
        let beat = ReadBeat {
            data: 0xABCD,
            resp: Resp::Okay,
        };
        host.tick(&InitiatorInputs {
            r: Some(beat),
            ..InitiatorInputs::default()
        });
        assert_eq!(host.take_completion(), Some(Completion::Read(beat)));
    }
}
