//! Frame receiver.
//!
//! The raw line goes through the [`Synchronizer`] first; the state machine
//! only ever sees the synchronized level.
//!
//! - `Idle`: a low level is a candidate start bit.
//! - `Start`: wait to the middle of the bit, `(clks_per_bit - 1) / 2`
//!   cycles. Still low confirms the frame; high was a glitch and the
//!   receiver quietly returns to `Idle`.
//! - `Data`: sample once per bit period, least-significant bit first.
//! - `Stop`: let one more bit period pass, then pulse `done`. The stop
//!   level is not checked.
//! - `Cleanup`: offer the byte downstream and wait until it is taken.
//!   This is the only place the receiver stalls; the line is ignored
//!   meanwhile, so a frame arriving during a stall is lost.
//!
//! `cts` (clear-to-send) drops when a frame is confirmed and rises again
//! once its byte has been handed downstream.

use log::trace;
use sim_core::{Clocked, Observable, Value};

use crate::{BitIndex, Synchronizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    Idle,
    Start,
    Data(BitIndex),
    Stop,
    Cleanup,
}

impl RxState {
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

/// Signals sampled by the receiver on a clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInputs {
    /// Raw, unsynchronized line level.
    pub line: bool,
    /// Downstream took the offered byte on this edge.
    pub byte_taken: bool,
}

impl Default for RxInputs {
    fn default() -> Self {
        Self {
            line: true,
            byte_taken: false,
        }
    }
}

/// Signals driven by the receiver during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxOutputs {
    /// Received byte offered downstream.
    pub byte: Option<u8>,
    /// One-cycle pulse when a frame's stop bit has passed.
    pub done: bool,
    /// Clear-to-send.
    pub cts: bool,
    /// Line level as seen after synchronization.
    pub synced_line: bool,
}

#[derive(Debug)]
pub struct UartRx {
    clks_per_bit: u32,
    sync: Synchronizer,
    state: RxState,
    clock_count: u32,
    shifter: u8,
    done: bool,
    cts: bool,
}

impl UartRx {
    #[must_use]
    pub fn new(clks_per_bit: u32) -> Self {
        Self {
            clks_per_bit: clks_per_bit.max(1),
            sync: Synchronizer::new(),
            state: RxState::Idle,
            clock_count: 0,
            shifter: 0,
            done: false,
            cts: true,
        }
    }

    #[must_use]
    pub fn state(&self) -> RxState {
        self.state
    }

    fn midpoint(&self) -> u32 {
        (self.clks_per_bit - 1) / 2
    }

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

impl Clocked for UartRx {
    type Inputs = RxInputs;
    type Outputs = RxOutputs;

    fn outputs(&self) -> RxOutputs {
        RxOutputs {
            byte: (self.state == RxState::Cleanup).then_some(self.shifter),
            done: self.done,
            cts: self.cts,
            synced_line: self.sync.output(),
        }
    }

    fn tick(&mut self, inputs: &RxInputs) {
        let level = self.sync.output();
        self.sync.tick(inputs.line);
        self.done = false;

        let state = self.state;
        self.state = match state {
            RxState::Idle if !level => {
                self.clock_count = 0;
                RxState::Start
            }
            RxState::Idle => RxState::Idle,
            RxState::Start if self.clock_count == self.midpoint() => {
                self.clock_count = 0;
                if level {
                    trace!("rx glitch rejected");
                    RxState::Idle
                } else {
                    trace!("rx start bit");
                    self.cts = false;
                    RxState::Data(BitIndex::FIRST)
                }
            }
            RxState::Start => {
                self.clock_count += 1;
                RxState::Start
            }
            RxState::Data(bit) if self.symbol_elapsed() => {
                self.shifter = bit.with(self.shifter, level);
                match bit.next() {
                    Some(next) => RxState::Data(next),
                    None => RxState::Stop,
                }
            }
            RxState::Stop if self.symbol_elapsed() => {
                trace!("rx frame {:#04X}", self.shifter);
                self.done = true;
                RxState::Cleanup
            }
            RxState::Cleanup if inputs.byte_taken => {
                self.cts = true;
                RxState::Idle
            }
            _ => state,
        };
    }

    fn reset(&mut self) {
        self.sync.reset();
        self.state = RxState::Idle;
        self.clock_count = 0;
        self.shifter = 0;
        self.done = false;
        self.cts = true;
    }
}

impl Observable for UartRx {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "state" => Some(self.state.name().into()),
            "bit" => match self.state {
                RxState::Data(bit) => Some(bit.get().into()),
                _ => None,
            },
            "cts" => Some(self.cts.into()),
            "done" => Some(self.done.into()),
            "synced_line" => Some(self.sync.output().into()),
            "shifter" => Some(self.shifter.into()),
            "clock_count" => Some(u64::from(self.clock_count).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "state",
            "bit",
            "cts",
            "done",
            "synced_line",
            "shifter",
            "clock_count",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_levels;

    fn edge(line: bool, byte_taken: bool) -> RxInputs {
        RxInputs { line, byte_taken }
    }

    /// Drive `levels` into the receiver, taking any byte immediately.
    fn receive(rx: &mut UartRx, levels: &[bool]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &line in levels {
            let out = rx.outputs();
            bytes.extend(out.byte);
            rx.tick(&edge(line, out.byte.is_some()));
        }
        bytes
    }

    fn idle(cycles: usize) -> Vec<bool> {
        vec![true; cycles]
    }

    #[test]
    fn receives_a_frame() {
        let mut rx = UartRx::new(4);
        let mut levels = idle(3);
        levels.extend(frame_levels(0xA7, 4));
        levels.extend(idle(8));
        assert_eq!(receive(&mut rx, &levels), vec![0xA7]);
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn receives_back_to_back_frames() {
        for clks in [2, 3, 4, 7, 16] {
            let mut rx = UartRx::new(clks);
            let mut levels = idle(5);
            for byte in [0x00, 0xFF, 0x55, 0x81] {
                levels.extend(frame_levels(byte, clks));
                levels.extend(idle(2));
            }
            levels.extend(idle(3 * clks as usize));
            assert_eq!(
                receive(&mut rx, &levels),
                vec![0x00, 0xFF, 0x55, 0x81],
                "clks {clks}"
            );
        }
    }

    #[test]
    fn short_glitch_is_rejected() {
        let mut rx = UartRx::new(8);
        let mut levels = idle(4);
        levels.push(false);
        levels.extend(idle(40));
        assert!(receive(&mut rx, &levels).is_empty());
        assert_eq!(rx.state(), RxState::Idle);
        assert!(rx.outputs().cts);
    }

    #[test]
    fn synchronizer_adds_two_cycles_before_start() {
        let mut rx = UartRx::new(8);
        rx.tick(&edge(false, false));
        assert_eq!(rx.state(), RxState::Idle);
        rx.tick(&edge(false, false));
        assert_eq!(rx.state(), RxState::Idle);
        rx.tick(&edge(false, false));
        assert_eq!(rx.state(), RxState::Start);
    }

    #[test]
    fn done_pulses_and_cts_waits_for_downstream() {
        let mut rx = UartRx::new(4);
        let mut levels = idle(2);
        levels.extend(frame_levels(0x3C, 4));
        levels.extend(idle(4));

        let mut done_pulses = 0;
        for &line in &levels {
            rx.tick(&edge(line, false));
            done_pulses += usize::from(rx.outputs().done);
        }
        assert_eq!(done_pulses, 1);
        assert_eq!(rx.outputs().byte, Some(0x3C));
        assert!(!rx.outputs().cts);

        rx.tick(&edge(true, true));
        assert!(rx.outputs().cts);
        assert_eq!(rx.state(), RxState::Idle);
    }

    #[test]
    fn stalled_receiver_ignores_the_line() {
        let mut rx = UartRx::new(4);
        let mut levels = idle(2);
        levels.extend(frame_levels(0x11, 4));
        levels.extend(idle(4));
        levels.extend(frame_levels(0x22, 4));
        levels.extend(idle(4));
        for &line in &levels {
            rx.tick(&edge(line, false));
        }
        assert_eq!(rx.state(), RxState::Cleanup);
        assert_eq!(rx.outputs().byte, Some(0x11));
    }

    #[test]
    fn reset_returns_to_idle_with_cts() {
        let mut rx = UartRx::new(4);
        for _ in 0..6 {
            rx.tick(&edge(false, false));
        }
        assert_ne!(rx.state(), RxState::Idle);
        rx.reset();
        assert_eq!(rx.state(), RxState::Idle);
        assert!(rx.outputs().cts);
        assert!(rx.outputs().synced_line);
    }
}
