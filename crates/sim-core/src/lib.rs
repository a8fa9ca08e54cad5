//! Core traits and types for cycle-accurate simulation of clocked logic.
//!
//! Everything advances on the rising edge of one master clock. A tick is one
//! edge: every block first exposes the outputs of its registers, then all
//! blocks latch their next state from that common snapshot.

mod clock;
mod handshake;
mod observable;
mod tickable;
mod ticks;

pub use clock::MasterClock;
pub use handshake::Link;
pub use observable::{Observable, Value};
pub use tickable::{Clocked, Tickable};
pub use ticks::Ticks;
