//! Cycle-accurate register bus to 8N1 serial bridge.
//!
//! Outbound: bus write → register bank (TX) → word splitter → outbound
//! queue → frame transmitter → line. Inbound: line → synchronizer → frame
//! receiver → inbound queue → word assembler → register bank (RX) → bus
//! read. Every block advances on the same clock edge; see [`Bridge`] for
//! how the edge is evaluated.

mod bridge;
pub mod capture;
mod config;
mod line;
#[cfg(feature = "mcp")]
pub mod mcp;

pub use bridge::{BUS_TICK_LIMIT, Bridge, Sample};
pub use config::BridgeConfig;
pub use line::LinePeer;
