//! Headless capture: Value Change Dump waveforms.
//!
//! One VCD time step is one master clock period. Signals are written only
//! when they change.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use sim_core::{MasterClock, Tickable};

use crate::{Bridge, Sample};

const WIDE_BITS: u32 = 16;

/// Identifier codes, in declaration order.
const SIGNALS: [(&str, char, u32); 7] = [
    ("tx_line", '!', 1),
    ("tx_active", '"', 1),
    ("rx_line", '#', 1),
    ("cts", '$', 1),
    ("send_pending", '%', 1),
    ("tx_fifo_count", '&', WIDE_BITS),
    ("rx_fifo_count", '\'', WIDE_BITS),
];

fn values(sample: &Sample) -> [u64; 7] {
    [
        u64::from(sample.tx_line),
        u64::from(sample.tx_active),
        u64::from(sample.rx_line),
        u64::from(sample.cts),
        u64::from(sample.send_pending),
        sample.tx_fifo_count as u64,
        sample.rx_fifo_count as u64,
    ]
}

/// Streams bridge samples as a VCD file.
pub struct VcdWriter<W: Write> {
    out: W,
    period_ps: u64,
    last: Option<[u64; 7]>,
}

impl<W: Write> VcdWriter<W> {
    /// Write the VCD header for a bridge clocked by `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(mut out: W, clock: MasterClock) -> io::Result<Self> {
        writeln!(out, "$timescale 1ps $end")?;
        writeln!(out, "$scope module bridge $end")?;
        for (name, code, width) in SIGNALS {
            writeln!(out, "$var wire {width} {code} {name} $end")?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;
        Ok(Self {
            out,
            period_ps: clock.period_ps().max(1),
            last: None,
        })
    }

    /// Record `sample` as the state at clock tick `tick`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn record(&mut self, tick: u64, sample: &Sample) -> io::Result<()> {
        let now = values(sample);
        let mut stamped = false;
        for (i, (_, code, width)) in SIGNALS.iter().enumerate() {
            if self.last.is_some_and(|last| last[i] == now[i]) {
                continue;
            }
            if !stamped {
                writeln!(self.out, "#{}", tick * self.period_ps)?;
                stamped = true;
            }
            if *width == 1 {
                writeln!(self.out, "{}{code}", now[i])?;
            } else {
                writeln!(self.out, "b{:b} {code}", now[i])?;
            }
        }
        self.last = Some(now);
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Run `ticks` edges, dumping the line signals to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn record(bridge: &mut Bridge, path: &Path, ticks: u64) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut vcd = VcdWriter::new(BufWriter::new(file), bridge.clock())?;
    vcd.record(bridge.master_clock(), &bridge.sample())?;
    for _ in 0..ticks {
        bridge.tick();
        vcd.record(bridge.master_clock(), &bridge.sample())?;
    }
    vcd.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_sample() -> Sample {
        Sample {
            tx_line: true,
            tx_active: false,
            rx_line: true,
            cts: true,
            send_pending: false,
            tx_fifo_count: 0,
            rx_fifo_count: 0,
        }
    }

    fn dump(samples: &[Sample]) -> String {
        let mut vcd = VcdWriter::new(Vec::new(), MasterClock::new(50_000_000)).expect("header");
        for (tick, sample) in samples.iter().enumerate() {
            vcd.record(tick as u64, sample).expect("record");
        }
        String::from_utf8(vcd.finish().expect("flush")).expect("utf-8")
    }

    #[test]
    fn header_declares_every_signal() {
        let text = dump(&[]);
        assert!(text.starts_with("$timescale 1ps $end\n"));
        for (name, _, _) in SIGNALS {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.trim_end().ends_with("$enddefinitions $end"));
    }

    #[test]
    fn only_changes_are_written() {
        let busy = Sample {
            tx_line: false,
            tx_fifo_count: 3,
            ..idle_sample()
        };
        let text = dump(&[idle_sample(), idle_sample(), busy]);
        let body: Vec<&str> = text.lines().skip_while(|l| !l.starts_with('#')).collect();
        assert_eq!(body[0], "#0");
        assert_eq!(body.len(), 1 + SIGNALS.len() + 3);
        assert_eq!(&body[8..], &["#40000", "0!", "b11 &"]);
    }

    #[test]
    fn record_dumps_a_transmitted_frame() {
        let config = crate::BridgeConfig {
            clks_per_bit: 4,
            ..crate::BridgeConfig::default()
        };
        let mut bridge = Bridge::new(&config).expect("valid config");
        bridge.send_word(0x0000_0000, 100).expect("word accepted");

        let path = std::env::temp_dir().join(format!("bridge-capture-{}.vcd", std::process::id()));
        record(&mut bridge, &path, 100).expect("capture written");
        let text = fs::read_to_string(&path).expect("capture readable");
        let _ = fs::remove_file(&path);

        assert!(text.contains("$enddefinitions $end"));
        assert!(text.lines().any(|l| l == "0!"), "tx line never went low");
        assert!(text.lines().any(|l| l == "1\""), "tx active never rose");
    }
}
