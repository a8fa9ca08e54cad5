//! Bridge runner binary.
//!
//! Writes words into the TX register and runs the bridge headless, either
//! with the line looped back into the receiver or against the line peer,
//! then prints what came out the other end. Can also serve the bridge over
//! JSON-RPC.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use axi_lite_regs::{Completion, Request, Strobe, TX_OFFSET};
use log::{info, warn};
use machine_bridge::capture::VcdWriter;
use machine_bridge::mcp::McpServer;
use machine_bridge::{Bridge, BridgeConfig};
use sim_core::{MasterClock, Tickable};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    config: BridgeConfig,
    baud: Option<u32>,
    words: Vec<u32>,
    ticks: Option<u64>,
    vcd_path: Option<PathBuf>,
    mcp: bool,
}

fn print_usage() {
    eprintln!("Usage: emu-bridge [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --clks-per-bit <n>     Clock cycles per serial bit [default: 434]");
    eprintln!("  --baud <rate>          Derive clks-per-bit from a baud rate");
    eprintln!("  --clock-hz <hz>        Master clock frequency [default: 50000000]");
    eprintln!("  --fifo-depth-log2 <k>  Byte queues hold 2^k - 1 bytes [default: 4]");
    eprintln!("  --loopback             Feed the transmit line back into the receiver");
    eprintln!("  --send <words>         Comma-separated hex words to write to TX");
    eprintln!("  --ticks <n>            Stop after n ticks [default: until delivered]");
    eprintln!("  --vcd <file>           Dump line signals as a VCD waveform");
    eprintln!("  --mcp                  Run as MCP server (JSON-RPC over stdio)");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn parse_hex_word(text: &str) -> Result<u32> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .replace('_', "");
    u32::from_str_radix(&digits, 16).with_context(|| format!("invalid hex word '{text}'"))
}

fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config: BridgeConfig::default(),
        baud: None,
        words: Vec::new(),
        ticks: None,
        vcd_path: None,
        mcp: false,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--clks-per-bit" => {
                i += 1;
                cli.config.clks_per_bit = value(&args, i, flag)?
                    .parse()
                    .context("--clks-per-bit expects an integer")?;
            }
            "--baud" => {
                i += 1;
                let baud = value(&args, i, flag)?
                    .parse()
                    .context("--baud expects an integer")?;
                cli.baud = Some(baud);
            }
            "--clock-hz" => {
                i += 1;
                cli.config.clock_hz = value(&args, i, flag)?
                    .parse()
                    .context("--clock-hz expects an integer")?;
            }
            "--fifo-depth-log2" => {
                i += 1;
                cli.config.fifo_depth_log2 = value(&args, i, flag)?
                    .parse()
                    .context("--fifo-depth-log2 expects an integer")?;
            }
            "--loopback" => {
                cli.config.loopback = true;
            }
            "--send" => {
                i += 1;
                let list = value(&args, i, flag)?;
                for word in list.split(',').filter(|w| !w.trim().is_empty()) {
                    cli.words.push(parse_hex_word(word)?);
                }
            }
            "--ticks" => {
                i += 1;
                let ticks = value(&args, i, flag)?
                    .parse()
                    .context("--ticks expects an integer")?;
                cli.ticks = Some(ticks);
            }
            "--vcd" => {
                i += 1;
                cli.vcd_path = Some(PathBuf::from(value(&args, i, flag)?));
            }
            "--mcp" => {
                cli.mcp = true;
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => {
                print_usage();
                bail!("unknown argument: {other}");
            }
        }
        i += 1;
    }

    if let Some(baud) = cli.baud {
        cli.config = cli.config.with_baud(baud).map_err(|e| anyhow!(e))?;
    }
    cli.config.validate().map_err(|e| anyhow!(e))?;
    Ok(cli)
}

// ---------------------------------------------------------------------------
// Headless mode
// ---------------------------------------------------------------------------

/// Host-side feeder: writes each word to TX once the register is free and
/// retries any write the bank refuses.
struct Feeder {
    queue: VecDeque<u32>,
    in_flight: Option<u32>,
}

impl Feeder {
    fn step(&mut self, bridge: &mut Bridge) {
        if let Some(Completion::Write(resp)) = bridge.take_completion() {
            match self.in_flight.take() {
                Some(word) if !resp.is_okay() => {
                    warn!("TX write of {word:#010X} refused, retrying");
                    self.queue.push_front(word);
                }
                _ => {}
            }
        }
        if bridge.host_busy() || self.in_flight.is_some() || bridge.bank().send_pending() {
            return;
        }
        let Some(word) = self.queue.pop_front() else {
            return;
        };
        let request = Request::Write {
            addr: TX_OFFSET,
            data: word,
            strb: Strobe::ALL,
        };
        if bridge.issue(request) {
            self.in_flight = Some(word);
        } else {
            self.queue.push_front(word);
        }
    }

    fn is_done(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }
}

fn run_headless(cli: &CliArgs) -> Result<()> {
    let config = cli.config;
    let mut bridge = Bridge::new(&config).map_err(|e| anyhow!(e))?;
    let clock = bridge.clock();
    info!(
        "bridge: {} Hz, {} clks/bit ({} baud), {} byte queues, {}",
        config.clock_hz,
        config.clks_per_bit,
        clock.baud_for(config.clks_per_bit),
        (1usize << config.fifo_depth_log2) - 1,
        if config.loopback { "loopback" } else { "peer" }
    );

    let mut vcd = match &cli.vcd_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            Some(VcdWriter::new(BufWriter::new(file), clock)?)
        }
        None => None,
    };

    let mut feeder = Feeder {
        queue: cli.words.iter().copied().collect(),
        in_flight: None,
    };
    let expected_bytes = cli.words.len() * 4;
    let frame = MasterClock::ticks_per_frame(config.clks_per_bit).get();
    let limit = cli
        .ticks
        .unwrap_or((expected_bytes as u64 + 2) * (frame + 4) * 2);

    let mut words_out = Vec::new();
    let mut bytes_out = Vec::new();
    if let Some(vcd) = vcd.as_mut() {
        vcd.record(bridge.master_clock(), &bridge.sample())?;
    }
    for _ in 0..limit {
        feeder.step(&mut bridge);
        bridge.tick();
        if let Some(vcd) = vcd.as_mut() {
            vcd.record(bridge.master_clock(), &bridge.sample())?;
        }
        words_out.extend(bridge.take_rx_words());
        bytes_out.extend(bridge.peer_mut().take_received());

        let delivered = if config.loopback {
            words_out.len() == cli.words.len()
        } else {
            bytes_out.len() == expected_bytes
        };
        if cli.ticks.is_none() && feeder.is_done() && delivered {
            break;
        }
    }

    if let (Some(vcd), Some(path)) = (vcd, &cli.vcd_path) {
        vcd.finish()?;
        info!("waveform written to {}", path.display());
    }

    info!("stopped after {} ticks", bridge.master_clock());
    for word in &words_out {
        println!("rx word {word:#010X}");
    }
    if !bytes_out.is_empty() {
        let hex: Vec<String> = bytes_out.iter().map(|b| format!("{b:02X}")).collect();
        println!("peer received {}", hex.join(" "));
    }
    if !feeder.is_done() {
        let stuck = feeder.queue.len() + usize::from(feeder.in_flight.is_some());
        bail!("{stuck} words were never accepted");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = parse_args()?;

    if cli.mcp {
        let mut server = McpServer::new();
        server.set_defaults(cli.config);
        info!("serving JSON-RPC on stdio");
        server.run();
        return Ok(());
    }

    run_headless(&cli)
}
