//! Asynchronous reset from arbitrary points in the pipeline.

use axi_lite_regs::{RX_OFFSET, Request, Resp, Strobe, TX_OFFSET};
use machine_bridge::{Bridge, BridgeConfig};
use sim_core::{Clocked, Observable, Tickable, Value};

fn make_bridge() -> Bridge {
    let config = BridgeConfig {
        clks_per_bit: 4,
        fifo_depth_log2: 3,
        loopback: true,
        ..BridgeConfig::default()
    };
    Bridge::new(&config).expect("valid config")
}

fn assert_initial_state(bridge: &Bridge) {
    assert_eq!(bridge.bank().tx(), 0);
    assert_eq!(bridge.bank().rx(), 0);
    assert!(!bridge.bank().send_pending());
    assert!(bridge.tx_fifo().is_empty());
    assert!(bridge.rx_fifo().is_empty());
    assert!(!bridge.host_busy());
    for (path, state) in [
        ("engine.write_state", "idle"),
        ("engine.read_state", "idle"),
        ("splitter.state", "idle"),
        ("assembler.state", "collect"),
        ("uart_tx.state", "idle"),
        ("uart_rx.state", "idle"),
    ] {
        assert_eq!(bridge.query(path), Some(Value::from(state)), "{path}");
    }
    assert!(bridge.uart_tx().outputs().line);
    assert!(bridge.uart_rx().outputs().cts);
}

#[test]
fn reset_at_every_point_of_a_transfer() {
    for stop_at in (0..200).step_by(7) {
        let mut bridge = make_bridge();
        bridge.send_word(0x1234_5678, 100).expect("word accepted");
        bridge.send_word(0x9ABC_DEF0, 400).expect("word accepted");
        assert!(bridge.issue(Request::Read { addr: RX_OFFSET }));
        for _ in 0..stop_at {
            bridge.tick();
        }

        bridge.reset();
        assert_initial_state(&bridge);

        for _ in 0..100 {
            bridge.tick();
        }
        bridge.take_rx_words();
        bridge.send_word(0x0F0F_F0F0, 100).expect("word accepted");
        assert_eq!(
            bridge.receive_words(1, 1000),
            vec![0x0F0F_F0F0],
            "reset after {stop_at} ticks"
        );
    }
}

#[test]
fn held_reset_overrides_the_clock() {
    let mut bridge = make_bridge();
    bridge.set_send_enable(false);
    assert_eq!(
        bridge.bus_write(TX_OFFSET, 0xFFFF_FFFF, Strobe::ALL),
        Ok(Resp::Okay)
    );

    bridge.set_reset(true);
    assert!(bridge.in_reset());
    assert!(bridge.issue(Request::Write {
        addr: RX_OFFSET,
        data: 1,
        strb: Strobe::ALL,
    }));
    for _ in 0..50 {
        bridge.tick();
        assert_initial_state(&bridge);
    }
    assert_eq!(bridge.master_clock(), 54);

    bridge.set_reset(false);
    assert_eq!(bridge.bus_write(RX_OFFSET, 7, Strobe::ALL), Ok(Resp::Okay));
    assert_eq!(bridge.bus_read(RX_OFFSET).map(|b| b.data), Ok(7));
}
