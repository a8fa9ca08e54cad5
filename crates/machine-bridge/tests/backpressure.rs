//! Stalls propagate upstream without losing data; the inbound path keeps
//! working while the outbound one is blocked.

use axi_lite_regs::{RX_OFFSET, Resp, Strobe, TX_OFFSET};
use machine_bridge::{Bridge, BridgeConfig};
use sim_core::{Observable, Tickable, Value};

fn small_queue_bridge() -> Bridge {
    let config = BridgeConfig {
        clks_per_bit: 4,
        fifo_depth_log2: 2,
        ..BridgeConfig::default()
    };
    Bridge::new(&config).expect("valid config")
}

#[test]
fn full_queue_parks_the_splitter_and_holds_send_pending() {
    let mut bridge = small_queue_bridge();
    bridge.set_send_enable(false);
    assert_eq!(
        bridge.bus_write(TX_OFFSET, 0x4433_2211, Strobe::ALL),
        Ok(Resp::Okay)
    );

    for _ in 0..500 {
        bridge.tick();
        assert!(bridge.tx_fifo().count() <= bridge.tx_fifo().capacity());
    }
    assert!(bridge.tx_fifo().is_full());
    assert_eq!(bridge.tx_fifo().contents(), vec![0x11, 0x22, 0x33]);
    assert_eq!(bridge.query("splitter.state"), Some(Value::from("send")));
    assert_eq!(bridge.query("splitter.index"), Some(Value::U8(3)));
    assert!(bridge.bank().send_pending());
    assert_eq!(
        bridge.bus_write(TX_OFFSET, 0x8877_6655, Strobe::ALL),
        Ok(Resp::SlvErr)
    );

    bridge.set_send_enable(true);
    bridge.send_word(0x8877_6655, 2000).expect("word accepted");
    for _ in 0..600 {
        bridge.tick();
    }
    assert_eq!(
        bridge.peer_mut().take_received(),
        vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
    );
    assert!(!bridge.bank().send_pending());
}

#[test]
fn inbound_path_is_independent_of_a_blocked_outbound_path() {
    let mut bridge = small_queue_bridge();
    bridge.set_send_enable(false);
    assert_eq!(
        bridge.bus_write(TX_OFFSET, 0xFFFF_FFFF, Strobe::ALL),
        Ok(Resp::Okay)
    );

    bridge.peer_mut().send(&[0x10, 0x20, 0x30, 0x40]);
    assert_eq!(bridge.receive_words(1, 1000), vec![0x4030_2010]);
    assert_eq!(bridge.bus_read(RX_OFFSET).map(|b| b.data), Ok(0x4030_2010));
    assert!(bridge.bank().send_pending());
    assert!(bridge.tx_fifo().is_full());
}

#[test]
fn many_words_through_a_tiny_queue() {
    let config = BridgeConfig {
        clks_per_bit: 2,
        fifo_depth_log2: 1,
        loopback: true,
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(&config).expect("valid config");
    let words: Vec<u32> = (0..8u32)
        .map(|i| i.wrapping_mul(0x0101_0101) ^ 0xA5C3_0F96)
        .collect();
    for &word in &words {
        bridge.send_word(word, 10_000).expect("word accepted");
    }
    assert_eq!(bridge.receive_words(words.len(), 10_000), words);
}
