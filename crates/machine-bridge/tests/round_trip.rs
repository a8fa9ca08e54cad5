//! Outbound words looped back into the inbound path.

use machine_bridge::{Bridge, BridgeConfig};
use sim_core::Tickable;

fn loopback_bridge(clks_per_bit: u32, fifo_depth_log2: u8) -> Bridge {
    let config = BridgeConfig {
        clks_per_bit,
        fifo_depth_log2,
        loopback: true,
        ..BridgeConfig::default()
    };
    Bridge::new(&config).expect("valid config")
}

#[test]
fn sixteen_bytes_come_back_in_order() {
    let mut bridge = loopback_bridge(4, 4);
    let words = [0x0302_0100, 0x0706_0504, 0x0B0A_0908, 0x0F0E_0D0C];
    for word in words {
        bridge.send_word(word, 10_000).expect("word accepted");
    }
    assert_eq!(bridge.receive_words(4, 10_000), words.to_vec());
}

#[test]
fn round_trip_at_several_bit_periods() {
    for clks_per_bit in [2, 3, 5, 16] {
        let mut bridge = loopback_bridge(clks_per_bit, 2);
        let words = [0xFFFF_FFFF, 0x0000_0000, 0x8001_7FFE];
        for word in words {
            bridge.send_word(word, 100_000).expect("word accepted");
        }
        assert_eq!(
            bridge.receive_words(3, 100_000),
            words.to_vec(),
            "clks {clks_per_bit}"
        );
    }
}

#[test]
fn peer_sees_bytes_least_significant_first() {
    let config = BridgeConfig {
        clks_per_bit: 4,
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(&config).expect("valid config");
    bridge.send_word(0x4433_2211, 1000).expect("word accepted");
    for _ in 0..400 {
        bridge.tick();
    }
    assert_eq!(
        bridge.peer_mut().take_received(),
        vec![0x11, 0x22, 0x33, 0x44]
    );
}

#[test]
fn peer_driven_words_land_in_rx() {
    let config = BridgeConfig {
        clks_per_bit: 8,
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(&config).expect("valid config");
    let bytes = [0xEF, 0xBE, 0xAD, 0xDE, 0x0D, 0xF0, 0xFE, 0xCA];
    bridge.peer_mut().send(&bytes);
    assert_eq!(
        bridge.receive_words(2, 5000),
        vec![0xDEAD_BEEF, 0xCAFE_F00D]
    );
    assert_eq!(bridge.bus_read(4).map(|b| b.data), Ok(0xCAFE_F00D));
}

#[test]
fn partial_word_waits_for_the_rest() {
    let config = BridgeConfig {
        clks_per_bit: 4,
        ..BridgeConfig::default()
    };
    let mut bridge = Bridge::new(&config).expect("valid config");
    bridge.peer_mut().send(&[1, 2, 3]);
    assert!(bridge.receive_words(1, 2000).is_empty());
    assert_eq!(bridge.bank().rx(), 0);
    bridge.peer_mut().send(&[4]);
    assert_eq!(bridge.receive_words(1, 2000), vec![0x0403_0201]);
}
