//! End-to-end TX/RX scenarios and cross-module invariants that don't
//! belong inside any single module's unit tests.

use olivia_core::config::{DerivedParams, ModemConfig};
use olivia_core::dsp::gray::{degray, gray};
use olivia_core::dsp::wht::{fwht, ifwht};
use olivia_core::rx_pipeline::RxPipeline;
use olivia_core::tx_pipeline::TxPipeline;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn default_config() -> ModemConfig {
    ModemConfig::default()
}

fn loopback_decode(config: ModemConfig, message: &str) -> String {
    let derived = DerivedParams::new(&config);
    let mut tx = TxPipeline::new(config.clone(), &derived);
    let mut rx = RxPipeline::new(config, &derived);
    let mut rng = StdRng::seed_from_u64(1234);

    let blocks = tx.send(&derived, message, &mut rng);
    let mut decoded = String::new();
    for block in &blocks {
        for window in block.chunks(derived.wlen) {
            if window.len() < derived.wlen {
                continue;
            }
            if let Some(result) = rx.push_window(&derived, window) {
                decoded.push_str(&result.text);
            }
        }
    }
    decoded
}

#[test]
fn e1_empty_message_enqueues_preamble_and_tail_only() {
    let config = default_config();
    let derived = DerivedParams::new(&config);
    let mut tx = TxPipeline::new(config.clone(), &derived);
    let mut rng = StdRng::seed_from_u64(1);

    let blocks = tx.send(&derived, "", &mut rng);
    assert_eq!(blocks.len(), 2);
    let total: usize = blocks.iter().map(|b| b.len()).sum();
    assert_eq!(total, 2 * 64 * derived.wlen);
}

#[test]
fn e2_hello_is_exactly_one_piece() {
    let config = default_config();
    let derived = DerivedParams::new(&config);
    let mut tx = TxPipeline::new(config.clone(), &derived);
    let mut rng = StdRng::seed_from_u64(1);

    // spb = 5 by default, "hello" is 5 characters.
    let blocks = tx.send(&derived, "hello", &mut rng);
    assert_eq!(blocks.len(), 3);
}

#[test]
fn e3_hello_bang_splits_into_two_padded_pieces() {
    let config = default_config();
    let derived = DerivedParams::new(&config);
    let mut tx = TxPipeline::new(config.clone(), &derived);
    let mut rng = StdRng::seed_from_u64(1);

    let blocks = tx.send(&derived, "hello!", &mut rng);
    assert_eq!(blocks.len(), 4);
}

#[test]
fn e4_noiseless_loopback_recovers_test5() {
    let config = ModemConfig { preamble: true, ..default_config() };
    let decoded = loopback_decode(config, "TEST5");
    assert_eq!(decoded, "TEST5");
}

#[test]
fn e5_noiseless_loopback_strips_padding_nulls() {
    let config = ModemConfig { preamble: false, ..default_config() };
    let decoded = loopback_decode(config, "HI");
    assert_eq!(decoded, "HI");
}

#[test]
fn e6_gray_table_for_eight_symbols() {
    let expected = [0u32, 1, 3, 2, 6, 7, 5, 4];
    for (n, &g) in expected.iter().enumerate() {
        assert_eq!(gray(n as u32), g);
        assert_eq!(degray(g), n as u32);
    }
}

#[test]
fn property_wht_round_trip_scales_by_transform_length() {
    use rand::Rng;
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let original: [f32; 64] = std::array::from_fn(|_| rng.gen_range(-64..=64) as f32);

        let mut via_ifwht_fwht = original;
        ifwht(&mut via_ifwht_fwht);
        fwht(&mut via_ifwht_fwht);
        for i in 0..64 {
            assert!((via_ifwht_fwht[i] - 64.0 * original[i]).abs() < 1e-2);
        }

        let mut via_fwht_ifwht = original;
        fwht(&mut via_fwht_ifwht);
        ifwht(&mut via_fwht_ifwht);
        for i in 0..64 {
            assert!((via_fwht_ifwht[i] - 64.0 * original[i]).abs() < 1e-2);
        }
    }
}

#[test]
fn property_interleave_row_index_stays_in_range_for_every_spb() {
    for spb in 1usize..=8 {
        for sym in 0usize..64 {
            for bis in 0..spb {
                let row = (100 * spb + bis - sym) % spb;
                assert!(row < spb);
            }
        }
    }
}

#[test]
fn tail_placement_is_zero_padded_when_sample_rate_is_smaller_than_block() {
    // Default config: sample_rate = 8000, 64 * wlen = 64 * 256 = 16384.
    let config = default_config();
    let derived = DerivedParams::new(&config);
    let mut tx = TxPipeline::new(config.clone(), &derived);

    let preamble = tx.generate_preamble(&derived);
    let block_len = 64 * derived.wlen;
    let zero_prefix_len = block_len - config.sample_rate as usize;

    assert!(preamble[..zero_prefix_len].iter().all(|&s| s == 0.0));
    assert!(preamble[zero_prefix_len..].iter().any(|&s| s != 0.0));
}
