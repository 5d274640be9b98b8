//! Turns a block of `spb` 7-bit characters into the 64 tone numbers
//! that carry them, via inverse-WHT redundancy encoding, scrambling,
//! and bit interleaving.

use crate::config::DerivedParams;

/// Encode one block's worth of characters (`piece.len() == spb`) into
/// 64 tone numbers, one per symbol slot.
pub fn prepare_symbols(derived: &DerivedParams, piece: &[u8]) -> [u32; 64] {
    let spb = derived.spb as usize;
    debug_assert_eq!(piece.len(), spb);

    // Redundancy-encode and scramble each row independently.
    let mut rows: Vec<[f32; 64]> = Vec::with_capacity(spb);
    for (i, &ch) in piece.iter().enumerate() {
        let mut q = ch as u32;
        if q > 127 {
            q = 0;
        }

        let mut row = [0f32; 64];
        if q < 64 {
            row[q as usize] = 1.0;
        } else {
            row[(q - 64) as usize] = -1.0;
        }

        crate::dsp::wht::ifwht(&mut row);
        derived.scrambler.apply(i, &mut row);
        rows.push(row);
    }

    // Bit-interleave across symbols to spread any single-symbol error
    // across multiple decoded rows instead of a single character.
    let mut bits = [[0u8; 64]; 8]; // bits[bis][sym], only [0..spb) rows used
    for bis in 0..spb {
        for sym in 0..64 {
            let q = (100 * spb + bis - sym) % spb;
            if rows[q][sym] < 0.0 {
                bits[bis][sym] = 1;
            }
        }
    }

    let mut tones = [0u32; 64];
    for sym in 0..64 {
        let mut value = 0u32;
        for bis in 0..spb {
            value |= (bits[bis][sym] as u32) << bis;
        }
        tones[sym] = value;
    }

    tones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModemConfig;

    #[test]
    fn encodes_a_full_block_of_null_padding() {
        let config = ModemConfig::default();
        let derived = DerivedParams::new(&config);
        let piece = vec![0u8; derived.spb as usize];
        let tones = prepare_symbols(&derived, &piece);
        for &t in &tones {
            assert!(t < config.symbols);
        }
    }

    #[test]
    fn distinct_characters_produce_distinct_tone_sequences() {
        let config = ModemConfig::default();
        let derived = DerivedParams::new(&config);
        let spb = derived.spb as usize;
        let a = prepare_symbols(&derived, &vec![b'A'; spb]);
        let b = prepare_symbols(&derived, &vec![b'B'; spb]);
        assert_ne!(a, b);
    }
}
