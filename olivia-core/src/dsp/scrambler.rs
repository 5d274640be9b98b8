//! XOR scrambling against a fixed 64-bit key, rolled per encoded row.
//!
//! The key exists purely to make the transmitted waveform look random
//! on the air; it carries no cryptographic weight. XOR against a ±1
//! value is implemented as elementwise multiplication, since the
//! scrambled data itself lives in the ±1 domain after the Walsh-Hadamard
//! transform.

/// The fixed 64-bit scrambling key, already in the bit order the
/// modem consumes it in (most-significant bit first, after flipping
/// the literal key's byte order to little-endian-indexed form).
const KEY_BITS: [u8; 64] = [
    0, 0, 1, 1, 0, 1, 1, 1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 1, 0, 0,
    0, 0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 0, 1, 0, 1, 0, 0, 1, 0, 0, 0, 1, 1, 1,
];

/// Key rolled left by `13 * row` positions and mapped to ±1
/// (`0 -> +1`, `1 -> -1`), matching `-2*bit + 1`.
fn rolled_row(row: usize) -> [f32; 64] {
    let shift = (13 * row) % 64;
    let mut out = [0f32; 64];
    for j in 0..64 {
        let bit = KEY_BITS[(j + shift) % 64];
        out[j] = if bit == 1 { -1.0 } else { 1.0 };
    }
    out
}

/// Caches the per-row ±1 scrambling pattern for every row of a block
/// (`spb` rows), since the key itself never changes across the
/// modem's lifetime.
pub struct Scrambler {
    rows: Vec<[f32; 64]>,
}

impl Scrambler {
    pub fn new(spb: usize) -> Self {
        Self {
            rows: (0..spb).map(rolled_row).collect(),
        }
    }

    /// Scramble (or descramble — the operation is its own inverse)
    /// `data` in place using row `row`'s ±1 pattern.
    pub fn apply(&self, row: usize, data: &mut [f32; 64]) {
        let pattern = &self.rows[row];
        for i in 0..64 {
            data[i] *= pattern[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrambling_is_involutive() {
        let scrambler = Scrambler::new(5);
        let original = [1.0f32; 64];
        for row in 0..5 {
            let mut data = original;
            scrambler.apply(row, &mut data);
            scrambler.apply(row, &mut data);
            assert_eq!(data, original);
        }
    }

    #[test]
    fn every_entry_is_unit_magnitude() {
        let scrambler = Scrambler::new(7);
        for row in 0..7 {
            let mut data = [1.0f32; 64];
            scrambler.apply(row, &mut data);
            for v in data {
                assert!((v.abs() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn row_zero_matches_key_bits_directly() {
        let scrambler = Scrambler::new(1);
        let mut data = [1.0f32; 64];
        scrambler.apply(0, &mut data);
        for (i, &bit) in KEY_BITS.iter().enumerate() {
            let expected = if bit == 1 { -1.0 } else { 1.0 };
            assert_eq!(data[i], expected);
        }
    }
}
