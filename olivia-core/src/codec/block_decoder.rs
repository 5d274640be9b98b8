//! Reconstructs a block's characters from 64 detected tone numbers
//! (already degrayed by the caller), reversing the bit interleave,
//! descrambling, and forward-WHT redundancy decoding.

use crate::config::DerivedParams;
use crate::dsp::wht;

/// Result of decoding one 64-symbol block.
pub struct DecodedBlock {
    /// Recovered characters, one per row (`spb` of them). Null
    /// characters (tone value 0) are omitted, since they only ever
    /// mark padding.
    pub text: String,

    /// Number of rows whose WHT peak fell below the confidence
    /// threshold. A non-zero count means the block should not be
    /// accepted as-is (the caller should keep rolling the window).
    pub doubt: u32,
}

/// Decode 64 detected symbols (post-degray tone numbers) into a block
/// of characters.
pub fn decode_block(derived: &DerivedParams, syms: &[u32; 64], block_threshold: f32, auto_scale: bool) -> DecodedBlock {
    let spb = derived.spb as usize;
    let mut text = String::new();
    let mut doubt = 0u32;

    for i in 0..spb {
        let mut row = [0f32; 64];
        for j in 0..64 {
            let bit = (syms[j] >> ((i + j) % spb)) & 1;
            row[j] = if bit == 1 { -1.0 } else { 1.0 };
        }

        derived.scrambler.apply(i, &mut row);
        wht::fwht(&mut row);

        let (mut c, val) = wht::argmax_abs(&row);

        let magnitude = if auto_scale {
            let rms = (row.iter().map(|v| v * v).sum::<f32>() / row.len() as f32).sqrt();
            if rms > 0.0 {
                val.abs() / rms
            } else {
                0.0
            }
        } else {
            val.abs()
        };

        if magnitude < block_threshold {
            doubt += 1;
        }

        if val < 0.0 {
            c += 64;
        }

        if c != 0 {
            if let Some(ch) = char::from_u32(c as u32) {
                text.push(ch);
            }
        }
    }

    DecodedBlock { text, doubt }
}
