//! Framing and waveform generation for the transmit side: preamble/tail
//! tones around data blocks, with 64-symbol-block trail overlap so
//! adjacent blocks splice together without a seam.

use crate::codec::block_encoder::prepare_symbols;
use crate::config::{DerivedParams, ModemConfig};
use crate::dsp::gray::gray;
use crate::dsp::tone::shape_window;
use rand::RngCore;
use std::f32::consts::PI;

pub struct TxPipeline {
    config: ModemConfig,
    trail: Vec<f32>,
}

impl TxPipeline {
    pub fn new(config: ModemConfig, derived: &DerivedParams) -> Self {
        Self {
            config,
            trail: vec![0.0; derived.wlen],
        }
    }

    /// One second of: lowest tone, highest tone, lowest tone, highest
    /// tone, each a quarter second long, marking the start/end of a
    /// transmission so the receiver can recognize band edges.
    fn generate_tail(&self, derived: &DerivedParams) -> Vec<f32> {
        let sample_rate = self.config.sample_rate as usize;
        let pl = sample_rate / 4;
        let shape = shape_window(pl);

        let low_freq = self.config.centre_freq as f32 - self.config.bandwidth as f32 / 2.0 + derived.fsep / 2.0;
        let high_freq = self.config.centre_freq as f32 + self.config.bandwidth as f32 / 2.0 - derived.fsep / 2.0;

        let segment = |freq: f32| -> Vec<f32> {
            (0..pl)
                .map(|n| {
                    let t = n as f32 / self.config.sample_rate as f32;
                    shape[n] * (2.0 * PI * freq * t).sin() / 2.0
                })
                .collect()
        };

        let low = segment(low_freq);
        let high = segment(high_freq);

        let mut wf = vec![0.0f32; sample_rate];
        wf[0..pl].copy_from_slice(&low);
        wf[pl..2 * pl].copy_from_slice(&high);
        wf[2 * pl..3 * pl].copy_from_slice(&low);
        wf[3 * pl..4 * pl].copy_from_slice(&high);
        wf
    }

    /// A full block buffer's worth of leading silence with the closing
    /// tail spliced into its end, used before any data is sent.
    pub fn generate_preamble(&self, derived: &DerivedParams) -> Vec<f32> {
        let block_len = 64 * derived.wlen;
        let mut wf = vec![0.0f32; block_len];
        let tail = self.generate_tail(derived);
        if tail.len() < block_len {
            let start = block_len - tail.len();
            wf[start..].copy_from_slice(&tail);
        }
        wf
    }

    /// Generate one 64-symbol block. `piece` of `None` generates the
    /// closing tail block instead of data.
    pub fn generate_block(
        &mut self,
        derived: &DerivedParams,
        piece: Option<&[u8]>,
        rng: &mut dyn RngCore,
    ) -> Vec<f32> {
        let wlen = derived.wlen;
        let block_len = 64 * wlen;
        let mut wf = vec![0.0f32; block_len + wlen];

        for i in 0..wlen {
            wf[i] += self.trail[i];
        }

        let Some(piece) = piece else {
            // A closing tail is only spliced onto this block when a
            // preamble is also in play; with `preamble = false` the
            // closing block is just the trail overlap from the last
            // data block, and `trail` itself is left untouched.
            if !self.config.preamble {
                wf.truncate(block_len);
                return wf;
            }
            self.trail = vec![0.0; wlen];
            let tail = self.generate_tail(derived);
            if tail.len() < block_len {
                wf[wlen..wlen + tail.len()].copy_from_slice(&tail);
            }
            wf.truncate(block_len);
            return wf;
        };

        let tones = prepare_symbols(derived, piece);
        for (i, &tone) in tones.iter().enumerate() {
            let waveform = derived.tone_synth.synth(gray(tone), rng);
            let start = wlen * i;
            for (k, &v) in waveform.iter().enumerate() {
                wf[start + k] += v;
            }
        }

        self.trail = wf[block_len..block_len + wlen].to_vec();
        wf.truncate(block_len);
        wf
    }

    /// Splits `message` into `spb`-character pieces (last one null-padded),
    /// returning the full sequence of attenuated blocks ready to queue
    /// for transmission: optional preamble, one block per piece, and a
    /// closing tail block.
    pub fn send(&mut self, derived: &DerivedParams, message: &str, rng: &mut dyn RngCore) -> Vec<Vec<f32>> {
        let spb = derived.spb as usize;
        let mut blocks = Vec::new();

        if self.config.preamble {
            blocks.push(attenuate(self.generate_preamble(derived), self.config.attenuation));
        }

        let bytes = message.as_bytes();
        for chunk in bytes.chunks(spb) {
            let mut piece = chunk.to_vec();
            piece.resize(spb, 0);
            blocks.push(attenuate(self.generate_block(derived, Some(&piece), rng), self.config.attenuation));
        }

        blocks.push(attenuate(self.generate_block(derived, None, rng), self.config.attenuation));
        blocks
    }
}

fn attenuate(mut samples: Vec<f32>, attenuation: u32) -> Vec<f32> {
    let divisor = attenuation.max(1) as f32;
    for s in &mut samples {
        *s /= divisor;
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_blocks_have_exactly_64_symbol_lengths() {
        let config = ModemConfig::default();
        let derived = DerivedParams::new(&config);
        let mut pipeline = TxPipeline::new(config.clone(), &derived);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let blocks = pipeline.send(&derived, "HELLO", &mut rng);
        for block in &blocks {
            assert_eq!(block.len(), 64 * derived.wlen);
        }
    }

    #[test]
    fn preamble_is_included_when_enabled() {
        let config = ModemConfig { preamble: true, ..Default::default() };
        let derived = DerivedParams::new(&config);
        let mut pipeline = TxPipeline::new(config, &derived);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let spb = derived.spb as usize;
        let blocks = pipeline.send(&derived, "A", &mut rng);
        // preamble + one data block + one closing tail block
        assert_eq!(blocks.len(), 3);
        let _ = spb;
    }

    #[test]
    fn no_preamble_omits_the_leading_block() {
        let config = ModemConfig { preamble: false, ..Default::default() };
        let derived = DerivedParams::new(&config);
        let mut pipeline = TxPipeline::new(config, &derived);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let blocks = pipeline.send(&derived, "A", &mut rng);
        assert_eq!(blocks.len(), 2);
    }
}
