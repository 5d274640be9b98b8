//! Configuration for the Olivia modem and the derived parameters
//! computed once from it.

use crate::dsp::scrambler::Scrambler;
use crate::dsp::tone::ToneSynth;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-tunable modem parameters.
///
/// Every invariant listed below is rejected by `validate()` except
/// `attenuation < 1`, which is silently clamped to `1` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModemConfig {
    /// Audio sample rate, in Hz.
    pub sample_rate: u32,

    /// Attenuation divisor applied to the transmitted waveform.
    pub attenuation: u32,

    /// Minimum WHT-peak magnitude for a row to be considered decoded
    /// with confidence.
    pub block_threshold: f32,

    /// Whether to transmit a preamble/tail tone sequence around data.
    pub preamble: bool,

    /// Centre frequency of the occupied band, in Hz.
    pub centre_freq: u32,

    /// Tone alphabet size; must be a power of two in `[2, 256]`.
    pub symbols: u32,

    /// Total occupied bandwidth, in Hz.
    pub bandwidth: u32,

    /// When `true` (default), the RX tone-bin lookup preserves the
    /// classic Olivia decoders' off-by-one bin alignment bit-exactly.
    /// When `false`, the corrected (centered) bin formula is used
    /// instead.
    pub strict_bin_alignment: bool,

    /// When `true`, `block_threshold` is compared against the RMS-
    /// normalized WHT peak magnitude rather than the raw magnitude.
    pub auto_scale_threshold: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            attenuation: 30,
            block_threshold: 24.0,
            preamble: true,
            centre_freq: 1500,
            symbols: 32,
            bandwidth: 1000,
            strict_bin_alignment: true,
            auto_scale_threshold: false,
        }
    }
}

impl ModemConfig {
    /// Validates the configuration, clamping `attenuation` up to `1`
    /// in place, and rejecting every other invariant violation as a
    /// `ConfigError`.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.attenuation < 1 {
            self.attenuation = 1;
        }

        if self.symbols < 2 || self.symbols > 256 {
            return Err(ConfigError::SymbolsOutOfRange { symbols: self.symbols });
        }

        if !self.symbols.is_power_of_two() {
            return Err(ConfigError::SymbolsNotPowerOfTwo { symbols: self.symbols });
        }

        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate { sample_rate: self.sample_rate });
        }

        if self.bandwidth == 0 {
            return Err(ConfigError::InvalidBandwidth { bandwidth: self.bandwidth });
        }

        if (self.centre_freq as i64) - (self.bandwidth as i64 / 2) < 0 {
            return Err(ConfigError::CentreFrequencyTooLow {
                centre_freq: self.centre_freq,
                bandwidth: self.bandwidth,
            });
        }

        if !self.block_threshold.is_finite() || self.block_threshold < 0.0 {
            return Err(ConfigError::InvalidBlockThreshold { threshold: self.block_threshold });
        }

        Ok(())
    }

    /// Bits encoded per symbol (`log2(symbols)`).
    pub fn spb(&self) -> u32 {
        self.symbols.trailing_zeros()
    }

    /// Frequency separation between adjacent tones, in Hz.
    pub fn fsep(&self) -> f32 {
        self.bandwidth as f32 / self.symbols as f32
    }

    /// Time separation between tones, in samples.
    pub fn wlen(&self) -> usize {
        (self.sample_rate as f32 / self.fsep()).ceil() as usize
    }
}

impl fmt::Display for ModemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- CONFIG -----")?;
        writeln!(f, "Sample Rate: {}", self.sample_rate)?;
        writeln!(f, "Attenuation: {}", self.attenuation)?;
        writeln!(f, "Block Threshold: {}", self.block_threshold)?;
        writeln!(f, "----- PARAMS -----")?;
        writeln!(f, "Preamble: {}", self.preamble)?;
        writeln!(f, "Centre Freq: {}Hz", self.centre_freq)?;
        writeln!(f, "Tones: {}", self.symbols)?;
        write!(f, "Bandwidth: {}Hz", self.bandwidth)
    }
}

/// Parameters and caches derived once from a validated `ModemConfig`,
/// shared by the TX and RX pipelines so neither ever recomputes the
/// scrambler key rolls, the shaping window, or the per-row bit counts.
pub struct DerivedParams {
    pub spb: u32,
    pub fsep: f32,
    pub wlen: usize,
    pub scrambler: Scrambler,
    pub tone_synth: ToneSynth,
}

impl DerivedParams {
    pub fn new(config: &ModemConfig) -> Self {
        let spb = config.spb();
        let fsep = config.fsep();
        let wlen = config.wlen();
        Self {
            spb,
            fsep,
            wlen,
            scrambler: Scrambler::new(spb as usize),
            tone_synth: ToneSynth::new(
                config.centre_freq as f32,
                config.bandwidth as f32,
                fsep,
                config.sample_rate,
                wlen,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_modem() {
        let config = ModemConfig::default();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.symbols, 32);
        assert_eq!(config.spb(), 5);
    }

    #[test]
    fn validate_clamps_low_attenuation() {
        let mut config = ModemConfig { attenuation: 0, ..Default::default() };
        config.validate().unwrap();
        assert_eq!(config.attenuation, 1);
    }

    #[test]
    fn validate_rejects_non_power_of_two_symbols() {
        let mut config = ModemConfig { symbols: 30, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::SymbolsNotPowerOfTwo { .. })));
    }

    #[test]
    fn validate_rejects_centre_freq_too_low() {
        let mut config = ModemConfig { centre_freq: 100, bandwidth: 1000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::CentreFrequencyTooLow { .. })));
    }

    #[test]
    fn derived_params_spb_matches_config() {
        let config = ModemConfig::default();
        let derived = DerivedParams::new(&config);
        assert_eq!(derived.spb, 5);
        assert_eq!(derived.fsep, 1000.0 / 32.0);
    }
}
