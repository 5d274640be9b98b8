//! Olivia MFSK soft-modem core.
//!
//! This crate implements the digital signal processing and coding
//! pipeline of an Olivia MFSK modem: character-block redundancy coding
//! over a Walsh-Hadamard transform, XOR scrambling, bit interleaving,
//! Gray-coded tone assignment, and shaped-sinusoid MFSK synthesis on
//! transmit; windowed spectral tone detection and block-rolling
//! resynchronization on receive. The audio device, terminal UI,
//! configuration loading, and PTT bridge to an external radio-control
//! program are external collaborators wired in by a host crate (see
//! `audio_io` and `ptt` for the seams).

pub mod audio_io;
pub mod codec;
pub mod config;
pub mod controller;
pub mod dsp;
pub mod errors;
pub mod event;
pub mod logging;
pub mod ptt;
pub mod rx_pipeline;
pub mod tx_pipeline;

pub use config::ModemConfig;
pub use controller::Controller;
pub use errors::{ConfigError, OliviaError};
pub use event::{Event, ModemState};
