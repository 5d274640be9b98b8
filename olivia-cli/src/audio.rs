//! `cpal`-backed device bindings for `olivia-core`'s `AudioInput` /
//! `AudioOutput` traits, plus a WAV-file pair for headless batch runs.
//!
//! The modem core is audio-backend-agnostic (see `olivia_core::audio_io`);
//! this module is the only place in the workspace that talks to `cpal`
//! or `hound` directly.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use olivia_core::audio_io::{AudioInput, AudioOutput};
use olivia_core::errors::AudioError;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::path::Path;
use std::time::{Duration, Instant};

/// Picks the default input device and opens a mono `f32` stream at
/// `sample_rate`, backed by a ring buffer the stream callback fills and
/// `CpalAudioInput::read` drains with a poll-and-sleep loop (the trait
/// contract is a blocking read with a timeout, not a callback).
pub struct CpalAudioInput {
    consumer: ringbuf::HeapCons<f32>,
    _stream: Stream,
}

impl CpalAudioInput {
    pub fn open(sample_rate: u32, wlen: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let config = mono_config(&device, sample_rate, true)?;
        let ring = HeapRb::<f32>::new(wlen * 32);
        let (mut producer, consumer) = ring.split();

        let channels = config.channels as usize;
        let err_fn = |err| eprintln!("input stream error: {err}");

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let mono = frame.iter().copied().sum::<f32>() / channels as f32;
                        let _ = producer.try_push(mono);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamBuildFailed { reason: e.to_string() })?;

        stream
            .play()
            .map_err(|e| AudioError::StreamBuildFailed { reason: e.to_string() })?;

        Ok(Self { consumer, _stream: stream })
    }
}

impl AudioInput for CpalAudioInput {
    fn read(&mut self, buffer: &mut [f32], timeout: Duration) -> Result<(), AudioError> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0usize;
        while filled < buffer.len() {
            filled += self.consumer.pop_slice(&mut buffer[filled..]);
            if filled < buffer.len() {
                if Instant::now() >= deadline {
                    return Err(AudioError::ReadTimeout(timeout));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }
}

/// Default output device driven by a ring buffer: `write()` (called
/// from the controller's output-feeder thread) pushes whole blocks in,
/// blocking until they fit; the `cpal` output callback drains it and
/// pads with silence on underrun.
pub struct CpalAudioOutput {
    producer: ringbuf::HeapProd<f32>,
    _stream: Stream,
}

impl CpalAudioOutput {
    pub fn open(sample_rate: u32, block_len: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let config = mono_config(&device, sample_rate, false)?;
        let ring = HeapRb::<f32>::new(block_len * 4);
        let (producer, mut consumer) = ring.split();

        let channels = config.channels as usize;
        let err_fn = |err| eprintln!("output stream error: {err}");

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        for slot in frame {
                            *slot = sample;
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamBuildFailed { reason: e.to_string() })?;

        stream
            .play()
            .map_err(|e| AudioError::StreamBuildFailed { reason: e.to_string() })?;

        Ok(Self { producer, _stream: stream })
    }
}

impl AudioOutput for CpalAudioOutput {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        let mut offset = 0;
        while offset < samples.len() {
            offset += self.producer.push_slice(&samples[offset..]);
            if offset < samples.len() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }
}

/// Finds a supported mono-or-wider `f32` config at exactly
/// `sample_rate`; `cpal` devices rarely expose a true mono config, so
/// this requests the narrowest channel count the device allows and
/// mixes down (input) or broadcasts (output) in the stream callback.
fn mono_config(device: &Device, sample_rate: u32, input: bool) -> Result<StreamConfig, AudioError> {
    let mut configs = if input {
        device
            .supported_input_configs()
            .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?
            .collect::<Vec<_>>()
    } else {
        device
            .supported_output_configs()
            .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?
            .collect::<Vec<_>>()
    };
    configs.sort_by_key(|c| c.channels());

    let range = configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .find(|c| {
            c.min_sample_rate().0 <= sample_rate && sample_rate <= c.max_sample_rate().0
        })
        .ok_or_else(|| AudioError::UnsupportedConfig {
            reason: format!("no f32 stream config supports {sample_rate} Hz"),
        })?;

    Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)).into())
}

/// Reads an entire mono `f32` WAV file into memory and serves it
/// sample-by-sample, for reproducible offline decode runs. Samples past
/// the end of the file read as silence rather than erroring, matching
/// the live-device contract of never blocking forever.
pub struct WavFileInput {
    samples: std::collections::VecDeque<f32>,
}

impl WavFileInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?
            }
        };
        Ok(Self { samples: samples.into() })
    }
}

impl AudioInput for WavFileInput {
    fn read(&mut self, buffer: &mut [f32], _timeout: Duration) -> Result<(), AudioError> {
        for slot in buffer.iter_mut() {
            *slot = self.samples.pop_front().unwrap_or(0.0);
        }
        Ok(())
    }
}

/// Writes every block handed to it straight through to a WAV file, used
/// for the `encode` subcommand's batch rendering path.
pub struct WavFileOutput {
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
}

impl WavFileOutput {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?;
        Ok(Self { writer })
    }

    pub fn finalize(self) -> Result<(), AudioError> {
        self.writer
            .finalize()
            .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })
    }
}

impl AudioOutput for WavFileOutput {
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        for &s in samples {
            self.writer
                .write_sample(s)
                .map_err(|e| AudioError::UnsupportedConfig { reason: e.to_string() })?;
        }
        Ok(())
    }
}
