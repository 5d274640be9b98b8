mod audio;
mod config;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use audio::{CpalAudioInput, CpalAudioOutput, WavFileInput, WavFileOutput};
use config::CliConfig;
use indicatif::{ProgressBar, ProgressStyle};
use logging::{state_name, LogEvent, MessageEvent, StateChangeEvent, StructuredLogger, SummaryEvent};
use olivia_core::audio_io::{AudioInput, AudioOutput};
use olivia_core::config::DerivedParams;
use olivia_core::event::Event;
use olivia_core::rx_pipeline::RxPipeline;
use olivia_core::tx_pipeline::TxPipeline;
use olivia_core::Controller;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Olivia MFSK soft-modem command line driver", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose diagnostic output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a message to a WAV file through the transmit pipeline.
    Encode {
        /// Message to encode (overrides the config's `message`).
        message: Option<String>,

        /// Output WAV path (overrides the config's `terminal.wav_output`).
        #[arg(short = 'w', long)]
        wav_output: Option<PathBuf>,
    },

    /// Recover text from a WAV file through the receive pipeline.
    Decode {
        /// Input WAV path (overrides the config's `terminal.wav_input`).
        #[arg(short = 'i', long)]
        wav_input: Option<PathBuf>,
    },

    /// Run the modem live against the default sound devices until Ctrl-C.
    Listen {
        /// Optional message to transmit once at startup.
        message: Option<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => {
            CliConfig::from_file(path).wrap_err_with(|| format!("failed to load config from {path}"))?
        }
        None => CliConfig::default(),
    };

    match args.command {
        Command::Encode { message, wav_output } => {
            if let Some(message) = message {
                config.message = message;
            }
            if let Some(path) = wav_output {
                config.terminal.wav_output = Some(path);
            }
            let mut logger = StructuredLogger::new(config.terminal.logging.clone())?;
            run_encode(&config, &mut logger, args.verbose)
        }
        Command::Decode { wav_input } => {
            if let Some(path) = wav_input {
                config.terminal.wav_input = Some(path);
            }
            let mut logger = StructuredLogger::new(config.terminal.logging.clone())?;
            run_decode(&config, &mut logger, args.verbose)
        }
        Command::Listen { message } => run_listen(&config, message),
    }
}

fn run_encode(config: &CliConfig, logger: &mut StructuredLogger, verbose: bool) -> Result<()> {
    let wav_path = config
        .terminal
        .wav_output
        .clone()
        .ok_or_else(|| color_eyre::eyre::eyre!("encode requires --wav-output or terminal.wav_output in config"))?;

    let mut modem_config = config.modem.clone();
    modem_config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("invalid modem configuration: {e}"))?;
    let derived = DerivedParams::new(&modem_config);
    let mut tx = TxPipeline::new(modem_config.clone(), &derived);
    let mut rng = StdRng::from_entropy();

    logger.log(LogEvent::Info {
        message: format!("encoding \"{}\" to {}", config.message, wav_path.display()),
    })?;

    let blocks = tx.send(&derived, &config.message, &mut rng);
    let mut writer = WavFileOutput::create(&wav_path, modem_config.sample_rate)
        .map_err(|e| color_eyre::eyre::eyre!("failed to create {}: {e}", wav_path.display()))?;

    let progress = ProgressBar::new(blocks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} blocks").unwrap_or(ProgressStyle::default_bar()),
    );

    let mut samples_written = 0usize;
    for block in &blocks {
        writer
            .write(block)
            .map_err(|e| color_eyre::eyre::eyre!("failed to write wav samples: {e}"))?;
        samples_written += block.len();
        progress.inc(1);
    }
    progress.finish_and_clear();

    writer
        .finalize()
        .map_err(|e| color_eyre::eyre::eyre!("failed to finalize {}: {e}", wav_path.display()))?;

    logger.log(LogEvent::Summary(SummaryEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        messages_sent: 1,
        messages_received: 0,
        samples_written,
    }))?;

    if verbose {
        logger.log(LogEvent::Info {
            message: format!("{} blocks, {} samples total", blocks.len(), samples_written),
        })?;
    }

    Ok(())
}

fn run_decode(config: &CliConfig, logger: &mut StructuredLogger, verbose: bool) -> Result<()> {
    let wav_path = config
        .terminal
        .wav_input
        .clone()
        .ok_or_else(|| color_eyre::eyre::eyre!("decode requires --wav-input or terminal.wav_input in config"))?;

    let mut modem_config = config.modem.clone();
    modem_config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("invalid modem configuration: {e}"))?;
    let derived = DerivedParams::new(&modem_config);
    let mut rx = RxPipeline::new(modem_config.clone(), &derived);
    let mut input = WavFileInput::open(&wav_path)
        .map_err(|e| color_eyre::eyre::eyre!("failed to open {}: {e}", wav_path.display()))?;

    logger.log(LogEvent::Info {
        message: format!("decoding {}", wav_path.display()),
    })?;

    let total_samples = {
        let reader = hound::WavReader::open(&wav_path)
            .wrap_err_with(|| format!("failed to open {}", wav_path.display()))?;
        reader.len() as usize
    };

    let mut messages_received = 0usize;
    let mut window = vec![0f32; derived.wlen];
    // One block's worth of extra windows past the file's own length
    // lets a trailing block still roll into alignment and decode.
    let max_windows = total_samples / derived.wlen + 64;
    for _ in 0..max_windows {
        input
            .read(&mut window, Duration::from_millis(0))
            .map_err(|e| color_eyre::eyre::eyre!("wav read failed: {e}"))?;
        if let Some(decoded) = rx.push_window(&derived, &window) {
            if !decoded.text.is_empty() {
                logger.log(LogEvent::MessageReceived(MessageEvent {
                    timestamp: chrono::Utc::now(),
                    message: decoded.text,
                }))?;
                messages_received += 1;
            }
        }
    }

    logger.log(LogEvent::Summary(SummaryEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        messages_sent: 0,
        messages_received,
        samples_written: 0,
    }))?;

    if verbose {
        logger.log(LogEvent::Info {
            message: format!("scanned {max_windows} symbol windows"),
        })?;
    }

    Ok(())
}

fn run_listen(config: &CliConfig, message: Option<String>) -> Result<()> {
    let mut modem_config = config.modem.clone();
    modem_config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("invalid modem configuration: {e}"))?;
    let derived = DerivedParams::new(&modem_config);

    let input = Box::new(
        CpalAudioInput::open(modem_config.sample_rate, derived.wlen)
            .map_err(|e| color_eyre::eyre::eyre!("failed to open input device: {e}"))?,
    );
    let output = Box::new(
        CpalAudioOutput::open(modem_config.sample_rate, 64 * derived.wlen)
            .map_err(|e| color_eyre::eyre::eyre!("failed to open output device: {e}"))?,
    );

    let logger = Arc::new(Mutex::new(StructuredLogger::new(config.terminal.logging.clone())?));
    let logger_for_events = Arc::clone(&logger);

    let mut controller = Controller::new(modem_config, input, output, move |event| {
        let mut logger = logger_for_events.lock().expect("logger mutex poisoned");
        let _ = match event {
            Event::StateChanged(state) => logger.log(LogEvent::StateChanged(StateChangeEvent {
                timestamp: chrono::Utc::now(),
                state: state_name(state).to_string(),
            })),
            Event::MessageReceived(text) => logger.log(LogEvent::MessageReceived(MessageEvent {
                timestamp: chrono::Utc::now(),
                message: text,
            })),
        };
    })
    .map_err(|e| color_eyre::eyre::eyre!("failed to construct controller: {e}"))?;

    controller.start().map_err(|e| color_eyre::eyre::eyre!("failed to start modem: {e}"))?;

    let outgoing = message.filter(|m| !m.is_empty()).or_else(|| {
        (!config.message.is_empty()).then(|| config.message.clone())
    });
    if let Some(outgoing) = outgoing {
        controller
            .send(&outgoing)
            .map_err(|e| color_eyre::eyre::eyre!("send failed: {e}"))?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("received Ctrl-C, shutting down");
        stop_for_handler.store(true, Ordering::SeqCst);
    })
    .wrap_err("failed to set Ctrl-C handler")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or(ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("listening (state: {})", state_name(controller.state())));

    while !stop.load(Ordering::SeqCst) {
        spinner.set_message(format!("listening (state: {})", state_name(controller.state())));
        spinner.tick();
        std::thread::sleep(Duration::from_millis(100));
    }
    spinner.finish_and_clear();

    controller.stop();
    logger.lock().expect("logger mutex poisoned").log(LogEvent::Info {
        message: "modem stopped".to_string(),
    })?;
    Ok(())
}
