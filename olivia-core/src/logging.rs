//! Structured logging for the modem core.
//!
//! No `log`/`tracing` facade: the core keeps its own capped ring buffer
//! of entries so a host application (CLI, future bindings) can pull
//! them out and render them however it likes, without pulling in a
//! global logging runtime.

use std::fmt;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,

    /// Per-subsystem enable flags.
    pub enable_tx: bool,
    pub enable_rx: bool,
    pub enable_sync: bool,
    pub enable_audio: bool,

    /// Maximum number of log entries retained (oldest dropped first).
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_tx: true,
            enable_rx: true,
            enable_sync: true,
            enable_audio: true,
            max_entries: 1000,
        }
    }
}

impl LogConfig {
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            max_entries: 5000,
            ..Default::default()
        }
    }

    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_tx: false,
            enable_rx: false,
            enable_sync: false,
            enable_audio: false,
            max_entries: 100,
        }
    }

    pub fn disabled() -> Self {
        Self {
            level: LogLevel::Error,
            enable_tx: false,
            enable_rx: false,
            enable_sync: false,
            enable_audio: false,
            max_entries: 0,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger that collects structured log entries in a capped ring buffer.
#[derive(Debug, Clone)]
pub struct ModemLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl ModemLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(1000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "TX" | "FRAMING" | "TONE" => self.config.enable_tx,
            "RX" | "DETECT" | "BLOCK" => self.config.enable_rx,
            "SYNC" | "ROLL" => self.config.enable_sync,
            "AUDIO" | "DEVICE" => self.config.enable_audio,
            _ => true,
        };

        if !enabled {
            return;
        }

        let entry = LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        };

        if self.config.max_entries > 0 {
            if self.entries.len() >= self.config.max_entries {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        #[cfg(any(test, debug_assertions))]
        {
            eprintln!("[{}] {}: {}", level, subsystem, message);
        }
    }

    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn error(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, subsystem, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.subsystem == subsystem).collect()
    }

    pub fn entries_at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level >= level).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ModemLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for ModemLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .entries
            .iter()
            .map(|e| format!("[{}] {}: {}", e.level, e.subsystem, e.message))
            .collect::<Vec<_>>()
            .join("\n");
        write!(f, "{}", rendered)
    }
}
