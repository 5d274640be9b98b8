//! CLI-specific configuration structures, loaded from TOML with an
//! `include` deep-merge.

use color_eyre::eyre::{Context, Result};
use olivia_core::ModemConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::logging::{LogFormat, LogLevel, LogTarget};

/// Deep merge JSON values: override takes precedence over base. Objects
/// merge key-by-key; arrays and scalars are replaced wholesale.
fn merge_json_values(base: &mut JsonValue, override_val: JsonValue) {
    match (base, override_val) {
        (JsonValue::Object(base_map), JsonValue::Object(override_map)) => {
            for (key, value) in override_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    merge_json_values(base_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_val, override_val) => {
            *base_val = override_val;
        }
    }
}

/// Accepts either a single string or an array of strings for `include`.
fn deserialize_include_optional<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    let opt: Option<StringOrVec> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(Vec::new()),
        Some(StringOrVec::String(s)) => Ok(vec![s]),
        Some(StringOrVec::Vec(v)) => Ok(v),
    }
}

/// Complete CLI configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Optional path(s) to other config file(s) to include (relative to
    /// this config's directory). Supports a single string or an array.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_include_optional")]
    pub include: Vec<String>,

    /// Core modem parameters (sample rate, tone count, bandwidth, ...).
    #[serde(default)]
    pub modem: ModemConfig,

    /// Message to encode, used when `--message` is not given.
    #[serde(default)]
    pub message: String,

    /// Terminal/runtime configuration (device selection, WAV I/O, logging).
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            modem: ModemConfig::default(),
            message: String::new(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// Runtime/terminal configuration: device selection and file I/O paths
/// for the batch encode/decode paths, plus logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Output WAV path for `encode` (overridden by `-w`/`--wav-output`).
    #[serde(default)]
    pub wav_output: Option<PathBuf>,

    /// Input WAV path for `decode` (overridden by `-i`/`--wav-input`).
    #[serde(default)]
    pub wav_input: Option<PathBuf>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            wav_output: None,
            wav_input: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging output configuration, consumed by `StructuredLogger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_target")]
    pub target: LogTarget,

    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_target() -> LogTarget {
    LogTarget::Stderr
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            file_path: None,
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a TOML file, recursively resolving
    /// `include` directives (relative to each file's own directory)
    /// before merging the requested file's own keys on top last.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config_toml: toml::Value =
            toml::from_str(&content).wrap_err("Failed to parse TOML configuration")?;
        let mut config_json =
            serde_json::to_value(&config_toml).wrap_err("Failed to convert TOML to JSON")?;

        let includes = match config_json.get("include") {
            Some(JsonValue::String(s)) => vec![s.clone()],
            Some(JsonValue::Array(arr)) => {
                arr.iter().filter_map(|v| v.as_str().map(String::from)).collect()
            }
            _ => Vec::new(),
        };

        if let JsonValue::Object(ref mut map) = config_json {
            map.remove("include");
        }

        let mut base_json =
            serde_json::to_value(Self::default()).wrap_err("Failed to create default config")?;

        for include_path in &includes {
            let include_full_path = if Path::new(include_path).is_absolute() {
                PathBuf::from(include_path)
            } else {
                path.parent().unwrap_or_else(|| Path::new(".")).join(include_path)
            };

            let included_config = Self::from_file(&include_full_path)
                .wrap_err_with(|| format!("Failed to load included config: {}", include_full_path.display()))?;
            let included_json = serde_json::to_value(&included_config)
                .wrap_err("Failed to convert included config to JSON")?;
            merge_json_values(&mut base_json, included_json);
        }

        merge_json_values(&mut base_json, config_json);

        let config: CliConfig =
            serde_json::from_value(base_json).wrap_err("Failed to parse final configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_modem_default_parameters() {
        let config = CliConfig::default();
        assert_eq!(config.modem.sample_rate, 8000);
        assert_eq!(config.modem.symbols, 32);
    }

    #[test]
    fn include_merge_prefers_the_including_file() {
        let dir = tempfile_dir();
        let base_path = dir.join("base.toml");
        std::fs::write(&base_path, "message = \"BASE\"\n[modem]\nattenuation = 10\n").unwrap();

        let top_path = dir.join("top.toml");
        std::fs::write(&top_path, "include = \"base.toml\"\nmessage = \"TOP\"\n").unwrap();

        let config = CliConfig::from_file(&top_path).unwrap();
        assert_eq!(config.message, "TOP");
        assert_eq!(config.modem.attenuation, 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "olivia-cli-config-test-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
