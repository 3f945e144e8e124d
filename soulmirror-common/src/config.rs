//! Configuration loading
//!
//! The TOML file is optional. Resolution order for its location:
//! 1. Command-line argument (`--config`)
//! 2. `SOULMIRROR_CONFIG` environment variable
//! 3. `<config_dir>/soulmirror/config.toml`
//! 4. Compiled defaults
//!
//! A file that does not exist is logged and replaced by defaults. A file
//! that exists but does not parse is an error.
//!
//! ```toml
//! definitions = "/etc/soulmirror/extra.toml"
//!
//! [logging]
//! level = "debug"
//!
//! [report]
//! quote_policy = "seeded"
//! quote_seed = 7
//! jitter = true
//! jitter_amplitude = 5
//! analyzing_delay_ms = 0
//! ```

use crate::scoring::JitterPolicy;
use crate::synthesis::QuotePolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "SOULMIRROR_CONFIG";

/// Where a loaded config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Named file does not exist; defaults in use
    Missing(PathBuf),
    /// No file configured or found; defaults in use
    Defaults,
}

impl ConfigSource {
    /// Log the outcome: info for a file, warn for a missing one
    pub fn report(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config"),
            ConfigSource::Missing(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults")
            }
            ConfigSource::Defaults => debug!("No config file, using compiled defaults"),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Extra definitions file merged over the built-in table
    #[serde(default)]
    pub definitions: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Quote selection mode as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteMode {
    #[default]
    PrimaryIndex,
    Seeded,
    Random,
}

/// Report presentation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub quote_policy: QuoteMode,

    /// Seed for `quote_policy = "seeded"`
    #[serde(default)]
    pub quote_seed: Option<u64>,

    /// Perturb radar chart values
    #[serde(default)]
    pub jitter: bool,

    /// Fixed jitter seed; entropy when absent
    #[serde(default)]
    pub jitter_seed: Option<u64>,

    #[serde(default = "default_jitter_amplitude")]
    pub jitter_amplitude: u8,

    /// Pause shown while "analyzing", in milliseconds
    #[serde(default = "default_analyzing_delay_ms")]
    pub analyzing_delay_ms: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            quote_policy: QuoteMode::default(),
            quote_seed: None,
            jitter: false,
            jitter_seed: None,
            jitter_amplitude: default_jitter_amplitude(),
            analyzing_delay_ms: default_analyzing_delay_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_jitter_amplitude() -> u8 {
    5
}

fn default_analyzing_delay_ms() -> u64 {
    2000
}

impl ReportConfig {
    /// Quote policy, with an optional seed that forces seeded selection
    pub fn quote_policy(&self, seed_override: Option<u64>) -> Result<QuotePolicy> {
        if let Some(seed) = seed_override {
            return Ok(QuotePolicy::Seeded { seed });
        }
        match self.quote_policy {
            QuoteMode::PrimaryIndex => Ok(QuotePolicy::PrimaryIndex),
            QuoteMode::Random => Ok(QuotePolicy::Random),
            QuoteMode::Seeded => self
                .quote_seed
                .map(|seed| QuotePolicy::Seeded { seed })
                .ok_or_else(|| {
                    Error::Configuration(
                        "report.quote_policy = \"seeded\" requires report.quote_seed".to_string(),
                    )
                }),
        }
    }

    /// Jitter policy; a seed override pins enabled jitter to that seed
    pub fn jitter_policy(&self, seed_override: Option<u64>) -> JitterPolicy {
        if !self.jitter {
            return JitterPolicy::Disabled;
        }
        match seed_override.or(self.jitter_seed) {
            Some(seed) => JitterPolicy::Seeded {
                seed,
                amplitude: self.jitter_amplitude,
            },
            None => JitterPolicy::Entropy {
                amplitude: self.jitter_amplitude,
            },
        }
    }

    pub fn analyzing_delay(&self) -> Duration {
        Duration::from_millis(self.analyzing_delay_ms)
    }
}

impl TomlConfig {
    /// Parse and validate config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        let (config, source) = Self::read_with_source(path)?;
        source.report();
        Ok(config)
    }

    /// Like `load`, but returns where the config came from instead of logging it
    ///
    /// Hosts that set up logging from the config use this and call
    /// `ConfigSource::report` once their subscriber is installed.
    pub fn read_with_source(path: &Path) -> Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content).map_err(|e| {
            Error::Configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;

        // relative definition paths are relative to the config file
        if let (Some(definitions), Some(dir)) = (config.definitions.as_ref(), path.parent()) {
            if definitions.is_relative() {
                config.definitions = Some(dir.join(definitions));
            }
        }

        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Locate and load the config following the resolution order
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::resolve_with_source(cli_arg)?;
        source.report();
        Ok(config)
    }

    /// Locate and load the config without logging the outcome
    pub fn resolve_with_source(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_arg) {
            Some(path) => Self::read_with_source(&path),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::Configuration(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        if self.report.jitter_amplitude > 100 {
            return Err(Error::Configuration(format!(
                "jitter_amplitude must be at most 100, got {}",
                self.report.jitter_amplitude
            )));
        }
        self.report.quote_policy(None)?;
        Ok(())
    }
}

/// Config file location for the current invocation
///
/// The CLI argument and environment variable are returned even when the file
/// does not exist, so `load` can warn about it. The platform default is only
/// returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/soulmirror/config.toml` for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("soulmirror").join("config.toml"))
}
