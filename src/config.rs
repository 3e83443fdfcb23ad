//! Configuration file loading.
//!
//! The configuration lives in the platform config directory, on Linux
//! `~/.config/seedcalc/config.toml`. Every field has a default, so a missing
//! file or a partial one is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::calculator::{CalculationMode, EngineConfig, MAX_CHARS, MAX_DISPLAY_DIGITS};

const APP_DIR: &str = "seedcalc";
const CONFIG_FILENAME: &str = "config.toml";

/// Smallest digit budget that still leaves a mantissa digit in `d.dE+nnn`.
const MIN_DISPLAY_DIGITS: usize = 8;
/// An f64 carries no more significant digits than this.
const MAX_SIGNIFICANT_DIGITS: usize = 17;
const MAX_FRAME_DELAY_MS: u64 = 10_000;
/// Upper bound on `engine.max_chars`.
const MAX_INPUT_CHARS: usize = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub display: DisplaySection,
    pub replay: ReplaySection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Longest expression accepted before the engine reports an overflow.
    pub max_chars: usize,
    pub calculation_mode: CalculationMode,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
            calculation_mode: CalculationMode::Regular,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub max_display_digits: usize,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            max_display_digits: MAX_DISPLAY_DIGITS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    /// How long each replay frame stays on screen.
    pub frame_delay_ms: u64,
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self { frame_delay_ms: 250 }
    }
}

impl Config {
    /// Default location of the configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let Some(path) = Self::default_path() else {
            debug!("no config directory on this platform, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_chars = self.engine.max_chars;
        if !(1..=MAX_INPUT_CHARS).contains(&max_chars) {
            return Err(ConfigError::Invalid(format!(
                "engine.max_chars must be between 1 and {MAX_INPUT_CHARS}, got {max_chars}"
            )));
        }
        let digits = self.display.max_display_digits;
        if !(MIN_DISPLAY_DIGITS..=MAX_SIGNIFICANT_DIGITS).contains(&digits) {
            return Err(ConfigError::Invalid(format!(
                "display.max_display_digits must be between {MIN_DISPLAY_DIGITS} and \
                 {MAX_SIGNIFICANT_DIGITS}, got {digits}"
            )));
        }
        if self.replay.frame_delay_ms > MAX_FRAME_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "replay.frame_delay_ms must be at most {MAX_FRAME_DELAY_MS}"
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_chars: self.engine.max_chars,
            max_display_digits: self.display.max_display_digits,
            calculation_mode: self.engine.calculation_mode,
        }
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.replay.frame_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_chars, 100);
        assert_eq!(config.engine.calculation_mode, CalculationMode::Regular);
        assert_eq!(config.display.max_display_digits, 11);
        assert_eq!(config.frame_delay(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
        assert_eq!(config.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            calculation_mode = "demo_steps"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.calculation_mode, CalculationMode::DemoSteps);
        assert_eq!(config.engine.max_chars, 100);
        assert_eq!(config.replay.frame_delay_ms, 250);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let parsed: Result<Config, _> = toml::from_str("[engine]\ncalculation_mode = \"fast\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.engine.max_chars = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.engine.max_chars = 5_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.engine.max_chars = 1_000;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.display.max_display_digits = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.replay.frame_delay_ms = 60_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("seedcalc-test-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[display]\nmax_display_digits = 13\n[replay]\nframe_delay_ms = 0\n",
        )
        .unwrap();
        let config = Config::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.display.max_display_digits, 13);
        assert_eq!(config.frame_delay(), Duration::ZERO);
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = Path::new("/nonexistent/seedcalc/config.toml");
        assert!(matches!(
            Config::load(Some(path)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }
}
