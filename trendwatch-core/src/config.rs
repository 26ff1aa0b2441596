//! Monitor configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the stock
//! BTCUSD 5-minute monitor checked every 15 minutes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Resolution, DEFAULT_BASE_URL};
use crate::domain::Symbol;
use crate::signals::{SignalGenerator, SignalMode, VolumeClassifier};

/// Environment variable consulted when `[telegram].bot_token` is absent.
pub const TELEGRAM_TOKEN_ENV: &str = "TRENDWATCH_TELEGRAM_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub symbol: Symbol,
    pub resolution: Resolution,
    /// Candles requested per cycle.
    pub fetch_limit: usize,
    pub check_interval_seconds: u64,
    /// Ring the terminal bell on every emitted alert.
    pub beep: bool,
    pub indicator: IndicatorConfig,
    pub volume: VolumeConfig,
    pub storage: StorageConfig,
    pub telegram: TelegramConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// ATR window shared by both Supertrends.
    pub length: usize,
    /// Tight band multiplier.
    pub multiplier1: f64,
    /// Wide band multiplier.
    pub multiplier2: f64,
    pub signal_mode: SignalMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub rolling_window: usize,
    pub spike_ratio: f64,
    pub drop_ratio: f64,
    /// Force NONE when volume is below `min_ratio * average`. Disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: PathBuf,
    pub journal_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSD".into(),
            resolution: Resolution::FIVE_MINUTES,
            fetch_limit: 200,
            check_interval_seconds: 900,
            beep: true,
            indicator: IndicatorConfig::default(),
            volume: VolumeConfig::default(),
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            length: 10,
            multiplier1: 1.0,
            multiplier2: 3.0,
            signal_mode: SignalMode::State,
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            rolling_window: 20,
            spike_ratio: 1.5,
            drop_ratio: 0.5,
            min_ratio: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("last_signal_state.json"),
            journal_file: PathBuf::from("signals.csv"),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_seconds: 10,
        }
    }
}

impl TelegramConfig {
    /// Token from the config file, else from `TRENDWATCH_TELEGRAM_TOKEN`.
    pub fn resolve_token(&self) -> Option<String> {
        self.bot_token
            .clone()
            .or_else(|| std::env::var(TELEGRAM_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl MonitorConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Shortest series the check cycle will evaluate: `max(length, window) + 1`.
    pub fn min_bars(&self) -> usize {
        self.indicator.length.max(self.volume.rolling_window) + 1
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn signal_generator(&self) -> SignalGenerator {
        SignalGenerator::new(self.indicator.signal_mode)
    }

    pub fn volume_classifier(&self) -> VolumeClassifier {
        VolumeClassifier::new(
            self.volume.rolling_window,
            self.volume.spike_ratio,
            self.volume.drop_ratio,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let ind = &self.indicator;
        let vol = &self.volume;

        if self.symbol.trim().is_empty() {
            return invalid("symbol must not be empty".into());
        }
        if ind.length == 0 {
            return invalid("indicator.length must be at least 1".into());
        }
        for (name, m) in [("multiplier1", ind.multiplier1), ("multiplier2", ind.multiplier2)] {
            if !m.is_finite() || m <= 0.0 {
                return invalid(format!("indicator.{name} must be positive, got {m}"));
            }
        }
        if ind.multiplier1 >= ind.multiplier2 {
            return invalid(format!(
                "indicator.multiplier1 ({}) must be below multiplier2 ({})",
                ind.multiplier1, ind.multiplier2
            ));
        }
        if vol.rolling_window == 0 {
            return invalid("volume.rolling_window must be at least 1".into());
        }
        if !(vol.spike_ratio.is_finite() && vol.spike_ratio > 1.0) {
            return invalid(format!(
                "volume.spike_ratio must be above 1.0, got {}",
                vol.spike_ratio
            ));
        }
        if !(vol.drop_ratio > 0.0 && vol.drop_ratio < 1.0) {
            return invalid(format!(
                "volume.drop_ratio must be in (0, 1), got {}",
                vol.drop_ratio
            ));
        }
        if let Some(min) = vol.min_ratio {
            if !(min.is_finite() && min > 0.0) {
                return invalid(format!("volume.min_ratio must be positive, got {min}"));
            }
        }
        if self.check_interval_seconds == 0 {
            return invalid("check_interval_seconds must be at least 1".into());
        }
        if self.fetch_limit < self.min_bars() {
            return invalid(format!(
                "fetch_limit {} is below the {} bars the indicators need",
                self.fetch_limit,
                self.min_bars()
            ));
        }
        if self.feed.timeout_seconds == 0 {
            return invalid("feed.timeout_seconds must be at least 1".into());
        }
        if self.telegram.enabled {
            if self.telegram.chat_id.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return invalid("telegram.enabled requires telegram.chat_id".into());
            }
            if self.telegram.resolve_token().is_none() {
                return invalid(format!(
                    "telegram.enabled requires telegram.bot_token or {TELEGRAM_TOKEN_ENV}"
                ));
            }
        }
        Ok(())
    }
}
