//! Serializable backtest configuration (TOML).
//!
//! ```toml
//! [backtest]
//! symbol = "GC"
//! data = "gold_futures_data.csv"
//! initial_capital = 100000.0
//! commission = 0.001
//!
//! [strategy]
//! fast_period = 50
//! slow_period = 200
//! risk_fraction = 0.02
//! stop_distance_fraction = 0.03
//! trailing_stop_fraction = 0.03
//! ```

use crosstrail_core::RiskConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating a backtest configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy parameters: {0}")]
    Strategy(#[from] crosstrail_core::ConfigError),

    #[error("initial_capital must be positive, got {0}")]
    InitialCapital(f64),

    #[error("commission must be in [0, 1), got {0}")]
    Commission(f64),
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    /// CSV bar file. Optional when running on synthetic data.
    pub data: Option<PathBuf>,
    pub initial_capital: f64,
    /// Commission as a fraction of traded value, charged on every fill.
    pub commission: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "GC".into(),
            data: None,
            initial_capital: 100_000.0,
            commission: 0.001,
        }
    }
}

/// Full configuration for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: RiskConfig,
}

impl BacktestConfig {
    /// Load a configuration from a TOML file.
    ///
    /// A relative `data` path is resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(data), Some(dir)) = (config.backtest.data.as_ref(), path.parent()) {
            if data.is_relative() {
                config.backtest.data = Some(dir.join(data));
            }
        }
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        let capital = self.backtest.initial_capital;
        if capital.is_nan() || capital <= 0.0 {
            return Err(ConfigError::InitialCapital(capital));
        }
        let commission = self.backtest.commission;
        if !(0.0..1.0).contains(&commission) {
            return Err(ConfigError::Commission(commission));
        }
        Ok(())
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a run ID. BLAKE3 over the
    /// canonical JSON keeps it stable across builds and platforms.
    pub fn run_id(&self) -> String {
        let json = serde_json::json!({
            "symbol": self.backtest.symbol,
            "data": self.backtest.data,
            "initial_capital": self.backtest.initial_capital,
            "commission": self.backtest.commission,
            "strategy": self.strategy,
        });
        let hash = blake3::hash(json.to_string().as_bytes());
        hash.to_hex()[..16].to_string()
    }
}
