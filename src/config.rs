use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calculator::FallbackPolicy;
use crate::error::ConfigError;
use crate::factors::FactorTable;
use crate::period::Granularity;
use crate::projection::DEFAULT_WINDOW;

pub const DEFAULT_LOG_FILTER: &str = "mine_carbon_ledger=info";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub factor_fallback: FallbackPolicy,
    /// Trailing periods used by the projection.
    pub projection_window: usize,
    pub default_granularity: Granularity,
    /// Annual rate used for scenario NPV.
    pub discount_rate: f64,
    /// JSON factor dataset; the builtin table is used when unset.
    pub factor_dataset: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            factor_fallback: FallbackPolicy::UseDefault,
            projection_window: DEFAULT_WINDOW,
            default_granularity: Granularity::Month,
            discount_rate: 0.08,
            factor_dataset: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.projection_window < 2 {
            return Err(ConfigError::Invalid("projection_window must be at least 2"));
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(ConfigError::Invalid("discount_rate must be greater than -1"));
        }
        Ok(())
    }

    /// Loads the configured factor dataset, or the builtin table.
    pub fn factor_table(&self) -> Result<FactorTable, ConfigError> {
        match &self.factor_dataset {
            Some(path) => FactorTable::from_json_str(&read(path)?),
            None => Ok(FactorTable::builtin()),
        }
    }
}
