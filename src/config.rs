use crate::error::ConfigError;
use crate::global_variables::{
    AMQP_URL, CONFIG_ENV_VAR, DEFAULT_DATA_DIR, FOREST_SEED, FOREST_TREES,
    HEURISTIC_CONFIDENCE_MAX, HEURISTIC_CONFIDENCE_MIN, HISTORY_WINDOW, SUFFICIENCY_THRESHOLD,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Knobs for the prediction engine. Defaults reproduce the documented behaviour.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PredictorConfig {
    /// Minimum window size for the learned path.
    pub sufficiency_threshold: usize,
    /// Most recent observations fetched per request.
    pub history_window: usize,
    pub forest_trees: usize,
    pub forest_seed: u64,
    /// Upper bound on rows fed to the forest. `None` trains on the whole window.
    pub max_training_rows: Option<usize>,
    pub heuristic_confidence_min: f64,
    pub heuristic_confidence_max: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: SUFFICIENCY_THRESHOLD,
            history_window: HISTORY_WINDOW,
            forest_trees: FOREST_TREES,
            forest_seed: FOREST_SEED,
            max_training_rows: None,
            heuristic_confidence_min: HEURISTIC_CONFIDENCE_MIN,
            heuristic_confidence_max: HEURISTIC_CONFIDENCE_MAX,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub amqp_url: String,
    /// Where the admin CLI writes rendered charts.
    pub chart_dir: PathBuf,
    pub predictor: PredictorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            amqp_url: AMQP_URL.to_string(),
            chart_dir: PathBuf::from("."),
            predictor: PredictorConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Loads the file named by `TRAFFIC_CONFIG`, or falls back to defaults
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => {
                log::info!("loading config from {}", path);
                Self::load(&path)
            }
            Err(_) => Ok(Self::default()),
        }
    }
}
