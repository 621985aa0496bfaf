//! Pipeline configuration

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a single training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed shared by downsampling, the train/test split and every backend
    pub random_state: u64,
    /// Held-out fraction
    pub test_size: f64,
    /// Rows kept when the diagnostics variant downsamples
    pub max_rows: usize,
    /// Run the richer variant (downsampling + diagnostic artifacts)
    pub diagnostics: bool,
    /// Number of future months projected by the forecast
    pub forecast_horizon: usize,
    /// Folds used by the learning curve
    pub learning_curve_folds: usize,
    /// Training-set size fractions evaluated by the learning curve
    pub learning_curve_sizes: Vec<f64>,
    /// Bins of the residual histogram
    pub histogram_bins: usize,
    /// Number of held-out predictions echoed in the result
    pub sample_predictions: usize,
    /// Permutations drawn per explained row for feature attribution
    pub shap_samples: usize,
    /// Held-out rows explained for feature attribution
    pub shap_max_rows: usize,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            test_size: 0.2,
            max_rows: 5000,
            diagnostics: false,
            forecast_horizon: 5,
            learning_curve_folds: 3,
            learning_curve_sizes: vec![0.1, 0.55, 1.0],
            histogram_bins: 20,
            sample_predictions: 5,
            shap_samples: 20,
            shap_max_rows: 50,
            chart_width: 640,
            chart_height: 480,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `INSIGHT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(rows) = env_parse::<usize>("INSIGHT_MAX_ROWS") {
            config.max_rows = rows;
        }
        if let Some(seed) = env_parse::<u64>("INSIGHT_RANDOM_STATE") {
            config.random_state = seed;
        }
        if let Some(diagnostics) = env_parse::<bool>("INSIGHT_DIAGNOSTICS") {
            config.diagnostics = diagnostics;
        }
        config
    }

    /// Enable the diagnostics variant
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Set downsampling cap
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Set held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(InsightError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.max_rows == 0 {
            return Err(InsightError::ConfigError("max_rows must be positive".to_string()));
        }
        if self.learning_curve_folds < 2 {
            return Err(InsightError::ConfigError(
                "learning_curve_folds must be at least 2".to_string(),
            ));
        }
        if self.learning_curve_sizes.iter().any(|&f| !(f > 0.0 && f <= 1.0)) {
            return Err(InsightError::ConfigError(
                "learning_curve_sizes must lie in (0, 1]".to_string(),
            ));
        }
        if self.histogram_bins == 0 || self.chart_width == 0 || self.chart_height == 0 {
            return Err(InsightError::ConfigError(
                "histogram_bins and chart dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Process-wide settings, applied once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads for the numeric backends
    pub n_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            n_threads: env_parse::<usize>("INSIGHT_THREADS")
                .filter(|&n| n > 0)
                .unwrap_or(2),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
