//! Pipeline configuration document.
//!
//! Settings that are not per-column live here and load from a JSON file.
//! Everything that affects fitted values (sentinels, the impute rule
//! threshold) is copied into the Stats artifact at fit time, so a loaded
//! Stats document never depends on the config of the process replaying it.

use crate::clean::coerce::CoercionSettings;
use crate::error::{PipelineError, Result, ResultExt as _};
use crate::schema::credit::{DEFAULT_SENTINELS, LABEL_COLUMN};
use crate::stats::fitter::DEFAULT_ROBUST_MEAN_MAX_CV;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How raw cells are coerced
    #[serde(default)]
    pub coercion: CoercionSettings,

    /// Mean is used for robust-mean-eligible columns only when `std / |mean|`
    /// is strictly below this value
    #[serde(default = "default_max_cv")]
    pub robust_mean_max_cv: f64,

    /// Run row transforms on the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Kept categorical column emitted as the supervised label
    #[serde(default)]
    pub label_column: Option<String>,
}

fn default_max_cv() -> f64 {
    DEFAULT_ROBUST_MEAN_MAX_CV
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coercion: CoercionSettings::default(),
            robust_mean_max_cv: DEFAULT_ROBUST_MEAN_MAX_CV,
            parallel: true,
            label_column: None,
        }
    }
}

impl PipelineConfig {
    /// Settings for the monthly credit-score extracts.
    pub fn credit_score() -> Self {
        Self {
            coercion: CoercionSettings::with_sentinels(DEFAULT_SENTINELS.iter().copied()),
            label_column: Some(LABEL_COLUMN.to_owned()),
            ..Self::default()
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), json).context("Failed to write config file")
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.robust_mean_max_cv.is_finite() && self.robust_mean_max_cv >= 0.0) {
            return Err(PipelineError::config(
                "robust_mean_max_cv must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}
