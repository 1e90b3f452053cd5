//! Error taxonomy for the cleaning and feature pipeline.
//!
//! Only conditions that must stop a run are represented here. Cell-level
//! problems (unparsable text, corrupted magnitudes, unseen categories) are
//! recovered inside the row and counted in the [`RunReport`](crate::report::RunReport)
//! instead of being returned as errors.
//!
//! ```
//! use credit_features::error::PipelineError;
//!
//! fn describe(err: &PipelineError) -> &'static str {
//!     match err {
//!         PipelineError::Config(_) => "fix the schema table",
//!         PipelineError::StatsNotFound => "fit or load stats first",
//!         _ => "see message",
//!     }
//! }
//! ```

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Schema and dataset disagree, or a column spec is internally inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `transform` was called before stats were fitted or loaded.
    #[error("Stats not found: the pipeline has not been fitted and no stats were loaded")]
    StatsNotFound,

    /// `fit_transform` was called on a pipeline that already holds fitted stats.
    #[error("Pipeline is already fitted (stats {0}); build a new pipeline to re-fit")]
    AlreadyFitted(uuid::Uuid),

    /// Fitting was attempted on a partition other than Train.
    #[error("Refusing to fit on the {0} partition; stats may only be fitted on Train")]
    Leakage(String),

    /// Persisted stats were fitted against a different schema table.
    #[error("Stats mismatch: {0}")]
    StatsMismatch(String),

    /// A produced feature matrix violates one of its invariants.
    #[error("Feature matrix invariant violated: {0}")]
    Invariant(String),

    /// I/O errors (stats files, schema files, data files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors raised while building or writing data frames
    #[error("Data frame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors that abort before any row is processed.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::StatsMismatch(_))
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: PipelineError = e.into();
            PipelineError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: PipelineError = e.into();
            PipelineError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::config("column 'Age' not found in dataset");
        assert_eq!(
            err.to_string(),
            "Configuration error: column 'Age' not found in dataset"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PipelineError::config("x").is_fatal_config());
        assert!(PipelineError::StatsMismatch("x".to_owned()).is_fatal_config());
        assert!(!PipelineError::StatsNotFound.is_fatal_config());
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "stats.json",
        ));

        let result: Result<()> = result.context("Failed to read stats");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read stats"));
        assert!(err.to_string().contains("stats.json"));
    }
}
