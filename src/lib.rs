//! # credit-features
//!
//! Cleans raw monthly credit records into a fixed-width, fully imputed
//! feature matrix for a credit-score classifier.
//!
//! Statistics (outlier bounds, impute values, category vocabularies) are
//! fitted once from the Train partition, frozen into a versioned [`Stats`]
//! document and replayed unchanged on every other partition, so holdout and
//! production data never influence the features they are scored with.
//!
//! ## Quick Start
//!
//! ```no_run
//! use credit_features::config::PipelineConfig;
//! use credit_features::io::{load_partition, save_output};
//! use credit_features::pipeline::Pipeline;
//! use credit_features::record::Split;
//! use credit_features::schema::credit::{CUSTOMER_KEY, credit_score_registry};
//! use credit_features::split::split_by_key;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = load_partition("credit.csv", Split::Train)?;
//! let (train, holdout) = split_by_key(source, CUSTOMER_KEY, 0.2)?;
//!
//! let mut pipeline = Pipeline::new(credit_score_registry()?, PipelineConfig::credit_score())?;
//! let fitted = pipeline.fit_transform(&train)?;
//! fitted.stats.to_file("stats.json")?;
//!
//! let scored = pipeline.transform(&holdout)?;
//! save_output(&scored, "holdout.parquet")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`record`]: raw cells, the tagged [`record::Cell`] value, partitions
//! - [`schema`]: column declarations, registry resolution, the default credit table
//! - [`clean`]: coercion, corruption detection, capping, imputation, encoding, derived features
//! - [`stats`]: the fitter, the percentile algorithm and the persisted Stats artifact
//! - [`matrix`]: output schema and the invariant-checked feature matrix
//! - [`pipeline`]: the Unfit → Fit orchestrator
//! - [`report`]: per-column counts of recovered conditions
//! - [`drift`]: batch summaries for an external drift monitor
//! - [`split`]: customer-disjoint Train/Holdout partitioning
//! - [`io`]: CSV, Parquet and JSON loading and matrix writing
//! - [`config`], [`error`], [`logging`]: ambient plumbing
//!
//! [`Stats`]: stats::Stats

#![warn(clippy::all, rust_2018_idioms)]

pub mod clean;
pub mod config;
pub mod drift;
pub mod error;
pub mod io;
pub mod label;
pub mod logging;
pub mod matrix;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod schema;
pub mod split;
pub mod stats;
