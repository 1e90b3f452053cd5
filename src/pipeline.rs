//! Pipeline orchestrator.
//!
//! A [`Pipeline`] is a two-state machine:
//!
//! - **Unfit**: only [`Pipeline::fit_transform`] is available. It resolves
//!   the schema, coerces and corruption-checks the Train partition, fits
//!   [`Stats`], transforms the same records and moves to Fit.
//! - **Fit**: holds an `Arc<Stats>` that is never mutated. [`Pipeline::transform`]
//!   replays the stage sequence without the fitter on any partition. A Fit
//!   pipeline can also be rehydrated from a persisted Stats document with
//!   [`Pipeline::from_stats`].
//!
//! Every run returns the feature matrix together with its run report; the
//! inputs are never modified.
//!
//! # Example
//!
//! ```no_run
//! use credit_features::config::PipelineConfig;
//! use credit_features::io::load_partition;
//! use credit_features::pipeline::Pipeline;
//! use credit_features::record::Split;
//! use credit_features::schema::credit::credit_score_registry;
//!
//! # fn main() -> credit_features::error::Result<()> {
//! let train = load_partition("train.csv", Split::Train)?;
//! let holdout = load_partition("holdout.csv", Split::Holdout)?;
//!
//! let mut pipeline = Pipeline::new(credit_score_registry()?, PipelineConfig::credit_score())?;
//! let fitted = pipeline.fit_transform(&train)?;
//! fitted.stats.to_file("stats.json")?;
//!
//! let scored = pipeline.transform(&holdout)?;
//! println!("{}", scored.report.summary());
//! # Ok(())
//! # }
//! ```

mod row;

pub use row::{RowOutput, RowPlan};

use crate::clean::clean_partition;
use crate::config::PipelineConfig;
use crate::drift::{self, DriftSnapshot};
use crate::error::{PipelineError, Result};
use crate::label::CreditScore;
use crate::matrix::{FeatureMatrix, OutputSchema};
use crate::record::{CleanRecord, Partition, Split};
use crate::report::{ColumnCounts, RunMode, RunReport};
use crate::schema::{CleaningPolicy, ColumnSpec, SchemaRegistry};
use crate::stats::{Stats, fitter};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Whether stats are available.
#[derive(Debug, Clone)]
pub enum PipelineState {
    Unfit,
    Fit(Arc<Stats>),
}

/// A kept (non-feature) column carried alongside the matrix, one value per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Supervised label per row; `None` where the cell was not a credit score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelColumn {
    pub name: String,
    pub values: Vec<Option<CreditScore>>,
}

/// Result of one transform run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub matrix: FeatureMatrix,
    /// Present when a label column is configured
    pub labels: Option<LabelColumn>,
    /// Kept columns other than the label, in schema order
    pub keys: Vec<KeyColumn>,
    pub report: RunReport,
}

/// Result of [`Pipeline::fit_transform`].
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub output: PipelineOutput,
    pub stats: Arc<Stats>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: SchemaRegistry,
    config: PipelineConfig,
    state: PipelineState,
}

impl Pipeline {
    /// Build an unfit pipeline.
    ///
    /// Fails with a configuration error if the registry or config is invalid,
    /// or if the configured label column is not a kept column.
    pub fn new(registry: SchemaRegistry, config: PipelineConfig) -> Result<Self> {
        registry.validate()?;
        config.validate()?;
        if let Some(label) = &config.label_column {
            match registry.get(label) {
                Some(spec) if spec.policy == CleaningPolicy::Keep => {}
                Some(spec) => {
                    return Err(PipelineError::config(format!(
                        "label column '{label}' must use policy 'keep', found '{}'",
                        spec.policy.as_str()
                    )));
                }
                None => {
                    return Err(PipelineError::config(format!(
                        "label column '{label}' is not declared"
                    )));
                }
            }
        }
        Ok(Self {
            registry,
            config,
            state: PipelineState::Unfit,
        })
    }

    /// Rehydrate a fitted pipeline from persisted stats without seeing Train.
    pub fn from_stats(
        registry: SchemaRegistry,
        config: PipelineConfig,
        stats: Arc<Stats>,
    ) -> Result<Self> {
        stats.check_schema(&registry)?;
        let mut pipeline = Self::new(registry, config)?;
        info!(stats_id = %stats.id(), train_rows = stats.train_rows(), "Loaded stats");
        pipeline.state = PipelineState::Fit(stats);
        Ok(pipeline)
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, PipelineState::Fit(_))
    }

    pub fn stats(&self) -> Option<&Arc<Stats>> {
        match &self.state {
            PipelineState::Fit(stats) => Some(stats),
            PipelineState::Unfit => None,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit stats on `train`, transform it, and move to the Fit state.
    ///
    /// A fitted pipeline refuses to re-fit; build a new one instead.
    pub fn fit_transform(&mut self, train: &Partition) -> Result<FitOutput> {
        if let PipelineState::Fit(stats) = &self.state {
            return Err(PipelineError::AlreadyFitted(stats.id()));
        }
        if train.split() != Split::Train {
            return Err(PipelineError::Leakage(train.split().to_string()));
        }

        let start = Instant::now();
        let specs = self.registry.resolve(train.columns())?;
        info!(rows = train.len(), columns = specs.len(), "Fitting on train partition");

        let clean = clean_partition(
            &specs,
            &self.config.coercion,
            train.records(),
            self.config.parallel,
        );
        let stats = Arc::new(fitter::fit(&self.registry, &specs, &clean, &self.config));
        info!(stats_id = %stats.id(), columns = stats.columns().len(), "Stats fitted");

        let output = run(
            &RunContext {
                registry: &self.registry,
                specs: &specs,
                stats: &stats,
                label_column: self.config.label_column.as_deref(),
                parallel: self.config.parallel,
            },
            &clean,
            train.split(),
            RunMode::FitTransform,
            start,
        )?;

        self.state = PipelineState::Fit(Arc::clone(&stats));
        Ok(FitOutput { output, stats })
    }

    /// Transform any partition with the held stats.
    pub fn transform(&self, batch: &Partition) -> Result<PipelineOutput> {
        let stats = self.stats().ok_or(PipelineError::StatsNotFound)?;
        transform_with_stats(&self.registry, stats, batch, &self.config)
    }

    /// Drift snapshot of `batch` computed with the held stats' coercion rules.
    pub fn snapshot(&self, batch: &Partition) -> Result<DriftSnapshot> {
        let stats = self.stats().ok_or(PipelineError::StatsNotFound)?;
        drift::snapshot(&self.registry, stats, batch, self.config.parallel)
    }
}

/// Transform `batch` with explicit stats, independent of any pipeline state.
///
/// Coercion uses the settings recorded in `stats`, never those in `config`.
pub fn transform_with_stats(
    registry: &SchemaRegistry,
    stats: &Stats,
    batch: &Partition,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    stats.check_schema(registry)?;
    let specs = registry.resolve(batch.columns())?;
    info!(
        split = %batch.split(),
        rows = batch.len(),
        stats_id = %stats.id(),
        "Transforming partition"
    );

    let clean = clean_partition(&specs, stats.coercion(), batch.records(), config.parallel);
    run(
        &RunContext {
            registry,
            specs: &specs,
            stats,
            label_column: config.label_column.as_deref(),
            parallel: config.parallel,
        },
        &clean,
        batch.split(),
        RunMode::Transform,
        start,
    )
}

struct RunContext<'a> {
    registry: &'a SchemaRegistry,
    specs: &'a [ColumnSpec],
    stats: &'a Stats,
    label_column: Option<&'a str>,
    parallel: bool,
}

fn run(
    ctx: &RunContext<'_>,
    clean: &[CleanRecord],
    split: Split,
    mode: RunMode,
    start: Instant,
) -> Result<PipelineOutput> {
    let schema = OutputSchema::from_stats(ctx.registry, ctx.stats)?;
    let plan = RowPlan::compile(ctx.registry, ctx.specs, ctx.stats, &schema)?;

    let outputs: Vec<RowOutput> = if ctx.parallel {
        clean.par_iter().map(|record| plan.apply(record)).collect()
    } else {
        clean.iter().map(|record| plan.apply(record)).collect()
    };

    let mut counts: Vec<ColumnCounts> = ctx
        .stats
        .columns()
        .iter()
        .map(|c| ColumnCounts::new(c.name.as_str()))
        .collect();
    let mut rows = Vec::with_capacity(outputs.len());
    for output in outputs {
        for (slot, condition) in output.conditions {
            counts[slot].add(condition);
        }
        rows.push(output.values);
    }

    let matrix = FeatureMatrix::new(schema, rows)?;
    let (labels, keys) = carried_columns(ctx.specs, clean, ctx.label_column);
    let unparsed_labels = labels
        .as_ref()
        .map_or(0, |l| l.values.iter().filter(|v| v.is_none()).count());

    let report = RunReport {
        mode,
        split,
        stats_id: ctx.stats.id(),
        rows: matrix.n_rows(),
        output_columns: matrix.width(),
        columns: counts,
        unparsed_labels,
        duration: start.elapsed(),
    };
    debug!(fingerprint = %matrix.fingerprint(), "Feature matrix built");
    info!("{}", report.summary());

    Ok(PipelineOutput {
        matrix,
        labels,
        keys,
        report,
    })
}

type CarriedColumns = (Option<LabelColumn>, Vec<KeyColumn>);

fn carried_columns(
    specs: &[ColumnSpec],
    clean: &[CleanRecord],
    label_column: Option<&str>,
) -> CarriedColumns {
    let mut labels = None;
    let mut keys = Vec::new();
    for (idx, spec) in specs.iter().enumerate() {
        if spec.policy != CleaningPolicy::Keep {
            continue;
        }
        let values = clean.iter().map(|r| r.cells[idx].as_category());
        if Some(spec.name.as_str()) == label_column {
            labels = Some(LabelColumn {
                name: spec.name.clone(),
                values: values
                    .map(|v| v.and_then(|s| s.parse::<CreditScore>().ok()))
                    .collect(),
            });
        } else {
            keys.push(KeyColumn {
                name: spec.name.clone(),
                values: values.map(|v| v.map(str::to_owned)).collect(),
            });
        }
    }
    (labels, keys)
}
