//! Statistics fitter.
//!
//! Consumes the coerced, corruption-filtered Train records in one complete
//! pass and materialises bounds, impute values and vocabularies. Columns are
//! independent of each other and are fitted in parallel.

use super::artifact::{ColumnStats, ImputeStatistic, ImputeValue, Stats};
use super::percentile::{mean_std, median_sorted, percentile_sorted, sorted_finite};
use crate::clean::encoder::mode;
use crate::clean::{Bounds, Vocabulary};
use crate::config::PipelineConfig;
use crate::drift::summarize;
use crate::record::{Cell, CleanRecord};
use crate::schema::{BoundSpec, ColumnSpec, SchemaRegistry};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Default `std / |mean|` threshold below which a robust-mean-eligible
/// column is imputed with its mean.
pub const DEFAULT_ROBUST_MEAN_MAX_CV: f64 = 0.25;

/// Outcome of the median-versus-mean rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticChoice {
    pub statistic: ImputeStatistic,
    pub value: f64,
    /// Coefficient of variation; `None` when the mean is zero or the ratio overflows
    pub variation_ratio: Option<f64>,
}

/// Pick the impute statistic for sorted, finite values.
///
/// Mean is chosen only when `eligible` is set and `std / |mean| < max_cv`;
/// every other case uses the median. Returns `None` for an empty slice.
pub fn choose_statistic(sorted: &[f64], eligible: bool, max_cv: f64) -> Option<StatisticChoice> {
    let median = median_sorted(sorted)?;
    let (mean, std) = mean_std(sorted)?;
    let variation_ratio = (mean != 0.0)
        .then(|| std / mean.abs())
        .filter(|cv| cv.is_finite());

    let use_mean = eligible && variation_ratio.is_some_and(|cv| cv < max_cv);
    Some(if use_mean {
        StatisticChoice {
            statistic: ImputeStatistic::Mean,
            value: mean,
            variation_ratio,
        }
    } else {
        StatisticChoice {
            statistic: ImputeStatistic::Median,
            value: median,
            variation_ratio,
        }
    })
}

/// Resolve a bound declaration against sorted Train values.
pub fn fit_bounds(spec: &BoundSpec, sorted: &[f64]) -> Bounds {
    match *spec {
        BoundSpec::Unbounded => Bounds::UNBOUNDED,
        BoundSpec::Fixed { lower, upper } => Bounds::new(lower, upper),
        BoundSpec::Percentile { lower, upper } => Bounds::new(
            lower.and_then(|p| percentile_sorted(sorted, p / 100.0)),
            upper.and_then(|p| percentile_sorted(sorted, p / 100.0)),
        ),
    }
}

/// Fit a numeric or duration column from its coerced cells.
pub fn fit_numeric<'a, I>(spec: &ColumnSpec, cells: I, max_cv: f64) -> ColumnStats
where
    I: IntoIterator<Item = &'a Cell>,
{
    let sorted = sorted_finite(cells.into_iter().filter_map(Cell::as_f64));
    let bounds = fit_bounds(&spec.bounds, &sorted);

    // Capping is monotone, so the capped values stay sorted.
    let capped: Vec<f64> = sorted.iter().map(|v| bounds.cap(*v)).collect();

    let (impute_statistic, value, variation_ratio) =
        match choose_statistic(&capped, spec.robust_mean_eligible, max_cv) {
            Some(choice) => (choice.statistic, choice.value, choice.variation_ratio),
            None => {
                warn!(column = %spec.name, "No usable Train values; imputing 0.0");
                (ImputeStatistic::Fallback, bounds.cap(0.0), None)
            }
        };

    debug!(
        column = %spec.name,
        statistic = ?impute_statistic,
        value,
        lower = ?bounds.lower,
        upper = ?bounds.upper,
        "Fitted numeric column"
    );

    ColumnStats {
        name: spec.name.clone(),
        kind: spec.kind,
        impute_value: ImputeValue::Number(value),
        impute_statistic,
        variation_ratio,
        lower_bound: bounds.lower,
        upper_bound: bounds.upper,
        vocabulary: None,
        observed: sorted.len(),
    }
}

/// Fit a categorical column's vocabulary and fill label.
pub fn fit_categorical<'a, I>(spec: &ColumnSpec, cells: I) -> ColumnStats
where
    I: IntoIterator<Item = &'a Cell>,
{
    let observed: Vec<&str> = cells.into_iter().filter_map(Cell::as_category).collect();
    let vocabulary = Vocabulary::fit(observed.iter().copied(), &spec.missing_label);

    let (impute_statistic, fill) = if spec.informative_missing {
        (ImputeStatistic::UnknownBucket, spec.missing_label.clone())
    } else {
        match mode(observed.iter().copied()) {
            Some(label) => (ImputeStatistic::Mode, label),
            None => (ImputeStatistic::Fallback, spec.missing_label.clone()),
        }
    };
    if observed.is_empty() {
        warn!(column = %spec.name, "No usable Train values; vocabulary is the unknown bucket only");
    }

    debug!(
        column = %spec.name,
        statistic = ?impute_statistic,
        fill = %fill,
        width = vocabulary.width(),
        "Fitted categorical column"
    );

    ColumnStats {
        name: spec.name.clone(),
        kind: spec.kind,
        impute_value: ImputeValue::Category(fill),
        impute_statistic,
        variation_ratio: None,
        lower_bound: None,
        upper_bound: None,
        vocabulary: Some(vocabulary),
        observed: observed.len(),
    }
}

fn fit_column(spec: &ColumnSpec, idx: usize, records: &[CleanRecord], max_cv: f64) -> ColumnStats {
    let cells = records.iter().map(|r| &r.cells[idx]);
    if spec.kind.is_numeric() {
        fit_numeric(spec, cells, max_cv)
    } else {
        fit_categorical(spec, cells)
    }
}

/// Fit Stats for every feature column of `specs` from coerced Train records.
///
/// `specs` must be the resolved table the records were coerced with. This is
/// the single barrier between "no Stats" and "usable Stats": every value is
/// computed from the complete partition.
pub fn fit(
    registry: &SchemaRegistry,
    specs: &[ColumnSpec],
    records: &[CleanRecord],
    config: &PipelineConfig,
) -> Stats {
    let max_cv = config.robust_mean_max_cv;
    let feature_specs: Vec<(usize, &ColumnSpec)> = specs
        .iter()
        .enumerate()
        .filter(|(_, spec)| spec.emits_features())
        .collect();

    let columns: Vec<ColumnStats> = if config.parallel {
        feature_specs
            .par_iter()
            .map(|(idx, spec)| fit_column(spec, *idx, records, max_cv))
            .collect()
    } else {
        feature_specs
            .iter()
            .map(|(idx, spec)| fit_column(spec, *idx, records, max_cv))
            .collect()
    };

    Stats::new(
        registry,
        records.len(),
        config.coercion.clone(),
        max_cv,
        columns,
        summarize(specs, records),
    )
}
