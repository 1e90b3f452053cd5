//! Per-row transform: capper, imputer, encoder and derived features.
//!
//! A [`RowPlan`] is compiled once per run from the resolved specs and the
//! fitted Stats; applying it to a [`CleanRecord`] is a pure function, so rows
//! are transformed in parallel without sharing any mutable state.

use crate::clean::capper::{Bounds, CapOutcome};
use crate::clean::derived::evaluate;
use crate::clean::encoder::Vocabulary;
use crate::clean::imputer::{impute_category, impute_numeric};
use crate::error::{PipelineError, Result};
use crate::matrix::OutputSchema;
use crate::record::{Cell, CleanRecord, MissingReason};
use crate::report::Condition;
use crate::schema::{ColumnSpec, DerivedFeature, SchemaRegistry};
use crate::stats::Stats;

enum Step<'a> {
    Numeric {
        bounds: Bounds,
        fill: f64,
    },
    Categorical {
        vocabulary: &'a Vocabulary,
        fill: &'a str,
    },
}

struct ColumnPlan<'a> {
    /// Position of the column in the resolved specs
    cell: usize,
    step: Step<'a>,
    informative: bool,
}

struct DerivedPlan<'a> {
    feature: &'a DerivedFeature,
    /// Output positions of the inputs
    inputs: Vec<usize>,
}

/// Compiled transform for one (specs, Stats) pair.
pub struct RowPlan<'a> {
    columns: Vec<ColumnPlan<'a>>,
    derived: Vec<DerivedPlan<'a>>,
}

/// Transformed values of one row plus the conditions it hit.
///
/// Conditions are keyed by feature column position, matching the order of
/// [`Stats::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutput {
    pub values: Vec<f64>,
    pub conditions: Vec<(usize, Condition)>,
}

impl<'a> RowPlan<'a> {
    pub fn compile(
        registry: &'a SchemaRegistry,
        specs: &[ColumnSpec],
        stats: &'a Stats,
        schema: &OutputSchema,
    ) -> Result<Self> {
        let mut columns = Vec::with_capacity(stats.columns().len());
        let feature_specs = specs.iter().enumerate().filter(|(_, s)| s.emits_features());

        for ((cell, spec), fitted) in feature_specs.zip(stats.columns()) {
            if spec.name != fitted.name {
                return Err(PipelineError::StatsMismatch(format!(
                    "expected stats for '{}', found '{}'",
                    spec.name, fitted.name
                )));
            }
            let step = match (&fitted.vocabulary, fitted.impute_category()) {
                (Some(vocabulary), Some(fill)) => Step::Categorical { vocabulary, fill },
                _ => Step::Numeric {
                    bounds: fitted.bounds(),
                    fill: fitted.impute_number().ok_or_else(|| {
                        PipelineError::StatsMismatch(format!(
                            "column '{}' has no numeric impute value",
                            fitted.name
                        ))
                    })?,
                },
            };
            columns.push(ColumnPlan {
                cell,
                step,
                informative: spec.informative_missing,
            });
        }

        let derived = registry
            .derived
            .iter()
            .map(|feature| {
                let inputs = feature
                    .inputs()
                    .into_iter()
                    .map(|name| {
                        schema.index_of(name).ok_or_else(|| {
                            PipelineError::config(format!(
                                "derived feature '{}' input '{name}' is not an output column",
                                feature.name()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(DerivedPlan { feature, inputs })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns, derived })
    }

    pub fn apply(&self, record: &CleanRecord) -> RowOutput {
        let mut values = Vec::new();
        let mut conditions = Vec::new();

        for (slot, plan) in self.columns.iter().enumerate() {
            let cell = &record.cells[plan.cell];
            if let Cell::Missing(reason) = cell {
                conditions.push((slot, Condition::from(*reason)));
            }

            let was_missing = match &plan.step {
                Step::Numeric { bounds, fill } => {
                    let imputed = impute_numeric(cell, *fill);
                    if matches!(cell, Cell::Category(_)) {
                        conditions.push((slot, Condition::from(MissingReason::Unparsable)));
                    }
                    let value = if imputed.was_missing {
                        imputed.value
                    } else {
                        let (value, outcome) = bounds.cap_with_outcome(imputed.value);
                        match outcome {
                            CapOutcome::Lower => conditions.push((slot, Condition::CappedLower)),
                            CapOutcome::Upper => conditions.push((slot, Condition::CappedUpper)),
                            CapOutcome::Unchanged => {}
                        }
                        value
                    };
                    values.push(value);
                    imputed.was_missing
                }
                Step::Categorical { vocabulary, fill } => {
                    let imputed = impute_category(cell, fill);
                    let encoded = vocabulary.encode(Some(imputed.value));
                    if encoded.unseen && !imputed.was_missing {
                        conditions.push((slot, Condition::UnseenCategory));
                    }
                    values.extend(encoded.indicators);
                    imputed.was_missing
                }
            };

            if plan.informative {
                values.push(if was_missing { 1.0 } else { 0.0 });
            }
        }

        for plan in &self.derived {
            let inputs: Vec<f64> = plan.inputs.iter().map(|i| values[*i]).collect();
            values.push(evaluate(plan.feature, &inputs));
        }

        RowOutput { values, conditions }
    }
}
