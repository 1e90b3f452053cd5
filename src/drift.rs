//! Drift snapshots for the monitoring collaborator.
//!
//! A snapshot summarises each feature column of a batch after coercion and
//! corruption detection, with exactly the semantics used at fit time. The
//! fit-time snapshot is stored inside Stats as the baseline; comparing
//! snapshots is left to the external monitor.

use crate::clean::clean_partition;
use crate::error::{Result, ResultExt as _};
use crate::record::{Cell, CleanRecord, MissingReason, Partition};
use crate::schema::{ColumnSpec, SchemaRegistry};
use crate::stats::Stats;
use crate::stats::percentile::{mean_std, percentile_sorted, sorted_finite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Percentiles reported for numeric columns.
pub const SNAPSHOT_PERCENTILES: [f64; 7] = [1.0, 5.0, 25.0, 50.0, 75.0, 95.0, 99.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Keyed `p01`, `p05`, ... `p99`
    pub percentiles: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    pub rows: usize,
    pub missing: usize,
    pub missing_ratio: f64,
    /// Missing because the magnitude exceeded the corruption threshold
    pub corrupted: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, usize>>,
}

impl ColumnSnapshot {
    /// True when every numeric figure in the summary is finite.
    pub fn is_finite(&self) -> bool {
        self.missing_ratio.is_finite()
            && self.numeric.as_ref().is_none_or(|n| {
                [n.mean, n.std, n.min, n.max]
                    .iter()
                    .chain(n.percentiles.values())
                    .all(|v| v.is_finite())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSnapshot {
    pub taken_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: Vec<ColumnSnapshot>,
}

impl DriftSnapshot {
    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize drift snapshot")
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?).context("Failed to write drift snapshot")
    }
}

fn percentile_key(p: f64) -> String {
    format!("p{:02}", p as u32)
}

/// Summarise coerced records; `specs` must be the resolved table the records
/// were coerced with.
pub fn summarize(specs: &[ColumnSpec], records: &[CleanRecord]) -> DriftSnapshot {
    let rows = records.len();
    let columns = specs
        .iter()
        .enumerate()
        .filter(|(_, spec)| spec.emits_features())
        .map(|(idx, spec)| summarize_column(spec, idx, records))
        .collect();

    DriftSnapshot {
        taken_at: Utc::now(),
        rows,
        columns,
    }
}

fn summarize_column(spec: &ColumnSpec, idx: usize, records: &[CleanRecord]) -> ColumnSnapshot {
    let cells = records.iter().map(|r| &r.cells[idx]);
    let missing = cells.clone().filter(|c| c.is_missing()).count();
    let corrupted = cells
        .clone()
        .filter(|c| matches!(c, Cell::Missing(MissingReason::Corrupted)))
        .count();
    let rows = records.len();

    let (numeric, categories) = if spec.kind.is_numeric() {
        let sorted = sorted_finite(cells.filter_map(Cell::as_f64));
        let numeric = mean_std(&sorted).map(|(mean, std)| NumericSummary {
            mean,
            std,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            percentiles: SNAPSHOT_PERCENTILES
                .iter()
                .filter_map(|p| {
                    percentile_sorted(&sorted, p / 100.0).map(|v| (percentile_key(*p), v))
                })
                .collect(),
        });
        (numeric, None)
    } else {
        let mut counts = BTreeMap::new();
        for label in cells.filter_map(Cell::as_category) {
            *counts.entry(label.to_owned()).or_insert(0) += 1;
        }
        (None, Some(counts))
    };

    ColumnSnapshot {
        name: spec.name.clone(),
        rows,
        missing,
        missing_ratio: if rows == 0 {
            0.0
        } else {
            missing as f64 / rows as f64
        },
        corrupted,
        numeric,
        categories,
    }
}

/// Snapshot a new batch using the coercion settings recorded in `stats`.
pub fn snapshot(
    registry: &SchemaRegistry,
    stats: &Stats,
    batch: &Partition,
    parallel: bool,
) -> Result<DriftSnapshot> {
    stats.check_schema(registry)?;
    let specs = registry.resolve(batch.columns())?;
    let clean = clean_partition(&specs, stats.coercion(), batch.records(), parallel);
    Ok(summarize(&specs, &clean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::CoercionSettings;
    use crate::record::raw_record;
    use crate::schema::{BoundSpec, CleaningPolicy};

    fn specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::identifier("ID", CleaningPolicy::Drop),
            ColumnSpec::numeric("Monthly_Balance", CleaningPolicy::Cap)
                .with_bounds(BoundSpec::percentiles(1.0, 99.0))
                .with_corruption_threshold(1e6),
            ColumnSpec::categorical("Credit_Mix"),
        ]
    }

    #[test]
    fn test_summary_counts_missing_and_corrupted() {
        let raw = vec![
            raw_record([("ID", "a"), ("Monthly_Balance", "312.49"), ("Credit_Mix", "Good")]),
            raw_record([
                ("ID", "b"),
                ("Monthly_Balance", "-333333333333333333333333333"),
                ("Credit_Mix", "_"),
            ]),
            raw_record([("ID", "c"), ("Monthly_Balance", "284.63"), ("Credit_Mix", "Good")]),
            raw_record([("ID", "d"), ("Monthly_Balance", "oops"), ("Credit_Mix", "Bad")]),
        ];
        let clean = clean_partition(&specs(), &CoercionSettings::default(), &raw, false);
        let snap = summarize(&specs(), &clean);

        assert_eq!(snap.rows, 4);
        assert_eq!(snap.columns.len(), 2);

        let balance = snap.column("Monthly_Balance").unwrap();
        assert_eq!(balance.missing, 2);
        assert_eq!(balance.corrupted, 1);
        assert_eq!(balance.missing_ratio, 0.5);
        let numeric = balance.numeric.as_ref().unwrap();
        assert_eq!(numeric.min, 284.63);
        assert_eq!(numeric.max, 312.49);
        assert_eq!(numeric.percentiles.len(), SNAPSHOT_PERCENTILES.len());
        assert!(numeric.percentiles.contains_key("p01"));

        let mix = snap.column("Credit_Mix").unwrap();
        assert_eq!(mix.missing, 1);
        let counts = mix.categories.as_ref().unwrap();
        assert_eq!(counts["Good"], 2);
        assert_eq!(counts["Bad"], 1);
    }

    #[test]
    fn test_all_missing_numeric_has_no_summary() {
        let raw = vec![raw_record([
            ("ID", "a"),
            ("Monthly_Balance", "_"),
            ("Credit_Mix", "Good"),
        ])];
        let clean = clean_partition(&specs(), &CoercionSettings::default(), &raw, false);
        let snap = summarize(&specs(), &clean);
        assert!(snap.column("Monthly_Balance").unwrap().numeric.is_none());
    }
}
