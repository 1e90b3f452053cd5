//! Feature matrix and its declared output schema.
//!
//! The [`OutputSchema`] is derived from the schema registry and the fitted
//! Stats alone, so every partition transformed with the same Stats has the
//! same columns in the same order. A [`FeatureMatrix`] can only be built
//! through [`FeatureMatrix::new`], which enforces:
//!
//! - every row has exactly one value per output column,
//! - no value is missing or non-finite,
//! - the indicators of every categorical group sum to exactly 1.
//!
//! Column order, per schema column in declaration order:
//!
//! | Column kind      | Output columns                                  |
//! |------------------|-------------------------------------------------|
//! | numeric/duration | `<name>`                                        |
//! | categorical      | `<name>_<label>` per vocabulary label           |
//! | informative      | then `<name>_was_missing`                       |
//!
//! Derived features follow in declaration order.

use crate::error::{PipelineError, Result};
use crate::schema::SchemaRegistry;
use crate::stats::Stats;
use polars::prelude::*;
use sha2::{Digest as _, Sha256};
use std::collections::HashSet;

/// Suffix of the companion feature emitted for informative-missing columns.
pub const WAS_MISSING_SUFFIX: &str = "_was_missing";

/// Contiguous one-hot block belonging to one categorical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalGroup {
    pub column: String,
    pub start: usize,
    pub width: usize,
}

/// Ordered output column names plus the categorical groups within them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    columns: Vec<String>,
    groups: Vec<CategoricalGroup>,
}

impl OutputSchema {
    /// Derive the output layout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StatsMismatch`] if `stats` were not fitted
    /// against `registry`, and [`PipelineError::Invariant`] if two output
    /// columns would share a name.
    pub fn from_stats(registry: &SchemaRegistry, stats: &Stats) -> Result<Self> {
        stats.check_schema(registry)?;

        let mut columns = Vec::new();
        let mut groups = Vec::new();
        for (spec, fitted) in registry.feature_columns().zip(stats.columns()) {
            match &fitted.vocabulary {
                Some(vocab) => {
                    groups.push(CategoricalGroup {
                        column: spec.name.clone(),
                        start: columns.len(),
                        width: vocab.width(),
                    });
                    columns.extend(
                        vocab
                            .labels()
                            .iter()
                            .map(|label| format!("{}_{label}", spec.name)),
                    );
                }
                None => columns.push(spec.name.clone()),
            }
            if spec.informative_missing {
                columns.push(format!("{}{WAS_MISSING_SUFFIX}", spec.name));
            }
        }
        columns.extend(registry.derived.iter().map(|d| d.name().to_owned()));

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(PipelineError::Invariant(format!(
                "output column '{dup}' is produced twice"
            )));
        }

        Ok(Self { columns, groups })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn groups(&self) -> &[CategoricalGroup] {
        &self.groups
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Fixed-width, fully imputed feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: OutputSchema,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Invariant`] naming the first offending row.
    pub fn new(schema: OutputSchema, rows: Vec<Vec<f64>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.width() {
                return Err(PipelineError::Invariant(format!(
                    "row {i} has {} values, schema has {} columns",
                    row.len(),
                    schema.width()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(PipelineError::Invariant(format!(
                    "row {i} column '{}' is not finite",
                    schema.columns[j]
                )));
            }
            for group in &schema.groups {
                let block = &row[group.start..group.start + group.width];
                let ones = block.iter().filter(|v| **v == 1.0).count();
                let zeros = block.iter().filter(|v| **v == 0.0).count();
                if ones != 1 || ones + zeros != group.width {
                    return Err(PipelineError::Invariant(format!(
                        "row {i} group '{}' is not one-hot",
                        group.column
                    )));
                }
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.schema.width()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let j = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| r[j])
    }

    /// One output column across all rows.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|r| r[j]).collect())
    }

    /// SHA-256 over column names and the bit patterns of every value.
    ///
    /// Two matrices share a fingerprint only if they are byte-identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.columns() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update((self.rows.len() as u64).to_le_bytes());
        for row in &self.rows {
            for v in row {
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// One `f64` polars column per output column.
    pub fn to_columns(&self) -> Vec<Column> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<f64> = self.rows.iter().map(|r| r[j]).collect();
                Column::from(Series::new(name.as_str().into(), values))
            })
            .collect()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(self.to_columns())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OutputSchema {
        OutputSchema {
            columns: vec![
                "Age".to_owned(),
                "Credit_Mix_Good".to_owned(),
                "Credit_Mix_Unknown".to_owned(),
                "Credit_Mix_was_missing".to_owned(),
            ],
            groups: vec![CategoricalGroup {
                column: "Credit_Mix".to_owned(),
                start: 1,
                width: 2,
            }],
        }
    }

    #[test]
    fn test_valid_matrix() {
        let matrix = FeatureMatrix::new(
            schema(),
            vec![vec![30.0, 1.0, 0.0, 0.0], vec![41.0, 0.0, 1.0, 1.0]],
        )
        .unwrap();
        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.get(1, "Credit_Mix_was_missing"), Some(1.0));
        assert_eq!(matrix.column("Age"), Some(vec![30.0, 41.0]));
        assert_eq!(matrix.get(0, "Nope"), None);
    }

    #[test]
    fn test_group_must_be_one_hot() {
        let err = FeatureMatrix::new(schema(), vec![vec![30.0, 1.0, 1.0, 0.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(msg) if msg.contains("Credit_Mix")));

        let err = FeatureMatrix::new(schema(), vec![vec![30.0, 0.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Invariant(_)));
    }

    #[test]
    fn test_width_and_finiteness_checked() {
        assert!(FeatureMatrix::new(schema(), vec![vec![30.0, 1.0, 0.0]]).is_err());
        assert!(FeatureMatrix::new(schema(), vec![vec![f64::NAN, 1.0, 0.0, 0.0]]).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_value_bits() {
        let a = FeatureMatrix::new(schema(), vec![vec![30.0, 1.0, 0.0, 0.0]]).unwrap();
        let b = FeatureMatrix::new(schema(), vec![vec![30.0, 1.0, 0.0, 0.0]]).unwrap();
        let c = FeatureMatrix::new(schema(), vec![vec![30.000001, 1.0, 0.0, 0.0]]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_to_dataframe() -> anyhow::Result<()> {
        let matrix = FeatureMatrix::new(schema(), vec![vec![30.0, 1.0, 0.0, 0.0]])?;
        let df = matrix.to_dataframe()?;
        assert_eq!(df.shape(), (1, 4));
        assert_eq!(df.get_column_names()[1].as_str(), "Credit_Mix_Good");
        Ok(())
    }
}
