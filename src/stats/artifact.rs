//! The Stats artifact and its JSON persistence.
//!
//! A [`Stats`] value has no public mutators. Once the fitter has built it, it
//! is shared behind an `Arc` and only ever read; a new fit produces a new
//! value with a new id.

use super::percentile::PERCENTILE_METHOD;
use crate::clean::{Bounds, CoercionSettings, Vocabulary};
use crate::drift::DriftSnapshot;
use crate::error::{PipelineError, Result, ResultExt as _};
use crate::schema::{SchemaRegistry, SemanticType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current Stats document version
pub const STATS_FORMAT_VERSION: &str = "1";

/// Value substituted for missing cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImputeValue {
    Number(f64),
    Category(String),
}

/// Which rule produced the impute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStatistic {
    Median,
    Mean,
    Mode,
    UnknownBucket,
    /// No usable Train values; a constant was used.
    Fallback,
}

/// Fitted values for one feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub kind: SemanticType,
    pub impute_value: ImputeValue,
    pub impute_statistic: ImputeStatistic,

    /// `std / |mean|` of the capped Train values, when defined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_ratio: Option<f64>,

    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vocabulary>,

    /// Non-missing Train values the statistics were computed from
    pub observed: usize,
}

impl ColumnStats {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.lower_bound, self.upper_bound)
    }

    pub fn impute_number(&self) -> Option<f64> {
        match &self.impute_value {
            ImputeValue::Number(v) => Some(*v),
            ImputeValue::Category(_) => None,
        }
    }

    pub fn impute_category(&self) -> Option<&str> {
        match &self.impute_value {
            ImputeValue::Category(c) => Some(c.as_str()),
            ImputeValue::Number(_) => None,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.kind.is_numeric() {
            match self.impute_number() {
                Some(v) if v.is_finite() => {}
                _ => return Err(format!("column '{}': numeric impute value missing", self.name)),
            }
            let finite = |v: Option<f64>| v.is_none_or(f64::is_finite);
            if !finite(self.lower_bound) || !finite(self.upper_bound) || !finite(self.variation_ratio)
            {
                return Err(format!("column '{}': non-finite statistic", self.name));
            }
            if let (Some(lo), Some(hi)) = (self.lower_bound, self.upper_bound)
                && lo > hi
            {
                return Err(format!("column '{}': bounds are inverted", self.name));
            }
        } else {
            let vocab = self
                .vocabulary
                .as_ref()
                .ok_or_else(|| format!("column '{}': vocabulary missing", self.name))?;
            let fill = self
                .impute_category()
                .ok_or_else(|| format!("column '{}': categorical impute value missing", self.name))?;
            if fill != vocab.unknown_label() && vocab.index_of(fill).is_none() {
                return Err(format!(
                    "column '{}': impute value '{fill}' is not in the vocabulary",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

/// Immutable fitted statistics for every feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    format_version: String,
    id: Uuid,
    created_at: DateTime<Utc>,
    percentile_method: String,
    schema_fingerprint: String,
    train_rows: usize,
    coercion: CoercionSettings,
    robust_mean_max_cv: f64,
    columns: Vec<ColumnStats>,
    baseline: DriftSnapshot,
}

impl Stats {
    pub(crate) fn new(
        registry: &SchemaRegistry,
        train_rows: usize,
        coercion: CoercionSettings,
        robust_mean_max_cv: f64,
        columns: Vec<ColumnStats>,
        baseline: DriftSnapshot,
    ) -> Self {
        Self {
            format_version: STATS_FORMAT_VERSION.to_owned(),
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            percentile_method: PERCENTILE_METHOD.to_owned(),
            schema_fingerprint: registry.fingerprint(),
            train_rows,
            coercion,
            robust_mean_max_cv,
            columns,
            baseline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    pub fn percentile_method(&self) -> &str {
        &self.percentile_method
    }

    pub fn schema_fingerprint(&self) -> &str {
        &self.schema_fingerprint
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    /// Coercion settings in force when these stats were fitted.
    pub fn coercion(&self) -> &CoercionSettings {
        &self.coercion
    }

    pub fn robust_mean_max_cv(&self) -> f64 {
        self.robust_mean_max_cv
    }

    /// Per-column stats in schema order.
    pub fn columns(&self) -> &[ColumnStats] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Drift summary of the Train partition.
    pub fn baseline(&self) -> &DriftSnapshot {
        &self.baseline
    }

    /// Fails unless these stats were fitted against `registry`.
    pub fn check_schema(&self, registry: &SchemaRegistry) -> Result<()> {
        let expected = registry.fingerprint();
        if self.schema_fingerprint != expected {
            return Err(PipelineError::StatsMismatch(format!(
                "stats {} were fitted against schema {}, registry is {}",
                self.id,
                short(&self.schema_fingerprint),
                short(&expected)
            )));
        }

        let declared: Vec<&str> = registry.feature_columns().map(|c| c.name.as_str()).collect();
        let fitted: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        if declared != fitted {
            return Err(PipelineError::StatsMismatch(format!(
                "feature columns differ: schema {declared:?}, stats {fitted:?}"
            )));
        }
        Ok(())
    }

    /// Serialize, refusing documents that [`Stats::from_json`] would reject.
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        serde_json::to_string_pretty(self).context("Failed to serialize stats")
    }

    /// Parse a Stats document, rejecting unknown versions and inconsistent columns.
    pub fn from_json(json: &str) -> Result<Self> {
        let stats: Self = serde_json::from_str(json).context("Failed to parse stats JSON")?;
        stats.validate()?;
        Ok(stats)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).with_context(|| {
            format!("Failed to write stats file {}", path.as_ref().display())
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read stats file {}", path.as_ref().display())
        })?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.format_version != STATS_FORMAT_VERSION {
            return Err(PipelineError::StatsMismatch(format!(
                "unsupported stats format '{}', expected '{STATS_FORMAT_VERSION}'",
                self.format_version
            )));
        }
        if self.percentile_method != PERCENTILE_METHOD {
            return Err(PipelineError::StatsMismatch(format!(
                "stats use percentile method '{}', this build implements '{PERCENTILE_METHOD}'",
                self.percentile_method
            )));
        }
        for column in &self.columns {
            column.validate().map_err(PipelineError::StatsMismatch)?;
        }
        if let Some(column) = self.baseline.columns.iter().find(|c| !c.is_finite()) {
            return Err(PipelineError::StatsMismatch(format!(
                "baseline summary of '{}' is not finite",
                column.name
            )));
        }
        Ok(())
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CleaningPolicy, ColumnSpec};
    use tempfile::tempdir;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            ColumnSpec::numeric("Monthly_Balance", CleaningPolicy::Impute),
            ColumnSpec::categorical("Credit_Mix").informative(),
        ])
        .unwrap()
    }

    fn sample_stats() -> Stats {
        let columns = vec![
            ColumnStats {
                name: "Monthly_Balance".to_owned(),
                kind: SemanticType::Numeric,
                impute_value: ImputeValue::Number(1056.495),
                impute_statistic: ImputeStatistic::Median,
                variation_ratio: Some(0.23),
                lower_bound: None,
                upper_bound: None,
                vocabulary: None,
                observed: 2,
            },
            ColumnStats {
                name: "Credit_Mix".to_owned(),
                kind: SemanticType::Categorical,
                impute_value: ImputeValue::Category("Unknown".to_owned()),
                impute_statistic: ImputeStatistic::UnknownBucket,
                variation_ratio: None,
                lower_bound: None,
                upper_bound: None,
                vocabulary: Some(Vocabulary::fit(["Good", "Bad"], "Unknown")),
                observed: 2,
            },
        ];
        let baseline = DriftSnapshot {
            taken_at: Utc::now(),
            rows: 3,
            columns: Vec::new(),
        };
        Stats::new(
            &registry(),
            3,
            CoercionSettings::with_sentinels(["NA"]),
            0.25,
            columns,
            baseline,
        )
    }

    #[test]
    fn test_file_round_trip_is_exact() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stats.json");
        let stats = sample_stats();
        stats.to_file(&path)?;

        let loaded = Stats::from_file(&path)?;
        assert_eq!(loaded, stats);
        assert_eq!(
            loaded.column("Monthly_Balance").unwrap().impute_number(),
            Some(1056.495)
        );
        assert_eq!(loaded.coercion().sentinels, vec!["NA".to_owned()]);
        Ok(())
    }

    #[test]
    fn test_impute_value_is_tagged() {
        let json = serde_json::to_value(ImputeValue::Number(1.5)).unwrap();
        assert_eq!(json["kind"], "number");
        assert_eq!(json["value"], 1.5);
    }

    #[test]
    fn test_check_schema() {
        let stats = sample_stats();
        assert!(stats.check_schema(&registry()).is_ok());

        let other = SchemaRegistry::new(vec![ColumnSpec::numeric(
            "Monthly_Balance",
            CleaningPolicy::Impute,
        )])
        .unwrap();
        assert!(matches!(
            stats.check_schema(&other),
            Err(PipelineError::StatsMismatch(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut value = serde_json::to_value(sample_stats()).unwrap();
        value["format_version"] = "99".into();
        let err = Stats::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("unsupported stats format"));
    }

    #[test]
    fn test_impute_category_outside_vocabulary_rejected() {
        let mut value = serde_json::to_value(sample_stats()).unwrap();
        value["columns"][1]["impute_value"]["value"] = "Excellent".into();
        assert!(Stats::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_non_finite_statistic_is_never_written() {
        let stats = sample_stats();
        let mut columns = stats.columns().to_vec();
        columns[0].upper_bound = Some(f64::INFINITY);
        let broken = Stats::new(
            &registry(),
            3,
            CoercionSettings::default(),
            0.25,
            columns,
            stats.baseline().clone(),
        );
        assert!(matches!(
            broken.to_json(),
            Err(PipelineError::StatsMismatch(_))
        ));
    }
}
