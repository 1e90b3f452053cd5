//! Per-run report of recovered cell-level conditions.
//!
//! Nothing in here is an error. Unparsable cells, corrupted magnitudes and
//! unseen categories are all recovered inside the row; the report only
//! counts them per column so callers can apply their own thresholds.

use crate::record::{MissingReason, Split};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Which pipeline entry point produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    FitTransform,
    Transform,
}

/// A recovered condition observed in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Absent,
    Sentinel,
    ParseError,
    Corrupted,
    UnseenCategory,
    CappedLower,
    CappedUpper,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Sentinel => "sentinel",
            Self::ParseError => "parse_error",
            Self::Corrupted => "corrupted",
            Self::UnseenCategory => "unseen_category",
            Self::CappedLower => "capped_lower",
            Self::CappedUpper => "capped_upper",
        }
    }
}

impl From<MissingReason> for Condition {
    fn from(reason: MissingReason) -> Self {
        match reason {
            MissingReason::Absent => Self::Absent,
            MissingReason::Sentinel => Self::Sentinel,
            MissingReason::Unparsable => Self::ParseError,
            MissingReason::Corrupted => Self::Corrupted,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition counts for one feature column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnCounts {
    pub name: String,
    pub absent: usize,
    pub sentinels: usize,
    pub parse_errors: usize,
    pub corrupted: usize,
    pub unseen_categories: usize,
    pub capped_lower: usize,
    pub capped_upper: usize,
}

impl ColumnCounts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, condition: Condition) {
        *self.slot(condition) += 1;
    }

    pub fn get(&self, condition: Condition) -> usize {
        match condition {
            Condition::Absent => self.absent,
            Condition::Sentinel => self.sentinels,
            Condition::ParseError => self.parse_errors,
            Condition::Corrupted => self.corrupted,
            Condition::UnseenCategory => self.unseen_categories,
            Condition::CappedLower => self.capped_lower,
            Condition::CappedUpper => self.capped_upper,
        }
    }

    /// Cells that were missing after coercion, and therefore imputed.
    pub fn imputed(&self) -> usize {
        self.absent + self.sentinels + self.parse_errors + self.corrupted
    }

    fn slot(&mut self, condition: Condition) -> &mut usize {
        match condition {
            Condition::Absent => &mut self.absent,
            Condition::Sentinel => &mut self.sentinels,
            Condition::ParseError => &mut self.parse_errors,
            Condition::Corrupted => &mut self.corrupted,
            Condition::UnseenCategory => &mut self.unseen_categories,
            Condition::CappedLower => &mut self.capped_lower,
            Condition::CappedUpper => &mut self.capped_upper,
        }
    }
}

/// Report returned by every pipeline run alongside the feature matrix.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub split: Split,

    /// Stats the run was transformed with
    pub stats_id: Uuid,

    pub rows: usize,
    pub output_columns: usize,

    /// Per feature column, in schema order
    pub columns: Vec<ColumnCounts>,

    /// Label cells that were not a recognised credit score
    pub unparsed_labels: usize,

    #[serde(with = "duration_serde")]
    pub duration: std::time::Duration,
}

impl RunReport {
    pub fn column(&self, name: &str) -> Option<&ColumnCounts> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Count of `condition` in `column`; zero for unknown columns.
    pub fn count(&self, column: &str, condition: Condition) -> usize {
        self.column(column).map_or(0, |c| c.get(condition))
    }

    /// Share of rows in `column` that hit `condition`.
    pub fn ratio(&self, column: &str, condition: Condition) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.count(column, condition) as f64 / self.rows as f64
    }

    pub fn total(&self, condition: Condition) -> usize {
        self.columns.iter().map(|c| c.get(condition)).sum()
    }

    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "{} on {}: {} rows → {} features; {} imputed, {} parse errors, {} corrupted, {} unseen categories, {} capped; {:.2}s",
            match self.mode {
                RunMode::FitTransform => "Fit+transform",
                RunMode::Transform => "Transform",
            },
            self.split,
            self.rows,
            self.output_columns,
            self.columns.iter().map(ColumnCounts::imputed).sum::<usize>(),
            self.total(Condition::ParseError),
            self.total(Condition::Corrupted),
            self.total(Condition::UnseenCategory),
            self.total(Condition::CappedLower) + self.total(Condition::CappedUpper),
            self.duration.as_secs_f64()
        )
    }
}

mod duration_serde {
    use serde::{Serializer, ser::SerializeStruct as _};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Duration", 2)?;
        state.serialize_field("secs", &duration.as_secs())?;
        state.serialize_field("nanos", &duration.subsec_nanos())?;
        state.end()
    }
}
