//! Type coercion stage.
//!
//! Resolves every raw cell into a [`Cell`] according to its column's semantic
//! type. This stage never fails: anything that cannot be read as the declared
//! type becomes [`Cell::Missing`] with the reason recorded.

use crate::record::{Cell, MissingReason, RawCell};
use crate::schema::{CaseNormalization, ColumnSpec, SemanticType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+years?\s+and\s+(\d+)\s+months?$")
        .unwrap_or_else(|e| panic!("invalid duration pattern: {e}"))
});

/// Global rules for recognising missing values in raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionSettings {
    /// Exact (post-trim) tokens treated as missing in every column
    #[serde(default)]
    pub sentinels: Vec<String>,

    /// Treat strings made only of underscores as missing
    #[serde(default = "default_true")]
    pub underscore_runs_are_missing: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CoercionSettings {
    fn default() -> Self {
        Self {
            sentinels: Vec::new(),
            underscore_runs_are_missing: true,
        }
    }
}

impl CoercionSettings {
    pub fn with_sentinels<I, S>(sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sentinels: sentinels.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn is_sentinel(&self, trimmed: &str, spec: &ColumnSpec) -> bool {
        (self.underscore_runs_are_missing && trimmed.chars().all(|c| c == '_'))
            || self.sentinels.iter().any(|s| s == trimmed)
            || spec.sentinels.iter().any(|s| s == trimmed)
    }
}

/// Coerce one raw cell to the column's declared type.
pub fn coerce_cell(raw: &RawCell, spec: &ColumnSpec, settings: &CoercionSettings) -> Cell {
    let text = match raw {
        RawCell::Absent => return Cell::Missing(MissingReason::Absent),
        RawCell::Number(v) => return coerce_number(*v, spec),
        RawCell::Text(s) => s.trim(),
    };

    if text.is_empty() {
        return Cell::Missing(MissingReason::Absent);
    }
    if settings.is_sentinel(text, spec) {
        return Cell::Missing(MissingReason::Sentinel);
    }

    match spec.kind {
        SemanticType::Numeric => parse_strict_number(text)
            .map_or(Cell::Missing(MissingReason::Unparsable), Cell::Numeric),
        SemanticType::DurationString => parse_duration_months(text)
            .map_or(Cell::Missing(MissingReason::Unparsable), Cell::Numeric),
        SemanticType::Categorical | SemanticType::Identifier => {
            Cell::Category(normalize_case(text, spec.case))
        }
    }
}

fn coerce_number(value: f64, spec: &ColumnSpec) -> Cell {
    if !value.is_finite() {
        return Cell::Missing(MissingReason::Unparsable);
    }
    match spec.kind {
        SemanticType::Numeric => Cell::Numeric(value),
        // A bare number carries no year/month structure.
        SemanticType::DurationString => Cell::Missing(MissingReason::Unparsable),
        SemanticType::Categorical | SemanticType::Identifier => {
            Cell::Category(normalize_case(&value.to_string(), spec.case))
        }
    }
}

/// Parses a finite decimal number; any trailing or leading noise rejects the cell.
pub fn parse_strict_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses "`<years>` Years and `<months>` Months" into `years * 12 + months`.
pub fn parse_duration_months(text: &str) -> Option<f64> {
    let caps = DURATION_PATTERN.captures(text.trim())?;
    let years: u32 = caps.get(1)?.as_str().parse().ok()?;
    let months: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(f64::from(years) * 12.0 + f64::from(months))
}

fn normalize_case(text: &str, case: CaseNormalization) -> String {
    match case {
        CaseNormalization::None => text.to_owned(),
        CaseNormalization::Lower => text.to_lowercase(),
        CaseNormalization::Upper => text.to_uppercase(),
    }
}
