//! Imputer.
//!
//! Replaces the remaining missing markers with the fitted impute value and
//! reports whether the original observation was absent, which feeds the
//! `<column>_was_missing` companion feature.

use crate::record::Cell;

/// A filled value together with its pre-imputation missingness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Imputed<T> {
    pub value: T,
    pub was_missing: bool,
}

impl<T> Imputed<T> {
    /// Indicator value for the companion feature.
    pub fn missing_indicator(&self) -> f64 {
        if self.was_missing { 1.0 } else { 0.0 }
    }
}

/// Fill a numeric cell. Non-numeric cells in a numeric column count as missing.
pub fn impute_numeric(cell: &Cell, fill: f64) -> Imputed<f64> {
    match cell {
        Cell::Numeric(v) => Imputed {
            value: *v,
            was_missing: false,
        },
        Cell::Category(_) | Cell::Missing(_) => Imputed {
            value: fill,
            was_missing: true,
        },
    }
}

/// Fill a categorical cell with the fitted category.
pub fn impute_category<'a>(cell: &'a Cell, fill: &'a str) -> Imputed<&'a str> {
    match cell {
        Cell::Category(c) => Imputed {
            value: c.as_str(),
            was_missing: false,
        },
        Cell::Numeric(_) | Cell::Missing(_) => Imputed {
            value: fill,
            was_missing: true,
        },
    }
}
