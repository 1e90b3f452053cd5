//! Corruption detector.
//!
//! A magnitude beyond the column's declared threshold is not a large but
//! real observation; it is discarded as missing before any statistic or
//! bound sees it. The threshold always comes from the column spec.

use crate::record::{Cell, MissingReason};

/// Reclassify a numeric cell as corrupted when `|value| > threshold`.
pub fn detect(cell: Cell, threshold: Option<f64>) -> Cell {
    match cell {
        Cell::Numeric(v) if is_corrupted(v, threshold) => Cell::Missing(MissingReason::Corrupted),
        cell => cell,
    }
}

/// True when `value` would be discarded under `threshold`.
pub fn is_corrupted(value: f64, threshold: Option<f64>) -> bool {
    threshold.is_some_and(|t| value.abs() > t)
}
