//! Cell-level cleaning stages.
//!
//! Each stage is a pure function of a value and, where needed, the fitted
//! Stats, so the orchestrator can run them across rows in parallel.
//!
//! Stage order: [`coerce`] → [`corruption`] → [`capper`] → [`imputer`] →
//! [`encoder`] → [`derived`].

use crate::record::{Cell, CleanRecord, MissingReason, RawCell, RawRecord};
use crate::schema::{CleaningPolicy, ColumnSpec};
use rayon::prelude::*;

pub mod capper;
pub mod coerce;
pub mod corruption;
pub mod derived;
pub mod encoder;
pub mod imputer;

pub use capper::{Bounds, CapOutcome};
pub use coerce::{CoercionSettings, coerce_cell, parse_duration_months};
pub use encoder::{Encoded, Vocabulary};
pub use imputer::Imputed;

/// Coerce and corruption-check one record against the resolved table.
///
/// The result has one cell per spec; dropped columns are never parsed.
pub fn clean_record(
    raw: &RawRecord,
    specs: &[ColumnSpec],
    settings: &CoercionSettings,
) -> CleanRecord {
    let cells = specs
        .iter()
        .map(|spec| {
            if spec.policy == CleaningPolicy::Drop {
                return Cell::Missing(MissingReason::Absent);
            }
            let raw_cell = raw.get(&spec.name).unwrap_or(&RawCell::Absent);
            let cell = coerce_cell(raw_cell, spec, settings);
            corruption::detect(cell, spec.corruption_threshold)
        })
        .collect();
    CleanRecord { cells }
}

/// [`clean_record`] over a whole batch, preserving row order.
pub fn clean_partition(
    specs: &[ColumnSpec],
    settings: &CoercionSettings,
    records: &[RawRecord],
    parallel: bool,
) -> Vec<CleanRecord> {
    if parallel {
        records
            .par_iter()
            .map(|raw| clean_record(raw, specs, settings))
            .collect()
    } else {
        records
            .iter()
            .map(|raw| clean_record(raw, specs, settings))
            .collect()
    }
}
