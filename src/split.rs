//! Deterministic Train/Holdout partitioning.
//!
//! Records are assigned by hashing a key column, so every record of one
//! customer lands on the same side and the two partitions are disjoint at
//! customer level. The assignment depends only on the key text, never on
//! record order or on the rest of the batch.

use crate::error::{PipelineError, Result};
use crate::record::{Partition, RawCell, RawRecord, Split};
use sha2::{Digest as _, Sha256};
use tracing::info;

/// Position of `key` in `[0, 1)`, stable across runs and platforms.
pub fn key_position(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    // 53 bits keep the conversion to f64 exact.
    (u64::from_be_bytes(prefix) >> 11) as f64 / (1u64 << 53) as f64
}

fn key_text(record: &RawRecord, key: &str) -> String {
    match record.get(key) {
        Some(RawCell::Text(s)) => s.trim().to_owned(),
        Some(RawCell::Number(v)) => v.to_string(),
        Some(RawCell::Absent) | None => String::new(),
    }
}

/// Split `source` into (Train, Holdout) by hashing the `key` column.
///
/// A record goes to Holdout when its key position is below `holdout_fraction`.
pub fn split_by_key(
    source: Partition,
    key: &str,
    holdout_fraction: f64,
) -> Result<(Partition, Partition)> {
    if !(0.0..=1.0).contains(&holdout_fraction) {
        return Err(PipelineError::config(format!(
            "holdout fraction {holdout_fraction} outside [0, 1]"
        )));
    }
    if !source.columns().iter().any(|c| c == key) {
        return Err(PipelineError::config(format!(
            "split key '{key}' is not a dataset column"
        )));
    }

    let columns = source.columns().to_vec();
    let (holdout, train): (Vec<RawRecord>, Vec<RawRecord>) = source
        .records()
        .iter()
        .cloned()
        .partition(|r| key_position(&key_text(r, key)) < holdout_fraction);

    info!(
        train = train.len(),
        holdout = holdout.len(),
        key,
        "Split partition by key"
    );
    Ok((
        Partition::new(Split::Train, columns.clone(), train),
        Partition::new(Split::Holdout, columns, holdout),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::raw_record;
    use std::collections::HashSet;

    fn source() -> Partition {
        let records = (0..200)
            .flat_map(|c| {
                (1..=4).map(move |month| {
                    raw_record([
                        ("Customer_ID", format!("CUS_{c:04}")),
                        ("Month", month.to_string()),
                    ])
                })
            })
            .collect();
        Partition::from_records(Split::Train, records)
    }

    fn customers(p: &Partition) -> HashSet<String> {
        p.records()
            .iter()
            .map(|r| key_text(r, "Customer_ID"))
            .collect()
    }

    #[test]
    fn test_customers_are_disjoint() {
        let (train, holdout) = split_by_key(source(), "Customer_ID", 0.2).unwrap();
        assert_eq!(train.len() + holdout.len(), 800);
        assert_eq!(train.split(), Split::Train);
        assert_eq!(holdout.split(), Split::Holdout);
        assert!(customers(&train).is_disjoint(&customers(&holdout)));
        assert!(!holdout.is_empty());
        assert!(holdout.len() < train.len());
    }

    #[test]
    fn test_split_is_deterministic() {
        let (a, _) = split_by_key(source(), "Customer_ID", 0.3).unwrap();
        let (b, _) = split_by_key(source(), "Customer_ID", 0.3).unwrap();
        assert_eq!(a.records(), b.records());
    }

    #[test]
    fn test_key_position_range() {
        for key in ["", "CUS_0xd40", "CUS_0x21b1"] {
            let p = key_position(key);
            assert!((0.0..1.0).contains(&p));
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(split_by_key(source(), "Customer_ID", 1.5).is_err());
        assert!(split_by_key(source(), "SSN", 0.2).is_err());
    }
}
