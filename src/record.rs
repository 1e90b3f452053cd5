//! Raw and coerced record types.
//!
//! A [`RawRecord`] is what ingestion hands over: untyped cells keyed by column
//! name. The coercion stage resolves every cell exactly once into a [`Cell`],
//! and nothing downstream ever re-inspects raw text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An untyped cell value as delivered by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Number(f64),
    Text(String),
    Absent,
}

impl RawCell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawCell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<&str>> for RawCell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Absent, Self::from)
    }
}

/// Mapping from raw column name to raw cell.
pub type RawRecord = BTreeMap<String, RawCell>;

/// Build a [`RawRecord`] from `(column, cell)` pairs.
pub fn raw_record<K, V, I>(cells: I) -> RawRecord
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<RawCell>,
{
    cells
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Why a cell ended up missing after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// The cell was absent, empty or whitespace-only.
    Absent,
    /// The cell matched a sentinel token.
    Sentinel,
    /// The cell could not be parsed as its declared type.
    Unparsable,
    /// The value exceeded the column's corruption threshold.
    Corrupted,
}

/// A typed cell after coercion and corruption detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Numeric(f64),
    Category(String),
    Missing(MissingReason),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Category(c) => Some(c.as_str()),
            _ => None,
        }
    }
}

/// Coerced record, one cell per resolved column in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub cells: Vec<Cell>,
}

/// Partition label attached to a collection of raw records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Holdout,
    Production,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Holdout => "holdout",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labelled collection of raw records with its dataset header.
#[derive(Debug, Clone)]
pub struct Partition {
    split: Split,
    columns: Vec<String>,
    records: Vec<RawRecord>,
}

impl Partition {
    /// Build a partition with an explicit header.
    pub fn new(split: Split, columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        Self {
            split,
            columns,
            records,
        }
    }

    /// Build a partition whose header is the sorted union of record keys.
    pub fn from_records(split: Split, records: Vec<RawRecord>) -> Self {
        let columns: Vec<String> = records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        Self::new(split, columns, records)
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Relabel the same records, e.g. to replay Train through transform-only mode.
    pub fn with_split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cell_deserializes_untagged() {
        let record: RawRecord =
            serde_json::from_str(r#"{"Age": "23", "Annual_Income": 19114.12, "Name": null}"#)
                .unwrap();
        assert_eq!(record["Age"], RawCell::text("23"));
        assert_eq!(record["Annual_Income"], RawCell::Number(19114.12));
        assert_eq!(record["Name"], RawCell::Absent);
    }

    #[test]
    fn test_partition_header_from_records() {
        let records = vec![
            raw_record([("b", "1"), ("a", "2")]),
            raw_record([("c", "3")]),
        ];
        let partition = Partition::from_records(Split::Train, records);
        assert_eq!(partition.columns(), &["a", "b", "c"]);
        assert_eq!(partition.len(), 2);
    }

    #[test]
    fn test_cell_accessors() {
        assert_eq!(Cell::Numeric(1.5).as_f64(), Some(1.5));
        assert_eq!(Cell::Category("Good".to_owned()).as_category(), Some("Good"));
        assert!(Cell::Missing(MissingReason::Corrupted).is_missing());
    }
}
