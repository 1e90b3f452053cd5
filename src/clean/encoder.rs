//! Categorical encoder.
//!
//! The vocabulary is fixed at fit time: observed labels in lexicographic
//! order followed by the synthetic unknown label. Encoding never fails and
//! never drops a row; anything outside the vocabulary lands in the unknown
//! bucket.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered category labels; the last entry is always the unknown bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    labels: Vec<String>,
}

/// One-hot encoding of a single value.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub indicators: Vec<f64>,
    /// A present value that was not seen at fit time.
    pub unseen: bool,
}

impl Vocabulary {
    /// Learn the vocabulary from observed (non-missing) labels.
    ///
    /// A label equal to `unknown_label` folds into the unknown bucket.
    pub fn fit<'a, I>(observed: I, unknown_label: &str) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut labels: Vec<String> = observed
            .into_iter()
            .filter(|label| *label != unknown_label)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .map(str::to_owned)
            .collect();
        labels.push(unknown_label.to_owned());
        Self { labels }
    }

    /// All labels, unknown bucket last.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Labels seen at fit time.
    pub fn observed(&self) -> &[String] {
        &self.labels[..self.unknown_index()]
    }

    pub fn unknown_label(&self) -> &str {
        &self.labels[self.unknown_index()]
    }

    pub fn unknown_index(&self) -> usize {
        self.labels.len() - 1
    }

    /// Indicator width, including the unknown bucket.
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.observed().iter().position(|l| l == label)
    }

    /// Encode a present value, or `None` for missing.
    pub fn encode(&self, value: Option<&str>) -> Encoded {
        let (index, unseen) = match value {
            Some(label) => match self.index_of(label) {
                Some(i) => (i, false),
                None => (self.unknown_index(), label != self.unknown_label()),
            },
            None => (self.unknown_index(), false),
        };
        let mut indicators = vec![0.0; self.width()];
        indicators[index] = 1.0;
        Encoded { indicators, unseen }
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        if labels.is_empty() {
            return Err("vocabulary must contain at least the unknown label".to_owned());
        }
        let distinct: std::collections::HashSet<&String> = labels.iter().collect();
        if distinct.len() != labels.len() {
            return Err("vocabulary labels must be distinct".to_owned());
        }
        Ok(Self { labels })
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.labels
    }
}

/// Most frequent label; ties go to the lexicographically smallest.
pub fn mode<'a, I>(observed: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in observed {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_owned())
}
