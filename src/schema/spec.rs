//! Column specification data structures.
//!
//! A [`ColumnSpec`] declares, for one raw column, its semantic type and how it
//! is cleaned. The whole table is static configuration and serialises to a
//! human-readable JSON document.

use serde::{Deserialize, Serialize};

/// Default label of the synthetic categorical bucket.
pub const DEFAULT_UNKNOWN_LABEL: &str = "Unknown";

/// Semantic type of a raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Categorical,
    /// Text such as "15 Years and 0 Months", converted to a month count.
    DurationString,
    Identifier,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::DurationString => "duration_string",
            Self::Identifier => "identifier",
        }
    }

    /// Kinds whose coerced value is a number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric | Self::DurationString)
    }
}

/// What the pipeline does with a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPolicy {
    /// Carried alongside the matrix (label, row key), never a feature.
    Keep,
    /// Bounded by the declared [`BoundSpec`], then imputed.
    Cap,
    /// Imputed, never bounded.
    Impute,
    /// One-hot encoded with an unknown bucket.
    Encode,
    /// Duration text converted to months, then bounded (if declared) and imputed.
    Convert,
    /// Discarded.
    Drop,
}

impl CleaningPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Cap => "cap",
            Self::Impute => "impute",
            Self::Encode => "encode",
            Self::Convert => "convert",
            Self::Drop => "drop",
        }
    }

    /// Policies whose column contributes to the feature matrix.
    pub fn emits_features(&self) -> bool {
        !matches!(self, Self::Keep | Self::Drop)
    }
}

/// How a numeric column's outlier bounds are obtained.
///
/// A `None` side is unconstrained, which is how one-sided bounds are declared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundSpec {
    #[default]
    Unbounded,
    /// Percentiles in `[0, 100]` computed over Train.
    Percentile {
        #[serde(default)]
        lower: Option<f64>,
        #[serde(default)]
        upper: Option<f64>,
    },
    /// Fixed numeric bounds.
    Fixed {
        #[serde(default)]
        lower: Option<f64>,
        #[serde(default)]
        upper: Option<f64>,
    },
}

impl BoundSpec {
    pub fn percentiles(lower: f64, upper: f64) -> Self {
        Self::Percentile {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn upper_percentile(upper: f64) -> Self {
        Self::Percentile {
            lower: None,
            upper: Some(upper),
        }
    }

    pub fn fixed(lower: f64, upper: f64) -> Self {
        Self::Fixed {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Percentile { lower, upper } | Self::Fixed { lower, upper } => {
                lower.is_none() && upper.is_none()
            }
        }
    }
}

/// Case normalisation applied to categorical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseNormalization {
    #[default]
    None,
    Lower,
    Upper,
}

/// Per-column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,

    pub kind: SemanticType,

    pub policy: CleaningPolicy,

    #[serde(default)]
    pub bounds: BoundSpec,

    /// Values with `|value| > threshold` are treated as corrupted.
    #[serde(default)]
    pub corruption_threshold: Option<f64>,

    /// Label of the synthetic unknown bucket for categorical columns.
    #[serde(default = "default_unknown_label")]
    pub missing_label: String,

    /// Emit `<name>_was_missing` and, for categoricals, impute to the unknown bucket.
    #[serde(default)]
    pub informative_missing: bool,

    /// Allows the mean to be chosen as the impute statistic.
    #[serde(default)]
    pub robust_mean_eligible: bool,

    #[serde(default)]
    pub case: CaseNormalization,

    /// Column-specific sentinel tokens, in addition to the global ones.
    #[serde(default)]
    pub sentinels: Vec<String>,
}

fn default_unknown_label() -> String {
    DEFAULT_UNKNOWN_LABEL.to_owned()
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: SemanticType, policy: CleaningPolicy) -> Self {
        Self {
            name: name.into(),
            kind,
            policy,
            bounds: BoundSpec::Unbounded,
            corruption_threshold: None,
            missing_label: default_unknown_label(),
            informative_missing: false,
            robust_mean_eligible: false,
            case: CaseNormalization::None,
            sentinels: Vec::new(),
        }
    }

    pub fn numeric(name: impl Into<String>, policy: CleaningPolicy) -> Self {
        Self::new(name, SemanticType::Numeric, policy)
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Categorical, CleaningPolicy::Encode)
    }

    pub fn duration(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::DurationString, CleaningPolicy::Convert)
    }

    pub fn identifier(name: impl Into<String>, policy: CleaningPolicy) -> Self {
        Self::new(name, SemanticType::Identifier, policy)
    }

    pub fn with_bounds(mut self, bounds: BoundSpec) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_corruption_threshold(mut self, threshold: f64) -> Self {
        self.corruption_threshold = Some(threshold);
        self
    }

    pub fn informative(mut self) -> Self {
        self.informative_missing = true;
        self
    }

    pub fn robust_mean(mut self) -> Self {
        self.robust_mean_eligible = true;
        self
    }

    pub fn with_case(mut self, case: CaseNormalization) -> Self {
        self.case = case;
        self
    }

    pub fn with_missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = label.into();
        self
    }

    pub fn with_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sentinels = sentinels.into_iter().map(Into::into).collect();
        self
    }

    pub fn emits_features(&self) -> bool {
        self.policy.emits_features()
    }

    /// Checks that kind, policy and bounds agree with each other.
    pub fn validate(&self) -> Result<(), String> {
        use CleaningPolicy as P;
        use SemanticType as K;

        let compatible = match (self.kind, self.policy) {
            (_, P::Drop) => true,
            (K::Numeric, P::Cap | P::Impute) => true,
            (K::DurationString, P::Convert | P::Cap | P::Impute) => true,
            (K::Categorical, P::Encode | P::Keep) => true,
            (K::Identifier, P::Keep) => true,
            _ => false,
        };
        if !compatible {
            return Err(format!(
                "column '{}': policy '{}' is not valid for {} columns",
                self.name,
                self.policy.as_str(),
                self.kind.as_str()
            ));
        }

        if self.policy == P::Cap && self.bounds.is_unbounded() {
            return Err(format!(
                "column '{}': policy 'cap' requires a lower or upper bound",
                self.name
            ));
        }

        if self.policy == P::Impute && !self.bounds.is_unbounded() {
            return Err(format!(
                "column '{}': policy 'impute' does not bound values; use 'cap'",
                self.name
            ));
        }

        match self.bounds {
            BoundSpec::Percentile { lower, upper } => {
                for p in [lower, upper].into_iter().flatten() {
                    if !(0.0..=100.0).contains(&p) {
                        return Err(format!(
                            "column '{}': percentile {p} outside [0, 100]",
                            self.name
                        ));
                    }
                }
                if let (Some(lo), Some(hi)) = (lower, upper)
                    && lo > hi
                {
                    return Err(format!(
                        "column '{}': lower percentile {lo} exceeds upper {hi}",
                        self.name
                    ));
                }
            }
            BoundSpec::Fixed { lower, upper } => {
                if let (Some(lo), Some(hi)) = (lower, upper)
                    && lo > hi
                {
                    return Err(format!(
                        "column '{}': lower bound {lo} exceeds upper {hi}",
                        self.name
                    ));
                }
            }
            BoundSpec::Unbounded => {}
        }

        if let Some(t) = self.corruption_threshold
            && !(t.is_finite() && t > 0.0)
        {
            return Err(format!(
                "column '{}': corruption threshold must be a positive finite number",
                self.name
            ));
        }

        if self.kind == K::Categorical && self.missing_label.trim().is_empty() {
            return Err(format!(
                "column '{}': missing-bucket label must not be empty",
                self.name
            ));
        }

        Ok(())
    }
}
