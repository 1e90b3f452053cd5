//! Derived feature declarations.

use serde::{Deserialize, Serialize};

/// What a ratio does when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDenominator {
    /// Always divide by `denominator + 1`.
    AddOne,
    /// Output `0.0` when the denominator is exactly zero.
    Zero,
}

/// Comparison used by flag features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
        }
    }
}

/// A feature computed from already-cleaned numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DerivedFeature {
    Ratio {
        name: String,
        numerator: String,
        denominator: String,
        zero_policy: ZeroDenominator,
    },
    Flag {
        name: String,
        column: String,
        op: Comparison,
        threshold: f64,
    },
}

impl DerivedFeature {
    pub fn ratio(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        zero_policy: ZeroDenominator,
    ) -> Self {
        Self::Ratio {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            zero_policy,
        }
    }

    pub fn flag(
        name: impl Into<String>,
        column: impl Into<String>,
        op: Comparison,
        threshold: f64,
    ) -> Self {
        Self::Flag {
            name: name.into(),
            column: column.into(),
            op,
            threshold,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Ratio { name, .. } | Self::Flag { name, .. } => name,
        }
    }

    /// Source columns, in formula order.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Self::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
            Self::Flag { column, .. } => vec![column.as_str()],
        }
    }
}
