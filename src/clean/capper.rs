//! Outlier capper.

use serde::{Deserialize, Serialize};

/// Fitted clipping bounds; `None` leaves that side unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Which side, if any, a value was clipped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapOutcome {
    Unchanged,
    Lower,
    Upper,
}

impl Bounds {
    pub const UNBOUNDED: Self = Self {
        lower: None,
        upper: None,
    };

    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Clip `value` into `[lower, upper]`.
    pub fn cap(&self, value: f64) -> f64 {
        self.cap_with_outcome(value).0
    }

    pub fn cap_with_outcome(&self, value: f64) -> (f64, CapOutcome) {
        if let Some(lo) = self.lower
            && value < lo
        {
            return (lo, CapOutcome::Lower);
        }
        if let Some(hi) = self.upper
            && value > hi
        {
            return (hi, CapOutcome::Upper);
        }
        (value, CapOutcome::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_sided_upper_bound() {
        let bounds = Bounds::new(None, Some(28.81));
        assert_eq!(bounds.cap(30.0), 28.81);
        assert_eq!(bounds.cap(-6.49), -6.49);
        assert_eq!(bounds.cap_with_outcome(30.0).1, CapOutcome::Upper);
    }

    #[test]
    fn test_fixed_pair() {
        let bounds = Bounds::new(Some(18.0), Some(70.0));
        assert_eq!(bounds.cap(14.0), 18.0);
        assert_eq!(bounds.cap(95.0), 70.0);
        assert_eq!(bounds.cap_with_outcome(33.0), (33.0, CapOutcome::Unchanged));
    }

    #[test]
    fn test_unbounded_is_identity() {
        assert_eq!(Bounds::UNBOUNDED.cap(-1e12), -1e12);
        assert!(Bounds::default().is_unbounded());
    }
}
