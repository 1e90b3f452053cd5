//! Derived feature generator.
//!
//! Pure functions over capped and imputed numeric columns. Every ratio has an
//! explicit zero-denominator policy, so no derived value is ever non-finite.

use crate::schema::{DerivedFeature, ZeroDenominator};

/// Evaluate `feature` given its inputs in [`DerivedFeature::inputs`] order.
pub fn evaluate(feature: &DerivedFeature, inputs: &[f64]) -> f64 {
    match feature {
        DerivedFeature::Ratio { zero_policy, .. } => ratio(inputs[0], inputs[1], *zero_policy),
        DerivedFeature::Flag { op, threshold, .. } => {
            if op.holds(inputs[0], *threshold) {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// `numerator / denominator` under the given policy.
///
/// With [`ZeroDenominator::AddOne`] the divisor is `denominator + 1`; a divisor
/// that is still zero yields `0.0`.
pub fn ratio(numerator: f64, denominator: f64, policy: ZeroDenominator) -> f64 {
    let divisor = match policy {
        ZeroDenominator::AddOne => denominator + 1.0,
        ZeroDenominator::Zero => denominator,
    };
    if divisor == 0.0 {
        return 0.0;
    }
    let value = numerator / divisor;
    if value.is_finite() { value } else { 0.0 }
}
