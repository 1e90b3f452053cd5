//! Default schema for the monthly credit-score dataset.

use super::derived::{Comparison, DerivedFeature, ZeroDenominator};
use super::registry::SchemaRegistry;
use super::spec::{BoundSpec, CleaningPolicy, ColumnSpec, SemanticType};
use crate::error::Result;

/// Name of the supervised label column.
pub const LABEL_COLUMN: &str = "Credit_Score";

/// Name of the customer key used for partitioning.
pub const CUSTOMER_KEY: &str = "Customer_ID";

/// Sentinel tokens observed in the raw monthly extracts.
pub const DEFAULT_SENTINELS: &[&str] = &["_", "__10000__", "!@9#%8", "NA", "nan", "null"];

fn capped(name: &str, corruption: Option<f64>) -> ColumnSpec {
    let spec =
        ColumnSpec::numeric(name, CleaningPolicy::Cap).with_bounds(BoundSpec::percentiles(1.0, 99.0));
    match corruption {
        Some(t) => spec.with_corruption_threshold(t),
        None => spec,
    }
}

/// The default column table.
pub fn credit_score_registry() -> Result<SchemaRegistry> {
    let columns = vec![
        ColumnSpec::identifier("ID", CleaningPolicy::Drop),
        ColumnSpec::identifier(CUSTOMER_KEY, CleaningPolicy::Keep),
        ColumnSpec::identifier("Month", CleaningPolicy::Drop),
        ColumnSpec::identifier("Name", CleaningPolicy::Drop),
        ColumnSpec::identifier("SSN", CleaningPolicy::Drop),
        ColumnSpec::numeric("Age", CleaningPolicy::Cap)
            .with_bounds(BoundSpec::fixed(18.0, 70.0))
            .with_corruption_threshold(120.0),
        ColumnSpec::categorical("Occupation"),
        capped("Annual_Income", Some(1e7)),
        capped("Monthly_Inhand_Salary", None),
        capped("Num_Bank_Accounts", Some(100.0)),
        capped("Num_Credit_Card", Some(100.0)),
        capped("Interest_Rate", Some(100.0)),
        capped("Num_of_Loan", Some(50.0)),
        ColumnSpec::identifier("Type_of_Loan", CleaningPolicy::Drop),
        // Negative delays are early payments and are never lower-capped.
        ColumnSpec::numeric("Delay_from_due_date", CleaningPolicy::Cap)
            .with_bounds(BoundSpec::upper_percentile(99.0)),
        capped("Num_of_Delayed_Payment", Some(100.0)),
        capped("Changed_Credit_Limit", None),
        capped("Num_Credit_Inquiries", Some(100.0)),
        ColumnSpec::categorical("Credit_Mix").informative(),
        capped("Outstanding_Debt", None),
        capped("Credit_Utilization_Ratio", None),
        ColumnSpec::duration("Credit_History_Age").with_bounds(BoundSpec::percentiles(1.0, 99.0)),
        ColumnSpec::categorical("Payment_of_Min_Amount"),
        capped("Total_EMI_per_month", Some(1e5)),
        capped("Amount_invested_monthly", Some(1e5)),
        ColumnSpec::categorical("Payment_Behaviour").informative(),
        capped("Monthly_Balance", Some(1e6)).robust_mean(),
        ColumnSpec::new(
            LABEL_COLUMN,
            SemanticType::Categorical,
            CleaningPolicy::Keep,
        ),
    ];

    let derived = vec![
        DerivedFeature::ratio(
            "debt_to_income",
            "Outstanding_Debt",
            "Annual_Income",
            ZeroDenominator::AddOne,
        ),
        DerivedFeature::ratio(
            "emi_to_salary",
            "Total_EMI_per_month",
            "Monthly_Inhand_Salary",
            ZeroDenominator::Zero,
        ),
        DerivedFeature::flag(
            "has_delayed_payments",
            "Num_of_Delayed_Payment",
            Comparison::Gt,
            0.0,
        ),
    ];

    SchemaRegistry::with_derived(columns, derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_is_valid() {
        let registry = credit_score_registry().unwrap();
        assert!(registry.get(LABEL_COLUMN).is_some());
        assert_eq!(registry.derived.len(), 3);
        assert_eq!(
            registry.get("Delay_from_due_date").unwrap().bounds,
            BoundSpec::upper_percentile(99.0)
        );
    }

    #[test]
    fn test_default_registry_resolves_full_header() {
        let registry = credit_score_registry().unwrap();
        let header: Vec<String> = registry.columns.iter().map(|c| c.name.clone()).collect();
        assert_eq!(registry.resolve(&header).unwrap().len(), header.len());
    }
}
