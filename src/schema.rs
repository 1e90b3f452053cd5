//! Schema registry: per-column semantic types and cleaning policies.
//!
//! - [`spec`]: the [`ColumnSpec`] declaration and its enums
//! - [`derived`]: ratio and flag feature declarations
//! - [`registry`]: the validated table and its resolution against a dataset header
//! - [`credit`]: the default table for the monthly credit-score dataset

pub mod credit;
pub mod derived;
pub mod registry;
pub mod spec;

pub use derived::{Comparison, DerivedFeature, ZeroDenominator};
pub use registry::{SCHEMA_VERSION, SchemaRegistry};
pub use spec::{
    BoundSpec, CaseNormalization, CleaningPolicy, ColumnSpec, DEFAULT_UNKNOWN_LABEL, SemanticType,
};
