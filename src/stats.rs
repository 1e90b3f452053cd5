//! Statistics fitter and the persisted Stats artifact.
//!
//! Stats are computed once from the Train partition and then replayed,
//! read-only, on every other partition.

pub mod artifact;
pub mod fitter;
pub mod percentile;

pub use artifact::{ColumnStats, ImputeStatistic, ImputeValue, STATS_FORMAT_VERSION, Stats};
pub use fitter::{DEFAULT_ROBUST_MEAN_MAX_CV, StatisticChoice, choose_statistic, fit};
pub use percentile::PERCENTILE_METHOD;
