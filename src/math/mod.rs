//! Numeric utilities: robust summary statistics and evaluation metrics.

pub mod metrics;
pub mod stats;

pub use metrics::*;
pub use stats::*;
