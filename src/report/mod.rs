//! Reporting utilities: hold-out misses and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::HoldoutPoint;

/// Largest hold-out misses on each side (top-N each).
#[derive(Debug, Clone)]
pub struct HoldoutMisses {
    /// Actual above prediction (positive residual).
    pub under: Vec<HoldoutPoint>,
    /// Actual below prediction (negative residual).
    pub over: Vec<HoldoutPoint>,
}

/// Rank hold-out rows by residual in both directions.
pub fn largest_misses(holdout: &[HoldoutPoint], top_n: usize) -> HoldoutMisses {
    let mut sorted = holdout.to_vec();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));

    let under = sorted.iter().filter(|p| p.residual > 0.0).take(top_n).cloned().collect();
    let over = sorted.iter().rev().filter(|p| p.residual < 0.0).take(top_n).cloned().collect();

    HoldoutMisses { under, over }
}
