//! Median imputation fitted on the training partition.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::finite_median;

/// Per-column medians learned at fit time and replayed on every later row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    statistics: Vec<f64>,
}

impl MedianImputer {
    /// Learn one median per column of `x`.
    ///
    /// A column without a single finite value cannot be imputed; training
    /// must stop rather than invent a value for it.
    pub fn fit(x: &DMatrix<f64>, feature_names: &[String]) -> Result<Self, AppError> {
        let mut statistics = Vec::with_capacity(x.ncols());
        for (j, column) in x.column_iter().enumerate() {
            let median = finite_median(column.iter().copied()).ok_or_else(|| {
                let name = feature_names.get(j).map(String::as_str).unwrap_or("<unnamed>");
                AppError::InsufficientData(format!(
                    "feature column `{name}` has no numeric values in the training partition"
                ))
            })?;
            statistics.push(median);
        }
        Ok(Self { statistics })
    }

    pub fn statistics(&self) -> &[f64] {
        &self.statistics
    }

    pub fn transform_matrix(&self, x: &mut DMatrix<f64>) {
        for (j, mut column) in x.column_iter_mut().enumerate() {
            let fill = self.statistics[j];
            for v in column.iter_mut() {
                if v.is_nan() {
                    *v = fill;
                }
            }
        }
    }

    pub fn transform_row(&self, row: &mut [f64]) {
        for (v, &fill) in row.iter_mut().zip(&self.statistics) {
            if v.is_nan() {
                *v = fill;
            }
        }
    }
}
