//! Gradient-boosted regression trees (squared-error objective).
//!
//! Boosting loop per round:
//! - gradients `pred - y`, hessians `1`
//! - Bernoulli row subsample and a per-tree column subsample from a seeded `StdRng`
//! - grow one histogram tree (see `tree`) and add it to the ensemble
//!
//! With a fixed seed the fitted ensemble is identical across runs and thread
//! counts.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::mean;
use crate::models::tree::{BinnedMatrix, RegressionTree, TreeBuilder, TreeOptions};

/// Loss minimised by the booster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[serde(rename = "reg:squarederror")]
    SquaredError,
}

/// Booster hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows each tree sees.
    pub subsample: f64,
    /// Fraction of columns each tree may split on.
    pub colsample_bytree: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    pub max_bin: usize,
    pub seed: u64,
    pub objective: Objective,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 0.9,
            colsample_bytree: 0.9,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            max_bin: 256,
            seed: 42,
            objective: Objective::SquaredError,
        }
    }
}

impl GbmParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_estimators == 0 {
            return Err(AppError::Config("n_estimators must be > 0.".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::Config("learning_rate must be finite and > 0.".into()));
        }
        for (name, v) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(AppError::Config(format!("{name} must be in (0, 1], got {v}.")));
            }
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return Err(AppError::Config("reg_lambda must be finite and >= 0.".into()));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(AppError::Config("min_child_weight must be finite and >= 0.".into()));
        }
        if self.max_bin < 2 {
            return Err(AppError::Config("max_bin must be >= 2.".into()));
        }
        Ok(())
    }

    fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_depth: self.max_depth,
            reg_lambda: self.reg_lambda,
            min_child_weight: self.min_child_weight,
            learning_rate: self.learning_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    params: GbmParams,
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit on a fully imputed design matrix.
    pub fn fit(x: &DMatrix<f64>, y: &[f64], params: &GbmParams) -> Result<Self, AppError> {
        params.validate()?;
        let (n, p) = x.shape();
        if n == 0 || p == 0 {
            return Err(AppError::InsufficientData(format!(
                "cannot fit a regressor on a {n}x{p} design matrix"
            )));
        }
        if y.len() != n {
            return Err(AppError::InsufficientData(format!(
                "target length {} does not match {n} feature rows",
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
            return Err(AppError::InsufficientData(
                "training data contains non-finite values after imputation".into(),
            ));
        }

        let binned = BinnedMatrix::from_matrix(x, params.max_bin);
        let rows: Vec<Vec<f64>> = x.row_iter().map(|r| r.iter().copied().collect()).collect();
        let base_score = mean(y).unwrap_or(0.0);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut preds = vec![base_score; n];
        let hess = vec![1.0; n];
        let n_cols = ((p as f64 * params.colsample_bytree) as usize).clamp(1, p);
        let tree_opts = params.tree_options();

        let mut trees = Vec::with_capacity(params.n_estimators);
        for round in 0..params.n_estimators {
            let grad: Vec<f64> = preds.iter().zip(y).map(|(pred, t)| pred - t).collect();

            let mut sampled: Vec<usize> = if params.subsample < 1.0 {
                (0..n).filter(|_| rng.gen_bool(params.subsample)).collect()
            } else {
                (0..n).collect()
            };
            if sampled.is_empty() {
                sampled = (0..n).collect();
            }

            let mut features = rand::seq::index::sample(&mut rng, p, n_cols).into_vec();
            features.sort_unstable();

            let tree = TreeBuilder::new(&binned, &grad, &hess, &features, tree_opts).grow(sampled);
            for (pred, row) in preds.iter_mut().zip(&rows) {
                *pred += tree.predict(row);
            }
            trees.push(tree);

            if (round + 1) % 100 == 0 {
                let sse: f64 = preds.iter().zip(y).map(|(pred, t)| (pred - t).powi(2)).sum();
                let rmse = (sse / n as f64).sqrt();
                debug!(round = round + 1, train_rmse = rmse, "boosting progress");
            }
        }

        Ok(Self {
            params: *params,
            base_score,
            n_features: p,
            trees,
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_well_formed(&self) -> bool {
        self.base_score.is_finite() && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> GbmParams {
        GbmParams {
            n_estimators: 60,
            max_depth: 3,
            learning_rate: 0.3,
            ..GbmParams::default()
        }
    }

    fn step_data() -> (DMatrix<f64>, Vec<f64>) {
        let n = 80;
        let mut data = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a = i as f64;
            let b = (i % 7) as f64;
            data.push(a);
            data.push(b);
            let level = if a < 40.0 { 100.0 } else { 200.0 };
            y.push(level + b);
        }
        (DMatrix::from_row_slice(n, 2, &data), y)
    }

    #[test]
    fn learns_a_step_function() {
        let (x, y) = step_data();
        let model = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(model.n_trees(), 60);
        assert!(model.is_well_formed());
        assert!((model.predict(&[10.0, 3.0]) - 103.0).abs() < 5.0);
        assert!((model.predict(&[70.0, 3.0]) - 203.0).abs() < 5.0);
    }

    #[test]
    fn same_seed_same_model() {
        let (x, y) = step_data();
        let a = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        let b = GradientBoostedRegressor::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_params() {
        let (x, y) = step_data();
        let params = GbmParams {
            subsample: 0.0,
            ..GbmParams::default()
        };
        assert!(matches!(
            GradientBoostedRegressor::fit(&x, &y, &params),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn rejects_missing_values() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, f64::NAN]);
        assert!(GradientBoostedRegressor::fit(&x, &[1.0, 2.0], &small_params()).is_err());
    }
}
