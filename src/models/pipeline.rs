//! The frozen impute → regress pipeline and the model that owns it.
//!
//! `FittedPipeline` deliberately exposes a single `predict` entry point: the
//! imputer statistics and the regressor can only be used together.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::FeatureVector;
use crate::error::{AppError, ValidationError};
use crate::models::gbm::{GbmParams, GradientBoostedRegressor};
use crate::models::imputer::MedianImputer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    imputer: MedianImputer,
    regressor: GradientBoostedRegressor,
}

impl FittedPipeline {
    /// Fit the imputer on `x`, impute `x`, then fit the regressor.
    pub fn fit(
        mut x: DMatrix<f64>,
        y: &[f64],
        feature_names: &[String],
        params: &GbmParams,
    ) -> Result<Self, AppError> {
        let imputer = MedianImputer::fit(&x, feature_names)?;
        imputer.transform_matrix(&mut x);
        let regressor = GradientBoostedRegressor::fit(&x, y, params)?;
        Ok(Self { imputer, regressor })
    }

    pub fn predict(&self, row: &[f64]) -> Result<f64, AppError> {
        if row.len() != self.n_features() {
            return Err(AppError::Artifact(format!(
                "pipeline expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        let mut row = row.to_vec();
        self.imputer.transform_row(&mut row);
        Ok(self.regressor.predict(&row))
    }

    pub fn n_features(&self) -> usize {
        self.regressor.n_features()
    }

    pub fn is_well_formed(&self) -> bool {
        self.imputer.statistics().len() == self.regressor.n_features() && self.regressor.is_well_formed()
    }
}

/// A fitted pipeline bound to the exact input column contract it was
/// trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    target: String,
    feature_names: Vec<String>,
    pipeline: FittedPipeline,
}

impl FittedModel {
    pub fn new(target: String, feature_names: Vec<String>, pipeline: FittedPipeline) -> Result<Self, AppError> {
        let model = Self {
            target,
            feature_names,
            pipeline,
        };
        model.check_integrity()?;
        Ok(model)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Consistency between the column contract and the pipeline shape.
    pub fn check_integrity(&self) -> Result<(), AppError> {
        if self.feature_names.len() != self.pipeline.n_features() {
            return Err(AppError::Artifact(format!(
                "{} feature names but the pipeline was fitted on {} columns",
                self.feature_names.len(),
                self.pipeline.n_features()
            )));
        }
        if !self.pipeline.is_well_formed() {
            return Err(AppError::Artifact("pipeline structure is inconsistent".into()));
        }
        Ok(())
    }

    /// Predict from a row whose names match `feature_names` exactly, in order.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, AppError> {
        if features.names() != self.feature_names.as_slice() {
            let missing: Vec<String> = self
                .feature_names
                .iter()
                .filter(|name| !features.contains(name))
                .cloned()
                .collect();
            let err = if missing.is_empty() {
                ValidationError::invalid("Feature vector does not match the trained column order.")
            } else {
                ValidationError::FeatureCatalogDrift { missing }
            };
            return Err(err.into());
        }
        self.pipeline.predict(features.values())
    }

    /// Predict every row of a design matrix laid out in `feature_names` order.
    pub fn predict_matrix(&self, x: &DMatrix<f64>) -> Result<Vec<f64>, AppError> {
        x.row_iter()
            .map(|r| {
                let row: Vec<f64> = r.iter().copied().collect();
                self.pipeline.predict(&row)
            })
            .collect()
    }
}
