//! Regression models: median imputation, histogram gradient-boosted trees,
//! and the composed pipeline that binds them to a feature contract.

pub mod gbm;
pub mod imputer;
pub mod pipeline;
pub mod tree;

pub use gbm::{GbmParams, GradientBoostedRegressor, Objective};
pub use imputer::MedianImputer;
pub use pipeline::{FittedModel, FittedPipeline};
