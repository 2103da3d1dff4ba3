//! Train and evaluate the energy-required regressor.
//!
//! Given a clean, date-sorted table:
//! - every column except the target becomes a model input, in table order
//! - the first 85% of rows fit the pipeline (imputer statistics included)
//! - the remaining rows are predicted and scored (MAE / MAPE / R²)

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use tracing::info;

use crate::domain::{CleanRow, CleanTable, HoldoutPoint, Metrics, TrainConfig, TrainingReport};
use crate::error::AppError;
use crate::fit::split::split_rows;
use crate::math::{mean_absolute_error, r2_score, safe_mape};
use crate::models::{FittedModel, FittedPipeline};

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub model: FittedModel,
    pub report: TrainingReport,
    pub holdout: Vec<HoldoutPoint>,
    pub trained_at: DateTime<Utc>,
}

pub fn train(table: &CleanTable, config: &TrainConfig) -> Result<TrainOutput, AppError> {
    let target_idx = table
        .column_index(&config.target)
        .ok_or_else(|| AppError::TargetColumnMissing {
            column: config.target.clone(),
        })?;

    let (train_rows, test_rows) = split_rows(table.rows());
    if train_rows.is_empty() || test_rows.is_empty() {
        return Err(AppError::InsufficientData(format!(
            "{} rows give a {}/{} train/test split; both partitions need at least one row",
            table.len(),
            train_rows.len(),
            test_rows.len()
        )));
    }

    if let Some(row) = table.rows().iter().find(|r| !r.values[target_idx].is_finite()) {
        return Err(AppError::InsufficientData(format!(
            "target `{}` has no value on {} even after filling",
            config.target, row.date
        )));
    }

    let feature_idx: Vec<usize> = (0..table.columns().len()).filter(|&j| j != target_idx).collect();
    let feature_names: Vec<String> = feature_idx.iter().map(|&j| table.columns()[j].clone()).collect();

    info!(
        rows = table.len(),
        train = train_rows.len(),
        test = test_rows.len(),
        features = feature_names.len(),
        target = %config.target,
        "training gradient-boosted pipeline"
    );

    let x_train = design_matrix(train_rows, &feature_idx);
    let y_train = target_values(train_rows, target_idx);
    let pipeline = FittedPipeline::fit(x_train, &y_train, &feature_names, &config.params)?;
    let model = FittedModel::new(config.target.clone(), feature_names.clone(), pipeline)?;

    let x_test = design_matrix(test_rows, &feature_idx);
    let y_test = target_values(test_rows, target_idx);
    let predicted = model.predict_matrix(&x_test)?;

    let metrics = Metrics {
        mae: mean_absolute_error(&y_test, &predicted),
        mape: safe_mape(&y_test, &predicted),
        r2: r2_score(&y_test, &predicted),
    };
    info!(mae = metrics.mae, mape = metrics.mape, r2 = metrics.r2, "hold-out evaluation");

    let holdout = test_rows
        .iter()
        .zip(y_test.iter().zip(&predicted))
        .map(|(row, (&actual, &pred))| HoldoutPoint {
            date: row.date,
            actual,
            predicted: pred,
            residual: actual - pred,
        })
        .collect();

    let trained_at = Utc::now();
    let report = TrainingReport {
        model_path: config.paths.model.display().to_string(),
        features: feature_names,
        metrics,
        target: Some(config.target.clone()),
        train_rows: Some(train_rows.len()),
        test_rows: Some(test_rows.len()),
        trained_at: Some(trained_at),
    };

    Ok(TrainOutput {
        model,
        report,
        holdout,
        trained_at,
    })
}

fn design_matrix(rows: &[CleanRow], feature_idx: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), feature_idx.len(), |i, j| rows[i].values[feature_idx[j]])
}

fn target_values(rows: &[CleanRow], target_idx: usize) -> Vec<f64> {
    rows.iter().map(|r| r.values[target_idx]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateOrder, ProjectPaths, TARGET_COLUMN};
    use crate::models::GbmParams;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn config() -> TrainConfig {
        TrainConfig {
            paths: ProjectPaths {
                data: PathBuf::from("data.csv"),
                model: PathBuf::from("models/m.json"),
                report: PathBuf::from("artifacts/r.json"),
            },
            target: TARGET_COLUMN.to_string(),
            date_order: DateOrder::MonthFirst,
            params: GbmParams {
                n_estimators: 40,
                max_depth: 3,
                learning_rate: 0.2,
                ..GbmParams::default()
            },
            export_holdout: None,
        }
    }

    fn table(n: usize) -> CleanTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                let met = 150.0 + (i % 10) as f64;
                CleanRow {
                    date: start + chrono::Days::new(i as u64),
                    values: vec![met + 2.0, met, (i % 7) as f64],
                }
            })
            .collect();
        CleanTable::new(
            vec![TARGET_COLUMN.into(), "energy_met_mu".into(), "day_of_week".into()],
            rows,
        )
    }

    #[test]
    fn trains_and_reports() {
        let out = train(&table(60), &config()).unwrap();
        assert_eq!(out.report.features, vec!["energy_met_mu".to_string(), "day_of_week".to_string()]);
        assert_eq!(out.report.train_rows, Some(51));
        assert_eq!(out.report.test_rows, Some(9));
        assert_eq!(out.holdout.len(), 9);
        assert_eq!(out.model.feature_names(), out.report.features.as_slice());
        assert!(out.report.metrics.mae.is_finite());
        assert!(out.report.metrics.mape < 0.05);
        assert_eq!(out.report.model_path, "models/m.json");
    }

    #[test]
    fn missing_target_column() {
        let mut cfg = config();
        cfg.target = "nope".into();
        assert!(matches!(train(&table(20), &cfg), Err(AppError::TargetColumnMissing { .. })));
    }

    #[test]
    fn too_few_rows() {
        assert!(matches!(train(&table(1), &config()), Err(AppError::InsufficientData(_))));
        assert!(matches!(train(&table(0), &config()), Err(AppError::InsufficientData(_))));
    }

    #[test]
    fn all_missing_feature_column_is_named() {
        let t = table(20);
        let rows = t
            .rows()
            .iter()
            .map(|r| CleanRow {
                date: r.date,
                values: vec![r.values[0], f64::NAN, r.values[2]],
            })
            .collect();
        let t = CleanTable::new(t.columns().to_vec(), rows);
        match train(&t, &config()) {
            Err(AppError::InsufficientData(msg)) => assert!(msg.contains("energy_met_mu")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
