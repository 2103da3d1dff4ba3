//! Shared training workflow used by the CLI.
//!
//! clean CSV -> train/evaluate -> write artifact -> write report -> optional hold-out export

use tracing::info;

use crate::domain::TrainConfig;
use crate::error::AppError;
use crate::fit::{TrainOutput, train};
use crate::io::{ModelArtifact, load_clean_dataset, write_holdout_csv, write_model_artifact, write_training_report};

/// Execute the full training pipeline and persist its outputs.
pub fn run_training(config: &TrainConfig) -> Result<TrainOutput, AppError> {
    let table = load_clean_dataset(&config.paths.data, config.date_order)?;
    let output = train(&table, config)?;

    let artifact = ModelArtifact::new(output.model.clone(), output.trained_at);
    write_model_artifact(&config.paths.model, &artifact)?;
    write_training_report(&config.paths.report, &output.report)?;

    if let Some(path) = &config.export_holdout {
        write_holdout_csv(path, &output.holdout)?;
        info!(path = %path.display(), rows = output.holdout.len(), "hold-out predictions exported");
    }

    Ok(output)
}
