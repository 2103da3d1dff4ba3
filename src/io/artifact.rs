//! Read/write the model artifact.
//!
//! The artifact is one JSON document holding everything serving needs:
//! - the frozen `feature_names` contract and target name
//! - the fitted imputer statistics and tree ensemble
//! - format version + training timestamp
//!
//! Writes go to a sibling temporary file that is renamed into place, so a
//! concurrent reader sees either the old artifact or the new one.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::FittedModel;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    #[serde(flatten)]
    pub model: FittedModel,
}

impl ModelArtifact {
    pub fn new(model: FittedModel, trained_at: DateTime<Utc>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at,
            model,
        }
    }
}

/// Atomically write `artifact` to `path`, creating parent directories.
pub fn write_model_artifact(path: &Path, artifact: &ModelArtifact) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Io(format!("Failed to create '{}': {e}", parent.display())))?;
    }

    let tmp = temp_path(path);
    let result = write_json(&tmp, artifact).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| {
            AppError::Io(format!("Failed to move artifact into '{}': {e}", path.display()))
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    info!(path = %path.display(), features = artifact.model.feature_names().len(), "model artifact written");
    Ok(())
}

/// Read and validate the artifact at `path`.
pub fn read_model_artifact(path: &Path) -> Result<ModelArtifact, AppError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::ModelArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(AppError::Artifact(format!("Failed to open '{}': {e}", path.display())));
        }
    };

    let artifact: ModelArtifact = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::Artifact(format!("Invalid model artifact '{}': {e}", path.display())))?;

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(AppError::Artifact(format!(
            "unsupported artifact format version {} (expected {ARTIFACT_FORMAT_VERSION})",
            artifact.format_version
        )));
    }
    artifact.model.check_integrity()?;
    Ok(artifact)
}

fn write_json(path: &Path, artifact: &ModelArtifact) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, artifact)
        .map_err(|e| AppError::Artifact(format!("Failed to serialize model artifact: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::Io(format!("Failed to write '{}': {e}", path.display())))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| AppError::Io(format!("Failed to sync '{}': {e}", path.display())))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "artifact".into());
    name.push(".tmp");
    path.with_file_name(name)
}
