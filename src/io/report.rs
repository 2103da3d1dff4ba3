//! Training report JSON.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::TrainingReport;
use crate::error::AppError;

pub fn write_training_report(path: &Path, report: &TrainingReport) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create report '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .map_err(|e| AppError::Io(format!("Failed to write report JSON: {e}")))?;
    info!(path = %path.display(), "training report written");
    Ok(())
}

/// The report is optional for serving: absent or unreadable yields `None`.
pub fn read_training_report(path: &Path) -> Option<TrainingReport> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "training report unavailable");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed training report");
            None
        }
    }
}
