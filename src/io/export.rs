//! Export hold-out predictions to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::domain::HoldoutPoint;
use crate::error::AppError;

/// Write one row per evaluation-tail observation.
pub fn write_holdout_csv(path: &Path, points: &[HoldoutPoint]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    let mut file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "date,actual,predicted,residual")
        .map_err(|e| AppError::Io(format!("Failed to write export CSV header: {e}")))?;

    for p in points {
        writeln!(
            file,
            "{},{:.4},{:.4},{:.4}",
            p.date, p.actual, p.predicted, p.residual
        )
        .map_err(|e| AppError::Io(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
