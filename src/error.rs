//! Crate-wide error type.
//!
//! Every fallible library function returns `Result<_, AppError>`. The binary
//! prints the message and exits with [`AppError::exit_code`]:
//!
//! - `2`: invalid input (per-request validation, bad flags)
//! - `3`: dataset problems (missing file, unusable columns)
//! - `4`: model artifact problems and other internal I/O failures

use std::path::PathBuf;

/// Per-request validation failure.
///
/// These never mutate shared state: the request is rejected and the
/// serving context stays as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    Invalid(String),

    /// The persisted `feature_names` ask for columns the request assembly
    /// cannot produce (catalog and saved model have drifted apart).
    #[error("Missing engineered features: {}", .missing.join(", "))]
    FeatureCatalogDrift { missing: Vec<String> },
}

impl ValidationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Dataset not found at {}", .path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Failed to read dataset: {0}")]
    DatasetRead(String),

    #[error("Target column `{column}` is not available in the cleaned dataset.")]
    TargetColumnMissing { column: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Missing trained model at {}. Run `ef train` first.", .path.display())]
    ModelArtifactMissing { path: PathBuf },

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Already shown to the user (as a JSON error body); the binary only
    /// sets the exit code.
    #[error(transparent)]
    Reported(Box<AppError>),
}

impl AppError {
    /// Mark an error whose message has already been written out.
    pub fn reported(self) -> Self {
        match self {
            AppError::Reported(_) => self,
            other => AppError::Reported(Box::new(other)),
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, AppError::Reported(_))
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Reported(inner) => inner.exit_code(),
            AppError::Validation(_) | AppError::Config(_) => 2,
            AppError::DatasetNotFound { .. }
            | AppError::DatasetRead(_)
            | AppError::TargetColumnMissing { .. }
            | AppError::InsufficientData(_) => 3,
            AppError::ModelArtifactMissing { .. } | AppError::Artifact(_) | AppError::Io(_) => 4,
        }
    }

    /// HTTP-equivalent status for a transport boundary: 400 for rejected
    /// requests, 500 for everything the caller could not have fixed.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Reported(inner) => inner.status_code(),
            AppError::Validation(_) => 400,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
