//! Process-scoped serving state.
//!
//! Built once at startup and then only read: prediction borrows it through
//! [`ServingContext::predictor`], so concurrent callers need no locking.

use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::domain::{CleanTable, DateOrder, ProjectPaths, TrainingReport, unresolvable_features, user_feature_keys};
use crate::error::AppError;
use crate::io::{RecentObservations, latest_observations, load_clean_dataset, read_model_artifact, read_training_report};
use crate::models::FittedModel;
use crate::predict::Predictor;
use crate::scenario::ScenarioSet;

/// Rows shown as "recent observations".
pub const RECENT_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct ServingContext {
    model: FittedModel,
    trained_at: Option<DateTime<Utc>>,
    scenarios: ScenarioSet,
    report: Option<TrainingReport>,
    recent: RecentObservations,
    default_date: NaiveDate,
}

impl ServingContext {
    /// Load the artifact, rebuild scenarios from the dataset and pick up the
    /// optional training report.
    ///
    /// A missing or corrupt artifact aborts startup; a missing report does not.
    pub fn load(paths: &ProjectPaths, date_order: DateOrder) -> Result<Self, AppError> {
        let artifact = read_model_artifact(&paths.model)?;
        let table = load_clean_dataset(&paths.data, date_order)?;
        let recent = latest_observations(&paths.data, RECENT_ROWS, date_order)?;
        let report = read_training_report(&paths.report);

        let mut ctx = Self::from_parts(artifact.model, &table, report, recent);
        ctx.trained_at = Some(artifact.trained_at);
        info!(
            model = %paths.model.display(),
            features = ctx.model.feature_names().len(),
            default_date = %ctx.default_date,
            "serving context ready"
        );
        Ok(ctx)
    }

    /// Assemble a context from already-loaded pieces.
    pub fn from_parts(
        model: FittedModel,
        table: &CleanTable,
        report: Option<TrainingReport>,
        recent: RecentObservations,
    ) -> Self {
        let unresolvable = unresolvable_features(model.feature_names());
        if !unresolvable.is_empty() {
            warn!(
                columns = ?unresolvable,
                "model expects features that requests cannot supply; predictions will be rejected"
            );
        }

        let scenarios = ScenarioSet::from_table(table, &user_feature_keys());
        let default_date = recent
            .rows
            .last()
            .map(|r| r.date)
            .unwrap_or_else(|| Local::now().date_naive());

        Self {
            model,
            trained_at: None,
            scenarios,
            report,
            recent,
            default_date,
        }
    }

    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(&self.model, &self.scenarios)
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn scenarios(&self) -> &ScenarioSet {
        &self.scenarios
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    pub fn recent(&self) -> &RecentObservations {
        &self.recent
    }

    pub fn default_date(&self) -> NaiveDate {
        self.default_date
    }
}
