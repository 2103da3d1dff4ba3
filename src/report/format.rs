//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the cleaning/training code stays free of presentation concerns
//! - output changes are localized

use crate::app::context::ServingContext;
use crate::domain::{HoldoutPoint, Metrics, TrainConfig, USER_INPUT_FEATURES};
use crate::fit::TrainOutput;
use crate::predict::{AssembledRow, PREDICTION_UNIT};
use crate::report::HoldoutMisses;

/// Format the training run summary (split, booster settings, hold-out metrics).
pub fn format_training_summary(output: &TrainOutput, config: &TrainConfig) -> String {
    let mut out = String::new();
    let report = &output.report;

    out.push_str("=== ef - Energy Required Forecaster ===\n");
    out.push_str(&format!("Data: {}\n", config.paths.data.display()));
    out.push_str(&format!("Target: {}\n", config.target));
    out.push_str(&format!(
        "Rows: train={} | test={} | features={}\n",
        report.train_rows.unwrap_or(0),
        report.test_rows.unwrap_or(0),
        report.features.len()
    ));
    let p = &config.params;
    out.push_str(&format!(
        "Booster: trees={} depth={} lr={} subsample={} colsample={} lambda={} seed={}\n",
        p.n_estimators, p.max_depth, p.learning_rate, p.subsample, p.colsample_bytree, p.reg_lambda, p.seed
    ));

    out.push_str("\nHold-out metrics:\n");
    out.push_str(&format_metrics(&report.metrics));

    out.push_str("\nSaved:\n");
    out.push_str(&format!("- model : {}\n", config.paths.model.display()));
    out.push_str(&format!("- report: {}\n", config.paths.report.display()));
    if let Some(path) = &config.export_holdout {
        out.push_str(&format!("- holdout: {}\n", path.display()));
    }

    out
}

fn format_metrics(m: &Metrics) -> String {
    format!(
        "- MAE : {:.3} {PREDICTION_UNIT}\n- MAPE: {:.2}%\n- R2  : {:.4}\n",
        m.mae,
        m.mape * 100.0,
        m.r2
    )
}

/// Format the largest hold-out misses.
pub fn format_misses(misses: &HoldoutMisses) -> String {
    let mut out = String::new();

    out.push_str("Largest under-predictions (actual above model):\n");
    out.push_str(&format_holdout_table(&misses.under));
    out.push('\n');

    out.push_str("Largest over-predictions (actual below model):\n");
    out.push_str(&format_holdout_table(&misses.over));

    out
}

fn format_holdout_table(rows: &[HoldoutPoint]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<10} {:>12} {:>12} {:>12}", "date", "actual", "predicted", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<12}", "", "", "", "").trim_end());
    out.push('\n');

    for p in rows {
        out.push_str(
            format!(
                "{:<10} {:>12.2} {:>12.2} {:>12.2}",
                p.date, p.actual, p.predicted, p.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Everything a planner sees before asking for a prediction.
pub fn format_overview(ctx: &ServingContext) -> String {
    let mut out = String::new();

    out.push_str("=== ef - Energy Required Forecaster ===\n");
    out.push_str(&format!("Target: {}\n", ctx.model().target()));
    match ctx.report() {
        Some(report) => {
            out.push_str(&format!("Model: {}\n", report.model_path));
            if let Some(at) = report.trained_at.or(ctx.trained_at()) {
                out.push_str(&format!("Trained: {}\n", at.format("%Y-%m-%d %H:%M UTC")));
            }
            out.push_str("Hold-out metrics:\n");
            out.push_str(&format_metrics(&report.metrics));
        }
        None => out.push_str("Hold-out metrics: unavailable (no training report)\n"),
    }
    out.push_str(&format!("Default date: {}\n", ctx.default_date()));

    out.push_str("\nScenarios:\n");
    for preset in ctx.scenarios().iter() {
        out.push_str(&format!("- {:<7} {}\n", preset.id, preset.label));
        out.push_str(&format!("          {}\n", preset.description));
    }

    out.push_str("\nFeatures (median default):\n");
    out.push_str(format!("{:<28} {:<34} {:>12}", "key", "label", "default").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<34} {:-<12}", "", "", "").trim_end());
    out.push('\n');
    let medians = ctx.scenarios().median_values();
    for spec in &USER_INPUT_FEATURES {
        out.push_str(
            format!(
                "{:<28} {:<34} {:>12.2}",
                truncate(spec.key, 28),
                truncate(spec.label, 34),
                medians.get(spec.key).unwrap_or(0.0)
            )
            .trim_end(),
        );
        out.push('\n');
    }

    let recent = ctx.recent();
    out.push_str("\nRecent observations:\n");
    if recent.rows.is_empty() {
        out.push_str("(none)\n");
    } else {
        let mut header = format!("{:<10}", "Date");
        for h in &recent.headers {
            header.push_str(&format!(" {:>14}", truncate(h, 14)));
        }
        out.push_str(header.trim_end());
        out.push('\n');
        for row in &recent.rows {
            let mut line = format!("{:<10}", row.date);
            for cell in &row.cells {
                line.push_str(&format!(" {:>14}", truncate(cell, 14)));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    out
}

/// One prediction, optionally with the per-feature resolution trace.
pub fn format_prediction(row: &AssembledRow, prediction: f64, explain: bool) -> String {
    let mut out = format!(
        "Energy required on {} ({} scenario): {:.2} {PREDICTION_UNIT}\n",
        row.date, row.scenario, prediction
    );
    if explain {
        out.push('\n');
        for (key, source) in &row.sources {
            let value = row.features.get(key).unwrap_or(f64::NAN);
            out.push_str(&format!("{:<28} {:>12.2}  ({source:?})\n", key, value));
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureVector;
    use crate::predict::ValueSource;
    use crate::scenario::ScenarioId;
    use chrono::NaiveDate;

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Genco Hydel", 20), "Genco Hydel");
        assert_eq!(truncate("Unrestricted Peak Demand (MW)", 8), "Unrestr.");
    }

    #[test]
    fn metrics_show_mape_as_percent() {
        let text = format_metrics(&Metrics { mae: 3.21, mape: 0.0215, r2: 0.9 });
        assert!(text.contains("MAPE: 2.15%"));
        assert!(text.contains("MAE : 3.210 MU"));
    }

    #[test]
    fn prediction_with_trace() {
        let row = AssembledRow {
            date: NaiveDate::from_ymd_opt(2023, 6, 15).unwrap(),
            scenario: ScenarioId::Stress,
            features: [("genco_hydel", 12.5)].into_iter().collect::<FeatureVector>(),
            sources: vec![("genco_hydel", ValueSource::User)],
        };
        let text = format_prediction(&row, 215.123, true);
        assert!(text.starts_with("Energy required on 2023-06-15 (stress scenario): 215.12 MU"));
        assert!(text.contains("(User)"));
        assert!(!format_prediction(&row, 215.0, false).contains("User"));
    }
}
