use std::fmt::Write as _;
use std::path::Path;

use chrono::{Days, NaiveDate};
use energy_forecast::app::context::ServingContext;
use energy_forecast::app::pipeline::run_training;
use energy_forecast::domain::{COLUMN_RENAMES, DateOrder, ProjectPaths, TARGET_COLUMN, TrainConfig};
use energy_forecast::error::AppError;
use energy_forecast::io::read_model_artifact;
use energy_forecast::models::GbmParams;
use energy_forecast::predict::PredictionRequest;

/// Raw CSV in the export's layout: US dates, thousands separators, a few blanks,
/// rows out of order.
fn write_dataset(path: &Path, days: u64) {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let mut csv = String::from("Date");
    for (raw, _) in COLUMN_RENAMES {
        write!(csv, ",\"{raw}\"").unwrap();
    }
    csv.push('\n');

    for i in (0..days).rev() {
        let date = start + Days::new(i);
        let met = 150.0 + (i % 10) as f64 * 4.0;
        let peak = 9_000.0 + (i % 10) as f64 * 100.0;
        write!(csv, "{}", date.format("%m/%d/%Y")).unwrap();
        for (_, key) in COLUMN_RENAMES {
            let value = match key {
                "energy_required_mu" => met + 3.0,
                "energy_met_mu" => met,
                "energy_delta_mu" => -3.0,
                "unrestricted_peak_demand_mw" => peak,
                "deficit_surplus_mw" => -50.0,
                _ => 10.0 + (i % 3) as f64,
            };
            if key == "genco_hydel" && i % 11 == 0 {
                csv.push_str(",");
            } else {
                write!(csv, ",\"{}\"", format_thousands(value)).unwrap();
            }
        }
        csv.push('\n');
    }
    std::fs::write(path, csv).unwrap();
}

fn format_thousands(v: f64) -> String {
    let s = format!("{v:.1}");
    let (int, frac) = s.split_once('.').unwrap();
    let (sign, digits) = int.strip_prefix('-').map_or(("", int), |d| ("-", d));
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac}")
}

fn config(dir: &Path) -> TrainConfig {
    TrainConfig {
        paths: ProjectPaths {
            data: dir.join("supply.csv"),
            model: dir.join("models/model.json"),
            report: dir.join("artifacts/report.json"),
        },
        target: TARGET_COLUMN.to_string(),
        date_order: DateOrder::MonthFirst,
        params: GbmParams {
            n_estimators: 60,
            max_depth: 3,
            learning_rate: 0.2,
            ..GbmParams::default()
        },
        export_holdout: Some(dir.join("holdout.csv")),
    }
}

#[test]
fn thousands_formatting_helper() {
    assert_eq!(format_thousands(9150.0), "9,150.0");
    assert_eq!(format_thousands(-50.0), "-50.0");
}

#[test]
fn train_then_serve() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    write_dataset(&cfg.paths.data, 120);

    let output = run_training(&cfg).unwrap();
    assert_eq!(output.report.train_rows, Some(102));
    assert_eq!(output.report.test_rows, Some(18));
    assert!(output.report.metrics.mape < 0.05, "mape {}", output.report.metrics.mape);

    let artifact = read_model_artifact(&cfg.paths.model).unwrap();
    assert_eq!(artifact.model.feature_names(), output.report.features.as_slice());
    assert!(!artifact.model.feature_names().iter().any(|f| f == TARGET_COLUMN));

    let holdout = std::fs::read_to_string(dir.path().join("holdout.csv")).unwrap();
    assert_eq!(holdout.lines().count(), 19);

    let ctx = ServingContext::load(&cfg.paths, cfg.date_order).unwrap();
    assert_eq!(ctx.default_date(), NaiveDate::from_ymd_opt(2022, 4, 30).unwrap());
    assert!(ctx.report().is_some());
    assert_eq!(ctx.recent().rows.len(), 5);

    let overview = energy_forecast::report::format_overview(&ctx);
    assert!(overview.contains(&format!("Target: {TARGET_COLUMN}")));
    assert!(overview.contains("Scenarios:"));

    let predictor = ctx.predictor();
    let base = predictor
        .predict(&PredictionRequest::for_date("2022-05-01"))
        .unwrap();
    assert!(base.is_finite());

    let overridden = PredictionRequest::for_date("2022-05-01")
        .with_scenario("stress")
        .with_override("energy_met_mu", "190");
    assert!(predictor.predict(&overridden).unwrap().is_finite());

    let (status, body) = predictor.respond_json(r#"{"target_date":"2022-05-01","energy_met_mu":"abc"}"#);
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid number for Energy Met (MU)");
}

#[test]
fn serving_without_artifact_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    write_dataset(&cfg.paths.data, 20);
    let err = ServingContext::load(&cfg.paths, cfg.date_order).unwrap_err();
    assert!(matches!(err, AppError::ModelArtifactMissing { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn too_small_dataset_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    write_dataset(&cfg.paths.data, 1);
    let err = run_training(&cfg).unwrap_err();
    assert!(matches!(err, AppError::InsufficientData(_)));
    assert!(!cfg.paths.model.exists());
}
