//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - resolves file locations (flag, then environment, then default)
//! - dispatches to training, prediction or the overview

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, OverviewArgs, PathArgs, PredictArgs, TrainArgs};
use crate::domain::{ProjectPaths, TrainConfig};
use crate::error::AppError;
use crate::models::GbmParams;
use crate::predict::{
    AssembledRow, ErrorResponse, PREDICTION_UNIT, PredictionRequest, PredictionResponse, REQUEST_DATE_FORMAT,
};

pub mod context;
pub mod pipeline;

pub const DATA_PATH_ENV: &str = "EF_DATA_PATH";
pub const MODEL_PATH_ENV: &str = "EF_MODEL_PATH";
pub const REPORT_PATH_ENV: &str = "EF_REPORT_PATH";

pub const DEFAULT_DATA_PATH: &str = "AP-PowerSupply.csv";
pub const DEFAULT_MODEL_PATH: &str = "models/energy_requirement_gbm.json";
pub const DEFAULT_REPORT_PATH: &str = "artifacts/training_report.json";

const DEFAULT_LOG_FILTER: &str = "energy_forecast=info";

/// Entry point for the `ef` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Predict(args) => handle_predict(args),
        Command::Overview(args) => handle_overview(args),
    }
}

fn init_tracing() {
    // Logs go to stderr so stdout stays clean for reports and JSON.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args);
    let output = pipeline::run_training(&config)?;

    println!("{}", crate::report::format_training_summary(&output, &config));
    if args.top > 0 {
        let misses = crate::report::largest_misses(&output.holdout, args.top);
        println!("{}", crate::report::format_misses(&misses));
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let paths = resolve_paths(&args.paths);
    let ctx = context::ServingContext::load(&paths, args.paths.date_order)?;

    let request = match &args.request {
        Some(path) => read_request(path)?,
        None => request_from_flags(&args, ctx.default_date()),
    };

    let outcome = ctx
        .predictor()
        .assemble(&request)
        .map_err(AppError::from)
        .and_then(|row| {
            let prediction = ctx.model().predict(&row.features)?;
            Ok((row, prediction))
        });

    if args.json {
        println!("{}", render_json_outcome(&outcome)?);
        // The error body is the report; `main` only sets the exit code.
        return outcome.map(|_| ()).map_err(AppError::reported);
    }

    let (row, prediction) = outcome?;
    print!("{}", crate::report::format_prediction(&row, prediction, args.explain));
    Ok(())
}

fn render_json_outcome(outcome: &Result<(AssembledRow, f64), AppError>) -> Result<String, AppError> {
    match outcome {
        Ok((_, prediction)) => serde_json::to_string_pretty(&PredictionResponse {
            prediction: *prediction,
            unit: PREDICTION_UNIT,
        }),
        Err(err) => serde_json::to_string_pretty(&ErrorResponse { error: err.to_string() }),
    }
    .map_err(|e| AppError::Io(format!("Failed to render JSON response: {e}")))
}

fn handle_overview(args: OverviewArgs) -> Result<(), AppError> {
    let paths = resolve_paths(&args.paths);
    let ctx = context::ServingContext::load(&paths, args.paths.date_order)?;
    print!("{}", crate::report::format_overview(&ctx));
    Ok(())
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        paths: resolve_paths(&args.paths),
        target: args.target.clone(),
        date_order: args.paths.date_order,
        params: GbmParams {
            n_estimators: args.trees,
            max_depth: args.max_depth,
            learning_rate: args.learning_rate,
            seed: args.seed,
            ..GbmParams::default()
        },
        export_holdout: args.export_holdout.clone(),
    }
}

/// Flag, then environment variable, then built-in default.
pub fn resolve_paths(args: &PathArgs) -> ProjectPaths {
    ProjectPaths {
        data: pick_path(args.data.as_ref(), std::env::var_os(DATA_PATH_ENV), DEFAULT_DATA_PATH),
        model: pick_path(args.model.as_ref(), std::env::var_os(MODEL_PATH_ENV), DEFAULT_MODEL_PATH),
        report: pick_path(args.report.as_ref(), std::env::var_os(REPORT_PATH_ENV), DEFAULT_REPORT_PATH),
    }
}

fn pick_path(flag: Option<&PathBuf>, env: Option<OsString>, default: &str) -> PathBuf {
    flag.cloned()
        .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn request_from_flags(args: &PredictArgs, default_date: NaiveDate) -> PredictionRequest {
    let date = args
        .date
        .clone()
        .unwrap_or_else(|| default_date.format(REQUEST_DATE_FORMAT).to_string());
    let mut request = PredictionRequest::for_date(date);
    request.scenario_id = args.scenario.clone();
    for (key, value) in &args.overrides {
        request.overrides.insert(key.clone(), Value::String(value.clone()));
    }
    request
}

/// Request body from a file, or stdin for `-`.
fn read_request(path: &Path) -> Result<PredictionRequest, AppError> {
    let body = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::Io(format!("Failed to read request from stdin: {e}")))?;
        buf
    } else {
        fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read request '{}': {e}", path.display())))?
    };
    Ok(PredictionRequest::from_json(&body)?)
}
