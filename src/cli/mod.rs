//! Command-line parsing for the energy-required forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! cleaning/training/prediction code. Path flags are optional here; the app
//! resolves them against the environment and defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DateOrder, TARGET_COLUMN};
use crate::models::GbmParams;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ef", version, about = "Daily energy-required forecaster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean the dataset, train the pipeline, evaluate on the latest 15% and save the artifact.
    Train(TrainArgs),
    /// Predict energy required for a date from a scenario plus optional overrides.
    Predict(PredictArgs),
    /// Show training metrics, scenario presets, the feature schema and recent observations.
    Overview(OverviewArgs),
}

/// File locations shared by every subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct PathArgs {
    /// Raw CSV dataset [env: EF_DATA_PATH].
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Model artifact JSON [env: EF_MODEL_PATH].
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Training report JSON [env: EF_REPORT_PATH].
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,

    /// How to read ambiguous numeric dates such as 01/02/2023.
    #[arg(long, value_enum, default_value_t = DateOrder::default())]
    pub date_order: DateOrder,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Target column (canonical name).
    #[arg(long, default_value = TARGET_COLUMN)]
    pub target: String,

    /// Number of boosted trees.
    #[arg(long, default_value_t = GbmParams::default().n_estimators)]
    pub trees: usize,

    /// Maximum tree depth.
    #[arg(long, default_value_t = GbmParams::default().max_depth)]
    pub max_depth: usize,

    /// Shrinkage applied to every tree.
    #[arg(long, default_value_t = GbmParams::default().learning_rate)]
    pub learning_rate: f64,

    /// Random seed for row/column subsampling.
    #[arg(long, default_value_t = GbmParams::default().seed)]
    pub seed: u64,

    /// Export hold-out predictions (date, actual, predicted, residual) to CSV.
    #[arg(long = "export-holdout", value_name = "CSV")]
    pub export_holdout: Option<PathBuf>,

    /// Number of largest hold-out misses to print.
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Target date (YYYY-MM-DD); defaults to the last observed date.
    #[arg(long)]
    pub date: Option<String>,

    /// Scenario preset: latest, median or stress.
    #[arg(long)]
    pub scenario: Option<String>,

    /// Override a feature, e.g. `--set genco_hydel=12.5` (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Read the request from a JSON file (`-` for stdin) instead of flags.
    #[arg(long, value_name = "JSON", conflicts_with_all = ["date", "scenario", "overrides"])]
    pub request: Option<PathBuf>,

    /// Print the JSON response instead of text.
    #[arg(long)]
    pub json: bool,

    /// Show where every feature value came from.
    #[arg(long)]
    pub explain: bool,
}

#[derive(Debug, Args, Clone)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{s}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_parsing() {
        assert_eq!(parse_key_value("genco_hydel=12.5"), Ok(("genco_hydel".into(), "12.5".into())));
        assert_eq!(parse_key_value("a= "), Ok(("a".into(), "".into())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=3").is_err());
    }

    #[test]
    fn predict_flags() {
        let cli = Cli::parse_from([
            "ef", "predict", "--date", "2023-06-15", "--scenario", "stress", "--set", "genco_hydel=12", "--json",
        ]);
        match cli.command {
            Command::Predict(args) => {
                assert_eq!(args.date.as_deref(), Some("2023-06-15"));
                assert_eq!(args.overrides, vec![("genco_hydel".to_string(), "12".to_string())]);
                assert!(args.json);
                assert_eq!(args.paths.date_order, DateOrder::MonthFirst);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn train_defaults_match_booster_defaults() {
        let cli = Cli::parse_from(["ef", "train", "--date-order", "day-first"]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.trees, 400);
        assert_eq!(args.max_depth, 6);
        assert_eq!(args.seed, 42);
        assert_eq!(args.target, TARGET_COLUMN);
        assert_eq!(args.paths.date_order, DateOrder::DayFirst);
    }

    #[test]
    fn bare_overview_uses_default_paths() {
        let cli = Cli::parse_from(["ef", "overview"]);
        let Command::Overview(args) = cli.command else {
            panic!("expected overview");
        };
        let defaults = PathArgs::default();
        assert_eq!(args.paths.date_order, defaults.date_order);
        assert_eq!(defaults.date_order, DateOrder::MonthFirst);
        assert!(args.paths.data.is_none() && defaults.data.is_none());
    }
}
