//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once by the cleaner and shared read-only afterwards
//! - serialized into the training report / JSON responses
//! - passed between the trainer, scenario engine and predictor

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::models::GbmParams;

/// How to read ambiguous numeric dates such as `01/02/2023`.
///
/// Unambiguous dates (`15/06/2023`) parse under either order: the preferred
/// order is tried first, then the other one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DateOrder {
    /// `MM/DD/YYYY` first.
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY` first.
    DayFirst,
}

/// A cleaned observation: its date plus one `f64` per table column.
///
/// The date is row metadata, not a model input; only the calendar features
/// derived from it appear among the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Output of the cleaning pass: chronologically sorted rows over a fixed
/// column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanTable {
    columns: Vec<String>,
    rows: Vec<CleanRow>,
}

impl CleanTable {
    /// Build a table. Every row must carry one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<CleanRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[CleanRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a single column in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Value of `name` in row `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r.values[idx])
    }

    pub fn last_row(&self) -> Option<&CleanRow> {
        self.rows.last()
    }
}

/// Ordered `name → value` mapping.
///
/// Insertion order is preserved; inserting an existing name overwrites the
/// value in place. Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| n == name).map(|idx| self.values[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut out = FeatureVector::new();
        for (name, value) in iter {
            out.insert(name, value);
        }
        out
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Hold-out evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    /// Fraction, not percent.
    pub mape: f64,
    pub r2: f64,
}

/// Audit record written next to the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_path: String,
    pub features: Vec<String>,
    pub metrics: Metrics,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub train_rows: Option<usize>,
    #[serde(default)]
    pub test_rows: Option<usize>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
}

/// Prediction for one hold-out row.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
}

/// File locations shared by training and serving.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    pub data: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
}

/// A training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub paths: ProjectPaths,
    pub target: String,
    pub date_order: DateOrder,
    pub params: GbmParams,
    /// Optional per-row hold-out export (CSV).
    pub export_holdout: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_overwrites_in_place() {
        let mut v = FeatureVector::new();
        v.insert("a", 1.0);
        v.insert("b", 2.0);
        v.insert("a", 3.0);
        assert_eq!(v.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(v.values(), &[3.0, 2.0]);
        assert_eq!(v.get("a"), Some(3.0));
        assert_eq!(v.get("c"), None);
    }

    #[test]
    fn feature_vector_serializes_in_insertion_order() {
        let v: FeatureVector = [("zeta", 1.5), ("alpha", -2.0)].into_iter().collect();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"zeta":1.5,"alpha":-2.0}"#);
    }

    #[test]
    fn report_reads_minimal_json() {
        let json = r#"{"model_path":"models/m.json","features":["a"],"metrics":{"mae":1.0,"mape":0.02,"r2":0.9}}"#;
        let report: TrainingReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.features, vec!["a".to_string()]);
        assert!(report.trained_at.is_none());
    }

    #[test]
    fn table_column_access() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let table = CleanTable::new(
            vec!["x".into(), "y".into()],
            vec![
                CleanRow { date: d, values: vec![1.0, 2.0] },
                CleanRow { date: d.succ_opt().unwrap(), values: vec![3.0, 4.0] },
            ],
        );
        assert_eq!(table.column_values("y"), Some(vec![2.0, 4.0]));
        assert_eq!(table.value(1, "x"), Some(3.0));
        assert_eq!(table.last_row().map(|r| r.date), d.succ_opt());
        assert!(table.column_values("z").is_none());
    }
}
