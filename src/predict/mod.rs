//! Single-row prediction from partial user input.
//!
//! A request names a target date, optionally a scenario, and any subset of
//! the user-overridable features. Every feature is resolved in a fixed order:
//!
//! 1. the caller's value (must parse as a finite number)
//! 2. the chosen scenario's value
//! 3. the median preset's value
//! 4. `0.0`
//!
//! Calendar features for the date are merged last and are never overridable.
//! The row is then laid out in the model's persisted `feature_names` order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FeatureVector, USER_INPUT_FEATURES, calendar_features, feature_spec};
use crate::error::{AppError, ValidationError};
use crate::models::FittedModel;
use crate::scenario::{ScenarioId, ScenarioSet};

pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";
pub const PREDICTION_UNIT: &str = "MU";

/// Prediction request as received over JSON.
///
/// Feature overrides sit at the top level next to `target_date`; keys that
/// are not user-overridable features are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub scenario_id: Option<String>,
    #[serde(flatten)]
    pub overrides: BTreeMap<String, Value>,
}

impl PredictionRequest {
    /// Parse a JSON request body; malformed JSON is a client error.
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(body).map_err(|e| ValidationError::invalid(format!("Invalid request body: {e}")))
    }

    pub fn for_date(date: impl Into<String>) -> Self {
        Self {
            target_date: Some(date.into()),
            ..Self::default()
        }
    }

    pub fn with_scenario(mut self, id: impl Into<String>) -> Self {
        self.scenario_id = Some(id.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    pub unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Where a resolved feature value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    User,
    Scenario,
    Median,
    Zero,
}

/// Resolve one user-overridable feature through the fallback chain.
pub fn resolve_feature_value(
    key: &str,
    user: Option<&Value>,
    scenario: &FeatureVector,
    median: &FeatureVector,
) -> Result<(f64, ValueSource), ValidationError> {
    if let Some(v) = user.and_then(|raw| parse_user_value(key, raw).transpose()) {
        return v.map(|x| (x, ValueSource::User));
    }
    if let Some(v) = scenario.get(key).filter(|v| v.is_finite()) {
        return Ok((v, ValueSource::Scenario));
    }
    if let Some(v) = median.get(key).filter(|v| v.is_finite()) {
        return Ok((v, ValueSource::Median));
    }
    Ok((0.0, ValueSource::Zero))
}

/// `Ok(None)` for blank input (null or empty string).
fn parse_user_value(key: &str, raw: &Value) -> Result<Option<f64>, ValidationError> {
    let invalid = || {
        let label = feature_spec(key).map(|f| f.label).unwrap_or(key);
        ValidationError::invalid(format!("Invalid number for {label}"))
    };
    let value = match raw {
        Value::Null => return Ok(None),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(Some(value))
}

/// A feature row plus how each user-overridable value was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRow {
    pub date: NaiveDate,
    pub scenario: ScenarioId,
    pub features: FeatureVector,
    pub sources: Vec<(&'static str, ValueSource)>,
}

#[derive(Debug, Clone, Copy)]
pub struct Predictor<'a> {
    model: &'a FittedModel,
    scenarios: &'a ScenarioSet,
}

impl<'a> Predictor<'a> {
    pub fn new(model: &'a FittedModel, scenarios: &'a ScenarioSet) -> Self {
        Self { model, scenarios }
    }

    /// Build the model-ordered row with the resolution trace.
    pub fn assemble(&self, request: &PredictionRequest) -> Result<AssembledRow, ValidationError> {
        let date = parse_target_date(request.target_date.as_deref())?;
        let preset = self.scenarios.resolve(request.scenario_id.as_deref());

        let mut values = FeatureVector::new();
        let mut sources = Vec::with_capacity(USER_INPUT_FEATURES.len());
        for spec in &USER_INPUT_FEATURES {
            let (value, source) = resolve_feature_value(
                spec.key,
                request.overrides.get(spec.key),
                &preset.values,
                self.scenarios.median_values(),
            )?;
            values.insert(spec.key, value);
            sources.push((spec.key, source));
        }
        for (name, value) in calendar_features(date).entries() {
            values.insert(name, value);
        }

        let missing: Vec<String> = self
            .model
            .feature_names()
            .iter()
            .filter(|name| !values.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::FeatureCatalogDrift { missing });
        }

        let features = self
            .model
            .feature_names()
            .iter()
            .map(|name| (name.as_str(), values.get(name).unwrap_or(f64::NAN)))
            .collect();

        Ok(AssembledRow {
            date,
            scenario: preset.id,
            features,
            sources,
        })
    }

    pub fn build_feature_vector(&self, request: &PredictionRequest) -> Result<FeatureVector, ValidationError> {
        self.assemble(request).map(|row| row.features)
    }

    /// The fitted pipeline's output for the request, unchanged.
    pub fn predict(&self, request: &PredictionRequest) -> Result<f64, AppError> {
        let features = self.build_feature_vector(request)?;
        self.model.predict(&features)
    }

    /// JSON in, `(status, JSON)` out.
    ///
    /// `200` with a [`PredictionResponse`], `400` with an [`ErrorResponse`]
    /// for anything the caller can fix, `500` otherwise.
    pub fn respond_json(&self, body: &str) -> (u16, Value) {
        let outcome = PredictionRequest::from_json(body)
            .map_err(AppError::from)
            .and_then(|request| self.predict(&request));
        let rendered = match outcome {
            Ok(prediction) => serde_json::to_value(PredictionResponse {
                prediction,
                unit: PREDICTION_UNIT,
            })
            .map(|v| (200, v)),
            Err(err) => serde_json::to_value(ErrorResponse { error: err.to_string() }).map(|v| (err.status_code(), v)),
        };
        rendered.unwrap_or_else(|e| (500, serde_json::json!({ "error": e.to_string() })))
    }
}

fn parse_target_date(raw: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::invalid("Target date is required."))?;
    NaiveDate::parse_from_str(raw, REQUEST_DATE_FORMAT)
        .map_err(|_| ValidationError::invalid("Date must be in YYYY-MM-DD format."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CALENDAR_COLUMNS, CleanRow, CleanTable, user_feature_keys};
    use crate::models::{FittedPipeline, GbmParams};
    use crate::scenario::{DEFICIT_SURPLUS_KEY, ENERGY_DELTA_KEY, PEAK_DEMAND_KEY};
    use nalgebra::DMatrix;
    use serde_json::json;

    /// One row with peak demand 1000, deficit 20; `genco_hydel` absent.
    fn scenarios() -> ScenarioSet {
        let d = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let table = CleanTable::new(
            vec![PEAK_DEMAND_KEY.into(), DEFICIT_SURPLUS_KEY.into(), "energy_met_mu".into()],
            vec![
                CleanRow { date: d, values: vec![900.0, 40.0, 100.0] },
                CleanRow { date: d.succ_opt().unwrap(), values: vec![1000.0, 20.0, 200.0] },
            ],
        );
        ScenarioSet::from_table(&table, &user_feature_keys())
    }

    fn model_over(names: Vec<String>) -> FittedModel {
        let n = 12;
        let p = names.len();
        let x = DMatrix::from_fn(n, p, |i, j| (i * (j + 1)) as f64);
        let y: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let params = GbmParams {
            n_estimators: 10,
            max_depth: 2,
            ..GbmParams::default()
        };
        let pipeline = FittedPipeline::fit(x, &y, &names, &params).unwrap();
        FittedModel::new("energy_required_mu".into(), names, pipeline).unwrap()
    }

    fn full_model() -> FittedModel {
        let names = user_feature_keys()
            .into_iter()
            .chain(CALENDAR_COLUMNS)
            .map(String::from)
            .collect();
        model_over(names)
    }

    #[test]
    fn stress_fallback_precedence() {
        let model = full_model();
        let set = scenarios();
        let predictor = Predictor::new(&model, &set);
        let req = PredictionRequest::for_date("2023-06-15").with_scenario("stress");
        let row = predictor.assemble(&req).unwrap();

        assert_eq!(row.scenario, ScenarioId::Stress);
        let f = &row.features;
        assert_eq!(f.get(PEAK_DEMAND_KEY), Some(1080.0));
        assert_eq!(f.get(DEFICIT_SURPLUS_KEY), Some(-180.0));
        assert_eq!(f.get(ENERGY_DELTA_KEY), Some(-15.0));
        assert_eq!(f.get("energy_met_mu"), Some(200.0));
        // Not in the table: the median preset is 0.0 too, so it resolves there.
        assert_eq!(f.get("genco_hydel"), Some(0.0));
        assert_eq!(f.get("year"), Some(2023.0));
        assert_eq!(f.get("month"), Some(6.0));
        assert_eq!(f.get("day_of_week"), Some(3.0));
        assert_eq!(f.get("day_of_year"), Some(166.0));
        assert_eq!(f.get("is_weekend"), Some(0.0));

        let source = |k: &str| row.sources.iter().find(|(key, _)| *key == k).map(|(_, s)| *s);
        assert_eq!(source(PEAK_DEMAND_KEY), Some(ValueSource::Scenario));
        assert_eq!(source("genco_hydel"), Some(ValueSource::Median));
    }

    #[test]
    fn resolution_tiers() {
        let scenario: FeatureVector = [("a", 1.0)].into_iter().collect();
        let median: FeatureVector = [("a", 2.0), ("b", 3.0)].into_iter().collect();
        let r = |key, user: Option<Value>| resolve_feature_value(key, user.as_ref(), &scenario, &median);

        assert_eq!(r("a", Some(json!(9.5))).unwrap(), (9.5, ValueSource::User));
        assert_eq!(r("a", Some(json!(" 7 "))).unwrap(), (7.0, ValueSource::User));
        assert_eq!(r("a", Some(json!(""))).unwrap(), (1.0, ValueSource::Scenario));
        assert_eq!(r("a", Some(Value::Null)).unwrap(), (1.0, ValueSource::Scenario));
        assert_eq!(r("b", None).unwrap(), (3.0, ValueSource::Median));
        assert_eq!(r("c", None).unwrap(), (0.0, ValueSource::Zero));
    }

    #[test]
    fn bad_numbers_name_the_label() {
        let empty = FeatureVector::new();
        for bad in [json!("abc"), json!("NaN"), json!("inf"), json!(true)] {
            let err = resolve_feature_value("genco_hydel", Some(&bad), &empty, &empty).unwrap_err();
            assert_eq!(err.to_string(), "Invalid number for GENCO Hydel (MU)");
        }
    }

    #[test]
    fn date_validation() {
        let model = full_model();
        let set = scenarios();
        let predictor = Predictor::new(&model, &set);

        let err = predictor.assemble(&PredictionRequest::default()).unwrap_err();
        assert_eq!(err.to_string(), "Target date is required.");
        let err = predictor.assemble(&PredictionRequest::for_date("")).unwrap_err();
        assert_eq!(err.to_string(), "Target date is required.");
        let err = predictor.assemble(&PredictionRequest::for_date("15-06-2023")).unwrap_err();
        assert_eq!(err.to_string(), "Date must be in YYYY-MM-DD format.");
    }

    #[test]
    fn drifted_catalog_lists_missing_columns() {
        let model = model_over(vec!["energy_met_mu".into(), "spot_price".into(), "month".into()]);
        let set = scenarios();
        let err = Predictor::new(&model, &set)
            .assemble(&PredictionRequest::for_date("2023-06-15"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing engineered features: spot_price");
    }

    #[test]
    fn row_follows_model_order() {
        let model = model_over(vec!["month".into(), "energy_met_mu".into()]);
        let set = scenarios();
        let features = Predictor::new(&model, &set)
            .build_feature_vector(&PredictionRequest::for_date("2023-06-15"))
            .unwrap();
        assert_eq!(features.names(), model.feature_names());
        assert_eq!(features.values(), &[6.0, 200.0]);
    }

    #[test]
    fn row_order_ignores_which_overrides_are_given() {
        // Reverse of catalog order, so nothing lines up by accident.
        let mut names: Vec<String> = user_feature_keys()
            .into_iter()
            .chain(CALENDAR_COLUMNS)
            .map(String::from)
            .collect();
        names.reverse();
        let model = model_over(names);
        let set = scenarios();
        let predictor = Predictor::new(&model, &set);

        let keys = user_feature_keys();
        for mask in 0u32..(1 << keys.len()) {
            let mut req = PredictionRequest::for_date("2023-06-15");
            for (bit, key) in keys.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    req = req.with_override(*key, json!(bit as f64 + 0.5));
                }
            }
            let row = predictor.assemble(&req).unwrap();
            assert_eq!(row.features.names(), model.feature_names(), "mask {mask:#b}");
            for (bit, key) in keys.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    assert_eq!(row.features.get(key), Some(bit as f64 + 0.5));
                }
            }
        }
    }

    #[test]
    fn json_boundary() {
        let model = full_model();
        let set = scenarios();
        let predictor = Predictor::new(&model, &set);

        let (status, body) =
            predictor.respond_json(r#"{"target_date":"2023-06-15","genco_hydel":"12.5","unknown":[1]}"#);
        assert_eq!(status, 200);
        assert_eq!(body["unit"], "MU");
        assert!(body["prediction"].as_f64().is_some());

        let (status, body) = predictor.respond_json(r#"{"target_date":"2023/06/15"}"#);
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Date must be in YYYY-MM-DD format.");

        let (status, _) = predictor.respond_json("not json");
        assert_eq!(status, 400);
    }
}
