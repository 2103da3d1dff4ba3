//! Baseline feature scenarios used to fill what the caller leaves blank.
//!
//! Three presets are derived once from the clean table:
//!
//! - `latest`: the chronologically last row
//! - `median`: per-feature median over the whole history
//! - `stress`: `latest` with higher peak demand and a deeper deficit

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::domain::{CleanTable, FeatureVector};
use crate::math::finite_median;

pub const PEAK_DEMAND_KEY: &str = "unrestricted_peak_demand_mw";
pub const DEFICIT_SURPLUS_KEY: &str = "deficit_surplus_mw";
pub const ENERGY_DELTA_KEY: &str = "energy_delta_mu";

/// Multiplier applied to peak demand in the stress preset.
pub const STRESS_PEAK_FACTOR: f64 = 1.08;
/// MW added to deficit/surplus in the stress preset.
pub const STRESS_DEFICIT_SHIFT_MW: f64 = -200.0;
/// MU added to the energy delta in the stress preset.
pub const STRESS_ENERGY_DELTA_SHIFT_MU: f64 = -15.0;

/// Values of `keys` on the last row.
///
/// An empty table yields zero for every key. Keys the table does not carry,
/// or whose last value is missing, are left out.
pub fn latest(table: &CleanTable, keys: &[&str]) -> FeatureVector {
    let Some(last) = table.last_row() else {
        return keys.iter().map(|k| (*k, 0.0)).collect();
    };
    keys.iter()
        .filter_map(|key| {
            let idx = table.column_index(key)?;
            let v = last.values[idx];
            v.is_finite().then_some((*key, v))
        })
        .collect()
}

/// Median of each key over all rows, ignoring missing values; `0.0` when
/// nothing is left.
pub fn median(table: &CleanTable, keys: &[&str]) -> FeatureVector {
    keys.iter()
        .map(|key| {
            let value = table
                .column_values(key)
                .and_then(|values| finite_median(values))
                .unwrap_or(0.0);
            (*key, value)
        })
        .collect()
}

/// Heat-wave style adjustment of `latest`. The three adjusted keys are
/// always present; absent ones start from zero.
pub fn stress(latest: &FeatureVector) -> FeatureVector {
    let mut out = latest.clone();
    let base = |key: &str| latest.get(key).unwrap_or(0.0);
    out.insert(PEAK_DEMAND_KEY, base(PEAK_DEMAND_KEY) * STRESS_PEAK_FACTOR);
    out.insert(DEFICIT_SURPLUS_KEY, base(DEFICIT_SURPLUS_KEY) + STRESS_DEFICIT_SHIFT_MW);
    out.insert(ENERGY_DELTA_KEY, base(ENERGY_DELTA_KEY) + STRESS_ENERGY_DELTA_SHIFT_MU);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioId {
    Latest,
    Median,
    Stress,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 3] = [ScenarioId::Latest, ScenarioId::Median, ScenarioId::Stress];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::Latest => "latest",
            ScenarioId::Median => "median",
            ScenarioId::Stress => "stress",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            ScenarioId::Latest => "Latest recorded day",
            ScenarioId::Median => "Typical (median) day",
            ScenarioId::Stress => "Stress demand (+8% peak, -200 MW reserve)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScenarioId::Latest => "Most recent cleaned row as the baseline for quick what-if tweaks.",
            ScenarioId::Median => "Median across the full history, for when only broad trends are known.",
            ScenarioId::Stress => "Higher peak demand and a deeper deficit, approximating extreme heat-wave days.",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPreset {
    pub id: ScenarioId,
    pub label: &'static str,
    pub description: &'static str,
    pub values: FeatureVector,
}

/// The three presets, computed once per serving context.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSet {
    latest: ScenarioPreset,
    median: ScenarioPreset,
    stress: ScenarioPreset,
}

impl ScenarioSet {
    pub fn from_table(table: &CleanTable, keys: &[&str]) -> Self {
        let latest_values = latest(table, keys);
        let stress_values = stress(&latest_values);
        let preset = |id: ScenarioId, values: FeatureVector| ScenarioPreset {
            id,
            label: id.label(),
            description: id.description(),
            values,
        };
        Self {
            latest: preset(ScenarioId::Latest, latest_values),
            median: preset(ScenarioId::Median, median(table, keys)),
            stress: preset(ScenarioId::Stress, stress_values),
        }
    }

    pub fn get(&self, id: ScenarioId) -> &ScenarioPreset {
        match id {
            ScenarioId::Latest => &self.latest,
            ScenarioId::Median => &self.median,
            ScenarioId::Stress => &self.stress,
        }
    }

    /// Preset for a request's scenario id.
    ///
    /// No id (or an empty one) means `latest`; an unknown id falls back to
    /// the median preset.
    pub fn resolve(&self, id: Option<&str>) -> &ScenarioPreset {
        match id.map(str::trim).filter(|s| !s.is_empty()) {
            None => &self.latest,
            Some(raw) => match ScenarioId::parse(raw) {
                Some(id) => self.get(id),
                None => {
                    warn!(scenario_id = raw, "unknown scenario id, using median preset");
                    &self.median
                }
            },
        }
    }

    pub fn median_values(&self) -> &FeatureVector {
        &self.median.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioPreset> {
        [&self.latest, &self.median, &self.stress].into_iter()
    }
}
