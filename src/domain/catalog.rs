//! Feature catalog: the schema shared by training and serving.
//!
//! - raw CSV header → canonical column rename table
//! - the regression target
//! - the user-overridable features (with labels for error messages/UI)
//! - the canonical ordered list of model inputs

use serde::Serialize;

use crate::domain::calendar::{CALENDAR_COLUMNS, is_calendar_column};

/// Column the regressor predicts (MU).
pub const TARGET_COLUMN: &str = "energy_required_mu";

/// Raw CSV header (left) to canonical snake_case key (right).
pub const COLUMN_RENAMES: [(&str, &str); 14] = [
    ("Energy Required (MU)", "energy_required_mu"),
    ("Energy Met (MU)", "energy_met_mu"),
    ("Energy +/- (MU)", "energy_delta_mu"),
    ("Genco Thermal", "genco_thermal"),
    ("Genco Hydel", "genco_hydel"),
    ("Genco Total", "genco_total"),
    ("CGS and Purchases", "cgs_and_purchases"),
    ("IPPS (GAS)", "ipps_gas"),
    ("NCEs & Others", "nces_others"),
    ("AP Share of TGISTS", "ap_share_tgists"),
    ("Grand Total", "grand_total"),
    ("Reversible Pump Consumption", "reversible_pump_consumption"),
    ("Unrestricted Peak Demand (MW)", "unrestricted_peak_demand_mw"),
    ("Deficit/Surplus (MW)", "deficit_surplus_mw"),
];

/// A feature the caller may override at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const USER_INPUT_FEATURES: [FeatureSpec; 13] = [
    FeatureSpec {
        key: "energy_met_mu",
        label: "Energy Met (MU)",
        description: "Actual energy served to the state grid on the planning day.",
    },
    FeatureSpec {
        key: "energy_delta_mu",
        label: "Energy +/- (MU)",
        description: "Energy surplus (+) or shortfall (-) carried into the day.",
    },
    FeatureSpec {
        key: "genco_thermal",
        label: "GENCO Thermal (MU)",
        description: "Projected supply from APGENCO thermal assets.",
    },
    FeatureSpec {
        key: "genco_hydel",
        label: "GENCO Hydel (MU)",
        description: "Projected supply from hydel generation.",
    },
    FeatureSpec {
        key: "genco_total",
        label: "GENCO Total (MU)",
        description: "Total state GENCO generation available.",
    },
    FeatureSpec {
        key: "cgs_and_purchases",
        label: "CGS + Purchases (MU)",
        description: "Central generating stations and open-market purchases.",
    },
    FeatureSpec {
        key: "ipps_gas",
        label: "IPPs (Gas) (MU)",
        description: "Independent power producers on gas contracts.",
    },
    FeatureSpec {
        key: "nces_others",
        label: "NCEs & Others (MU)",
        description: "Non-conventional energy (solar/wind/etc.).",
    },
    FeatureSpec {
        key: "ap_share_tgists",
        label: "AP Share of TSGENCO (MU)",
        description: "Imported share from Telangana generating stations.",
    },
    FeatureSpec {
        key: "grand_total",
        label: "Grand Total Availability (MU)",
        description: "All supply sources combined for the day.",
    },
    FeatureSpec {
        key: "reversible_pump_consumption",
        label: "Reversible Pump Consumption (MU)",
        description: "Storage pumping obligations.",
    },
    FeatureSpec {
        key: "unrestricted_peak_demand_mw",
        label: "Unrestricted Peak Demand (MW)",
        description: "Peak demand expected without load shedding.",
    },
    FeatureSpec {
        key: "deficit_surplus_mw",
        label: "Deficit / Surplus (MW)",
        description: "Instantaneous MW level shortfall (-) or surplus (+).",
    },
];

/// Canonical key for a raw header; unknown headers pass through unchanged.
pub fn canonical_column_name(raw: &str) -> &str {
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw)
}

/// Keys of the user-overridable features, in catalog order.
pub fn user_feature_keys() -> Vec<&'static str> {
    USER_INPUT_FEATURES.iter().map(|f| f.key).collect()
}

pub fn feature_spec(key: &str) -> Option<&'static FeatureSpec> {
    USER_INPUT_FEATURES.iter().find(|f| f.key == key)
}

/// Model inputs for a dataset carrying exactly the catalogued columns:
/// renamed columns minus the target, then the calendar features.
pub fn canonical_model_inputs() -> Vec<&'static str> {
    COLUMN_RENAMES
        .iter()
        .map(|(_, to)| *to)
        .filter(|name| *name != TARGET_COLUMN)
        .chain(CALENDAR_COLUMNS)
        .collect()
}

/// Names in `feature_names` that request assembly can never produce
/// (neither user-overridable nor calendar-derived).
pub fn unresolvable_features(feature_names: &[String]) -> Vec<String> {
    feature_names
        .iter()
        .filter(|name| feature_spec(name).is_none() && !is_calendar_column(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_known_and_passes_through_unknown() {
        assert_eq!(canonical_column_name("Genco Hydel"), "genco_hydel");
        assert_eq!(canonical_column_name("Deficit/Surplus (MW)"), "deficit_surplus_mw");
        assert_eq!(canonical_column_name("Solar Curtailment"), "Solar Curtailment");
    }

    #[test]
    fn canonical_inputs_cover_user_features_and_calendar() {
        let inputs = canonical_model_inputs();
        assert_eq!(inputs.len(), 13 + 5);
        assert!(!inputs.contains(&TARGET_COLUMN));
        for key in user_feature_keys() {
            assert!(inputs.contains(&key), "{key} missing from model inputs");
        }
        let names: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        assert!(unresolvable_features(&names).is_empty());
    }

    #[test]
    fn unresolvable_flags_foreign_columns() {
        let names = vec!["energy_met_mu".to_string(), "spot_price".to_string(), "month".to_string()];
        assert_eq!(unresolvable_features(&names), vec!["spot_price".to_string()]);
    }
}
