//! Tunable thresholds for the violation rules

use serde::{Deserialize, Serialize};

/// Heuristic thresholds for the rule engine.
///
/// The defaults are uncalibrated starting points, not physical constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Max centre distance (px) from a motorcycle for a rider's helmet to be checked
    #[serde(default = "default_helmet_proximity")]
    pub helmet_proximity_px: f64,

    /// Max centre distance (px) from a motorcycle for a person to count as a rider
    #[serde(default = "default_triple_riding_proximity")]
    pub triple_riding_proximity_px: f64,

    /// Helmet-colour pixel fraction above which a helmet is assumed present
    #[serde(default = "default_helmet_coverage")]
    pub helmet_coverage_threshold: f64,

    /// Top fraction of a person box treated as the head
    #[serde(default = "default_head_fraction")]
    pub head_region_fraction: f64,

    /// Riders allowed on one motorcycle
    #[serde(default = "default_max_riders")]
    pub max_riders: usize,
}

fn default_helmet_proximity() -> f64 {
    50.0
}

fn default_triple_riding_proximity() -> f64 {
    30.0
}

fn default_helmet_coverage() -> f64 {
    0.3
}

fn default_head_fraction() -> f64 {
    0.3
}

fn default_max_riders() -> usize {
    2
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            helmet_proximity_px: default_helmet_proximity(),
            triple_riding_proximity_px: default_triple_riding_proximity(),
            helmet_coverage_threshold: default_helmet_coverage(),
            head_region_fraction: default_head_fraction(),
            max_riders: default_max_riders(),
        }
    }
}
