//! Review routing settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Minimum quality score for automatic review
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,
}

fn default_min_quality() -> f64 {
    0.5
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_quality: default_min_quality(),
        }
    }
}
