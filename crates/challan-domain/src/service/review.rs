//! Pre-filled review ticket derived from an analysis result

use crate::model::ReviewConfig;
use challan_types::AnalysisResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRoute {
    /// Enough evidence to issue without an operator
    Automatic,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub route: ReviewRoute,
    pub vehicle_number: Option<String>,
    pub vehicle_type: Option<String>,
    /// Mean plate confidence, if any plate was read
    pub confidence: Option<f64>,
    /// Backend violation codes; kinds without a code are left out
    pub violation_codes: Vec<String>,
}

pub fn summarize(result: &AnalysisResult, config: &ReviewConfig) -> ReviewSummary {
    let vehicle_number = result.best_plate().map(|p| p.text.clone());
    let vehicle_type = result
        .vehicles
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|v| v.class_name.clone());

    let confidence = if result.plates.is_empty() {
        None
    } else {
        let sum: f64 = result.plates.iter().map(|p| p.confidence as f64).sum();
        Some(sum / result.plates.len() as f64)
    };

    let violation_codes = result
        .violations
        .iter()
        .filter_map(|v| v.code())
        .map(str::to_string)
        .collect();

    let route = if !result.violations.is_empty()
        && result.quality_score >= config.min_quality
        && vehicle_number.is_some()
    {
        ReviewRoute::Automatic
    } else {
        ReviewRoute::Manual
    };

    ReviewSummary {
        route,
        vehicle_number,
        vehicle_type,
        confidence,
        violation_codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use challan_types::{BoundingBox, Detection, PlateCandidate, ViolationKind};
    use chrono::Utc;
    use std::time::Duration;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    fn result(quality: f64, plates: &[(&str, f32)], violations: &[ViolationKind]) -> AnalysisResult {
        AnalysisResult {
            plates: plates
                .iter()
                .map(|&(text, confidence)| PlateCandidate {
                    text: text.to_string(),
                    confidence,
                    bbox: bbox(),
                })
                .collect(),
            vehicles: vec![
                Detection::new("car", 0.6, bbox()).unwrap(),
                Detection::new("motorcycle", 0.9, bbox()).unwrap(),
            ],
            persons: vec![],
            signs: vec![],
            violations: violations.iter().copied().collect(),
            quality_score: quality,
            processing_time: Duration::from_millis(5),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_automatic_route() {
        let r = result(
            0.8,
            &[("MH12AB1234", 0.9), ("MH12AB123", 0.7)],
            &[ViolationKind::HelmetViolation, ViolationKind::SeatbeltViolation],
        );
        let summary = summarize(&r, &ReviewConfig::default());

        assert_eq!(summary.route, ReviewRoute::Automatic);
        assert_eq!(summary.vehicle_number.as_deref(), Some("MH12AB1234"));
        assert_eq!(summary.vehicle_type.as_deref(), Some("motorcycle"));
        assert!((summary.confidence.unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(summary.violation_codes, vec!["NH001"]);
    }

    #[test]
    fn test_manual_when_evidence_missing() {
        let config = ReviewConfig::default();
        let no_plate = result(0.9, &[], &[ViolationKind::TripleRiding]);
        assert_eq!(summarize(&no_plate, &config).route, ReviewRoute::Manual);
        assert_eq!(summarize(&no_plate, &config).confidence, None);

        let blurry = result(0.4, &[("MH12AB1234", 0.9)], &[ViolationKind::TripleRiding]);
        assert_eq!(summarize(&blurry, &config).route, ReviewRoute::Manual);

        let clean = result(0.9, &[("MH12AB1234", 0.9)], &[]);
        assert_eq!(summarize(&clean, &config).route, ReviewRoute::Manual);
    }
}
