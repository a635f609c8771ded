//! Detection, plate and analysis result types

use crate::error::{Error, Result};
use crate::violation::ViolationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// A point in pixel coordinates
pub type Point = (f64, f64);

/// Axis-aligned box `(x1, y1, x2, y2)` in image pixel coordinates.
///
/// Construction validates the box, so every value of this type is
/// non-degenerate and non-negative. Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidBoundingBox(format!(
                "non-finite coordinate in ({}, {}, {}, {})",
                x1, y1, x2, y2
            )));
        }
        if x1 < 0.0 || y1 < 0.0 {
            return Err(Error::InvalidBoundingBox(format!(
                "negative origin ({}, {})",
                x1, y1
            )));
        }
        if x1 >= x2 || y1 >= y2 {
            return Err(Error::InvalidBoundingBox(format!(
                "degenerate box ({}, {}, {}, {})",
                x1, y1, x2, y2
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Bounding box of a quadrilateral given in a local frame whose origin
    /// sits at `offset` in the image.
    pub fn from_quad(quad: &[Point; 4], offset: Point) -> Result<Self> {
        let (min_x, max_x) = min_max(quad.iter().map(|p| p.0));
        let (min_y, max_y) = min_max(quad.iter().map(|p| p.1));
        Self::new(
            min_x + offset.0,
            min_y + offset.1,
            max_x + offset.0,
            max_y + offset.1,
        )
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    pub fn x2(&self) -> f64 {
        self.x2
    }

    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Midpoint of the two corners
    pub fn center(&self) -> Point {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = Error;

    fn try_from(v: [f64; 4]) -> Result<Self> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

fn check_confidence(confidence: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(Error::InvalidConfidence(confidence))
    }
}

/// One output of the object-detection capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Result<Self> {
        Ok(Self {
            class_name: class_name.into(),
            confidence: check_confidence(confidence)?,
            bbox,
        })
    }

    /// Case-insensitive substring match on the class label
    pub fn is_class(&self, name: &str) -> bool {
        self.class_name.to_lowercase().contains(name)
    }
}

/// One `(quadrilateral, text, confidence)` triple from the text recognizer.
/// The quadrilateral is in the coordinate frame of the image handed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub quad: [Point; 4],
    pub text: String,
    pub confidence: f32,
}

/// A license plate read from a vehicle region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateCandidate {
    /// Uppercase alphanumeric plate text
    pub text: String,
    pub confidence: f32,
    /// Image-absolute box around the text
    pub bbox: BoundingBox,
}

/// Result of analyzing one traffic photograph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub plates: Vec<PlateCandidate>,
    pub vehicles: Vec<Detection>,
    pub persons: Vec<Detection>,
    pub signs: Vec<Detection>,
    pub violations: BTreeSet<ViolationKind>,
    /// Composite image quality in [0, 1]
    pub quality_score: f64,
    #[serde(with = "duration_secs")]
    pub processing_time: Duration,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.contains(&kind)
    }

    /// Plate with the highest recognition confidence
    pub fn best_plate(&self) -> Option<&PlateCandidate> {
        self.plates
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Serialize a `Duration` as fractional seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_rejects_degenerate() {
        assert!(BoundingBox::new(10.0, 10.0, 10.0, 20.0).is_err());
        assert!(BoundingBox::new(10.0, 20.0, 15.0, 5.0).is_err());
        assert!(BoundingBox::new(-1.0, 0.0, 5.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, f64::NAN, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_bbox_from_quad_applies_offset() {
        let quad = [(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)];
        let bbox = BoundingBox::from_quad(&quad, (10.0, 20.0)).unwrap();
        assert_eq!(bbox.to_array(), [10.0, 20.0, 15.0, 25.0]);
    }

    #[test]
    fn test_bbox_from_skewed_quad() {
        let quad = [(2.0, 1.0), (9.0, 0.0), (10.0, 6.0), (1.0, 7.0)];
        let bbox = BoundingBox::from_quad(&quad, (100.0, 50.0)).unwrap();
        assert_eq!(bbox.to_array(), [101.0, 50.0, 110.0, 57.0]);
    }

    #[test]
    fn test_bbox_center() {
        let bbox = BoundingBox::new(0.0, 10.0, 20.0, 30.0).unwrap();
        assert_eq!(bbox.center(), (10.0, 20.0));
    }

    #[test]
    fn test_bbox_deserialize_validates() {
        let ok: BoundingBox = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(ok.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert!(serde_json::from_str::<BoundingBox>("[3.0, 2.0, 1.0, 4.0]").is_err());
    }

    #[test]
    fn test_detection_confidence_bounds() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(Detection::new("car", 1.2, bbox).is_err());
        assert!(Detection::new("car", -0.1, bbox).is_err());
        assert!(Detection::new("car", 0.9, bbox).is_ok());
    }

    #[test]
    fn test_detection_is_class_ignores_case() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let det = Detection::new("Motorcycle", 0.9, bbox).unwrap();
        assert!(det.is_class("motorcycle"));
        assert!(!det.is_class("car"));
    }

    #[test]
    fn test_result_json_shape() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let result = AnalysisResult {
            plates: vec![PlateCandidate {
                text: "MH12AB1234".to_string(),
                confidence: 0.9,
                bbox,
            }],
            vehicles: vec![],
            persons: vec![],
            signs: vec![],
            violations: [ViolationKind::TripleRiding].into_iter().collect(),
            quality_score: 0.42,
            processing_time: Duration::from_millis(1500),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["violations"][0], "triple_riding");
        assert_eq!(value["processing_time"], 1.5);
        assert_eq!(value["plates"][0]["bbox"][2], 3.0);

        let back: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
