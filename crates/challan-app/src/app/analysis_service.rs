//! Analysis Service - core use case for traffic photo analysis
//!
//! This service orchestrates the complete analysis workflow:
//! 1. Decode the submitted image
//! 2. Score image quality
//! 3. Run the object detector
//! 4. Partition detections into vehicles, persons and signs
//! 5. Read license plates from vehicle regions
//! 6. Evaluate the violation rules
//! 7. Assemble the result and store it under the correlation id
//!
//! Only a decode failure or a detector failure aborts a request. Plate and
//! rule failures are contained and logged further down.

use crate::config::Config;
use crate::repository::open_result_cache;
use crate::scanner::validate_image;
use challan_domain::repository::{cache_key, ResultCache, RESULT_TTL};
use challan_domain::service::ViolationEngine;
use challan_types::{AnalysisResult, CacheError, ConfigError, Detection, Error};
use challan_vision::{
    quality, CommandDetector, CommandRecognizer, LicensePlateExtractor, ObjectDetector,
};
use chrono::Utc;
use image::{DynamicImage, GenericImageView};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Detector classes treated as vehicles
pub const VEHICLE_CLASSES: &[&str] = &[
    "car",
    "truck",
    "bus",
    "motorcycle",
    "bicycle",
    "auto-rickshaw",
    "van",
    "suv",
    "taxi",
];

/// Detector classes treated as traffic signs
pub const SIGN_CLASSES: &[&str] = &[
    "stop sign",
    "traffic light",
    "speed limit",
    "no entry",
    "one way",
    "parking",
    "pedestrian crossing",
];

pub const PERSON_CLASS: &str = "person";

/// Errors specific to the analysis service
#[derive(Debug, Error)]
pub enum AnalysisServiceError {
    #[error("Image validation failed: {0}")]
    InvalidImage(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<Error> for AnalysisServiceError {
    fn from(err: Error) -> Self {
        match err {
            Error::FileNotFound(msg) | Error::InvalidImageFormat(msg) => {
                AnalysisServiceError::InvalidImage(msg)
            }
            Error::Decode(_) => AnalysisServiceError::InvalidImage(err.to_string()),
            Error::Image(e) => AnalysisServiceError::InvalidImage(e.to_string()),
            Error::Detection(msg) => AnalysisServiceError::DetectionFailed(msg),
            Error::Cache(e) => AnalysisServiceError::CacheError(e.to_string()),
            Error::Config(e) => AnalysisServiceError::ConfigError(e.to_string()),
            Error::Capability(msg) => AnalysisServiceError::ConfigError(msg),
            _ => AnalysisServiceError::DetectionFailed(err.to_string()),
        }
    }
}

impl From<AnalysisServiceError> for Error {
    fn from(err: AnalysisServiceError) -> Self {
        match err {
            AnalysisServiceError::InvalidImage(msg) => Error::InvalidImageFormat(msg),
            AnalysisServiceError::DetectionFailed(msg) => Error::Detection(msg),
            AnalysisServiceError::CacheError(msg) => Error::Cache(CacheError::IoError(msg)),
            AnalysisServiceError::ConfigError(msg) => Error::Config(ConfigError::InvalidValue(msg)),
        }
    }
}

/// Per-service tunables
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Minimum confidence passed to the object detector
    pub confidence_threshold: f32,

    /// Expiry of cached results
    pub cache_ttl: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            cache_ttl: RESULT_TTL,
        }
    }
}

/// Response envelope returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub result: Option<AnalysisResult>,
    pub message: String,
}

impl AnalysisResponse {
    pub fn from_outcome(
        correlation_id: Option<&str>,
        outcome: std::result::Result<AnalysisResult, AnalysisServiceError>,
    ) -> Self {
        let correlation_id = correlation_id.map(str::to_string);
        match outcome {
            Ok(result) => Self {
                success: true,
                correlation_id,
                message: format!(
                    "Processed in {:.2}s, {} violation(s)",
                    result.processing_time.as_secs_f64(),
                    result.violations.len()
                ),
                result: Some(result),
            },
            Err(e) => Self {
                success: false,
                correlation_id,
                result: None,
                message: e.to_string(),
            },
        }
    }
}

/// Vehicles, persons and signs; other classes are dropped
pub fn partition_detections(
    detections: Vec<Detection>,
) -> (Vec<Detection>, Vec<Detection>, Vec<Detection>) {
    let mut vehicles = Vec::new();
    let mut persons = Vec::new();
    let mut signs = Vec::new();

    for det in detections {
        let class = det.class_name.to_lowercase();
        if VEHICLE_CLASSES.contains(&class.as_str()) {
            vehicles.push(det);
        } else if class == PERSON_CLASS {
            persons.push(det);
        } else if SIGN_CLASSES.contains(&class.as_str()) {
            signs.push(det);
        } else {
            debug!("Ignoring {} detection", det.class_name);
        }
    }

    (vehicles, persons, signs)
}

/// Traffic photo analysis pipeline.
///
/// Built once and shared; every method takes `&self`, so one instance can
/// serve many worker threads.
pub struct AnalysisService {
    detector: Arc<dyn ObjectDetector>,
    plates: LicensePlateExtractor,
    engine: ViolationEngine,
    cache: Option<Arc<dyn ResultCache>>,
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        plates: LicensePlateExtractor,
        engine: ViolationEngine,
    ) -> Self {
        Self {
            detector,
            plates,
            engine,
            cache: None,
            settings: AnalysisSettings::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_settings(mut self, settings: AnalysisSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Wire the command-backed capabilities and file cache from config
    pub fn from_config(config: &Config) -> std::result::Result<Self, AnalysisServiceError> {
        config.validate()?;

        let detector_cmd = config.detector_command.as_deref().ok_or_else(|| {
            AnalysisServiceError::ConfigError(
                "no detector command configured (set detector_command or CHALLAN_DETECTOR_CMD)"
                    .to_string(),
            )
        })?;
        let recognizer_cmd = config.recognizer_command.as_deref().ok_or_else(|| {
            AnalysisServiceError::ConfigError(
                "no recognizer command configured (set recognizer_command or CHALLAN_RECOGNIZER_CMD)"
                    .to_string(),
            )
        })?;

        let detector = Arc::new(CommandDetector::new(detector_cmd)?);
        let recognizer = Arc::new(CommandRecognizer::new(recognizer_cmd)?);
        let plates =
            LicensePlateExtractor::new(recognizer).with_min_confidence(config.plates.min_confidence);
        let engine = ViolationEngine::new(&config.rules);

        let mut service = Self::new(detector, plates, engine).with_settings(AnalysisSettings {
            confidence_threshold: config.confidence_threshold,
            cache_ttl: config.cache_ttl(),
        });
        if let Some(cache) = open_result_cache(config)? {
            service = service.with_cache(cache);
        }
        Ok(service)
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&Arc<dyn ResultCache>> {
        self.cache.as_ref()
    }

    /// Analyze encoded image bytes, storing the result under
    /// `correlation_id` when one is given and a cache is configured
    pub fn analyze(
        &self,
        bytes: &[u8],
        correlation_id: Option<&str>,
    ) -> std::result::Result<AnalysisResult, AnalysisServiceError> {
        let started = Instant::now();
        let image = image::load_from_memory(bytes).map_err(|e| Error::Decode(e.to_string()))?;
        self.run(&image, correlation_id, started)
    }

    /// Validate and read an image file, then analyze it
    pub fn analyze_path(
        &self,
        path: &Path,
        correlation_id: Option<&str>,
    ) -> std::result::Result<AnalysisResult, AnalysisServiceError> {
        validate_image(path)?;
        let bytes = std::fs::read(path).map_err(|e| {
            AnalysisServiceError::InvalidImage(format!("{}: {}", path.display(), e))
        })?;
        self.analyze(&bytes, correlation_id)
    }

    /// Analyze an already decoded image
    pub fn analyze_image(
        &self,
        image: &DynamicImage,
        correlation_id: Option<&str>,
    ) -> std::result::Result<AnalysisResult, AnalysisServiceError> {
        self.run(image, correlation_id, Instant::now())
    }

    /// Previously stored result for a correlation id
    pub fn cached_result(
        &self,
        correlation_id: &str,
    ) -> std::result::Result<Option<AnalysisResult>, AnalysisServiceError> {
        match self.cache {
            Some(ref cache) => Ok(cache.get(&cache_key(correlation_id))?),
            None => {
                debug!("No result cache configured");
                Ok(None)
            }
        }
    }

    fn run(
        &self,
        image: &DynamicImage,
        correlation_id: Option<&str>,
        started: Instant,
    ) -> std::result::Result<AnalysisResult, AnalysisServiceError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AnalysisServiceError::InvalidImage("image has no pixels".to_string()));
        }

        let quality_score = quality::score(image);
        debug!("Quality score {:.2} for {}x{} image", quality_score, width, height);

        let detections = self
            .detector
            .detect(image, self.settings.confidence_threshold)
            .map_err(|e| match e {
                Error::Detection(msg) => AnalysisServiceError::DetectionFailed(msg),
                other => AnalysisServiceError::DetectionFailed(other.to_string()),
            })?;
        let (vehicles, persons, signs) = partition_detections(detections);
        debug!(
            "{} vehicles, {} persons, {} signs",
            vehicles.len(),
            persons.len(),
            signs.len()
        );

        let plates = self.plates.extract(image, &vehicles);
        let violations = self.engine.detect(image, &vehicles, &persons, &signs);

        let result = AnalysisResult {
            plates,
            vehicles,
            persons,
            signs,
            violations,
            quality_score,
            processing_time: started.elapsed(),
            timestamp: Utc::now(),
        };
        info!(
            "Analysis done in {:.2}s: {} plate(s), {} violation(s)",
            result.processing_time.as_secs_f64(),
            result.plates.len(),
            result.violations.len()
        );

        if let (Some(id), Some(cache)) = (correlation_id, self.cache.as_ref()) {
            if let Err(e) = cache.set(&cache_key(id), &result, self.settings.cache_ttl) {
                warn!("Failed to cache result for {}: {}", id, e);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use challan_types::BoundingBox;

    fn det(class: &str) -> Detection {
        Detection::new(class, 0.8, BoundingBox::new(0.0, 0.0, 5.0, 5.0).unwrap()).unwrap()
    }

    #[test]
    fn test_partition_detections() {
        let (vehicles, persons, signs) = partition_detections(vec![
            det("car"),
            det("person"),
            det("Traffic Light"),
            det("dog"),
            det("auto-rickshaw"),
        ]);
        assert_eq!(vehicles.len(), 2);
        assert_eq!(persons.len(), 1);
        assert_eq!(signs.len(), 1);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            AnalysisServiceError::from(Error::FileNotFound("x.jpg".into())),
            AnalysisServiceError::InvalidImage(_)
        ));
        match AnalysisServiceError::from(Error::Decode("truncated PNG".into())) {
            AnalysisServiceError::InvalidImage(msg) => {
                assert_eq!(msg, "Could not decode image: truncated PNG")
            }
            other => panic!("expected invalid image, got {:?}", other),
        }
        assert!(matches!(
            AnalysisServiceError::from(Error::Detection("model down".into())),
            AnalysisServiceError::DetectionFailed(_)
        ));
    }

    #[test]
    fn test_failure_response() {
        let response = AnalysisResponse::from_outcome(
            Some("req-9"),
            Err(AnalysisServiceError::InvalidImage("Could not decode image".into())),
        );
        assert!(!response.success);
        assert!(response.result.is_none());
        assert!(response.message.contains("Could not decode image"));
        assert_eq!(response.correlation_id.as_deref(), Some("req-9"));
    }
}
