//! Contracts for the external detection and recognition models
//!
//! Implementations are shared across worker threads, so both traits take
//! `&self`. An engine that cannot be called concurrently must serialize
//! internally, e.g. behind a `Mutex`.

use challan_types::{Detection, Result, TextRegion};
use image::{DynamicImage, GrayImage};

/// Object detection over a whole image
pub trait ObjectDetector: Send + Sync {
    /// Detections at or above `confidence_threshold`, boxes in pixel coordinates
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>>;
}

/// Text recognition over an enhanced grayscale region
pub trait TextRecognizer: Send + Sync {
    /// Text regions with quadrilaterals in the region's own coordinates
    fn read(&self, region: &GrayImage) -> Result<Vec<TextRegion>>;
}

impl<F> ObjectDetector for F
where
    F: Fn(&DynamicImage, f32) -> Result<Vec<Detection>> + Send + Sync,
{
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        self(image, confidence_threshold)
    }
}

impl<F> TextRecognizer for F
where
    F: Fn(&GrayImage) -> Result<Vec<TextRegion>> + Send + Sync,
{
    fn read(&self, region: &GrayImage) -> Result<Vec<TextRegion>> {
        self(region)
    }
}
