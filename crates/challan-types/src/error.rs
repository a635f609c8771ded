//! Error types for the analysis pipeline

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Cache-related errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache data corrupted: {0}")]
    Corrupted(String),

    #[error("Cache IO error: {0}")]
    IoError(String),

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The submitted bytes are not an image. Fatal for the request.
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// The object-detection capability failed. Fatal for the request.
    #[error("Object detection failed: {0}")]
    Detection(String),

    /// The text-recognition capability failed for one region.
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    /// An external capability is unconfigured or returned unusable output.
    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Confidence out of range: {0}")]
    InvalidConfidence(f32),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid image format: {0}")]
    InvalidImageFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
