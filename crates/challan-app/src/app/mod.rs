//! Application use cases

pub mod analysis_service;
pub mod batch;

pub use analysis_service::{
    partition_detections, AnalysisResponse, AnalysisService, AnalysisServiceError,
    AnalysisSettings,
};
pub use batch::{analyze_batch, BatchEntry, BatchReport};
