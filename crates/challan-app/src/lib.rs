//! Application service layer - analysis use case, config, scanning

pub mod app;
pub mod config;
pub mod repository;
pub mod scanner;

pub use app::{
    analyze_batch, AnalysisResponse, AnalysisService, AnalysisServiceError, AnalysisSettings,
    BatchReport,
};
pub use config::{Config, PlateConfig};
