//! Domain services

pub mod geometry;
pub mod helmet;
pub mod review;
pub mod violation_engine;

pub use review::{summarize, ReviewRoute, ReviewSummary};
pub use violation_engine::{
    builtin_detector, DetectorError, SceneContext, ViolationDetector, ViolationEngine,
};
