//! Result cache implementations
//!
//! Both backends implement [`challan_domain::repository::ResultCache`].

mod file;
mod memory;

pub use file::FileResultCache;
pub use memory::MemoryResultCache;

#[cfg(test)]
pub(crate) mod test_support {
    use challan_types::{AnalysisResult, ViolationKind};
    use chrono::Utc;
    use std::time::Duration;

    pub fn sample_result(quality: f64) -> AnalysisResult {
        AnalysisResult {
            plates: vec![],
            vehicles: vec![],
            persons: vec![],
            signs: vec![],
            violations: [ViolationKind::TripleRiding].into_iter().collect(),
            quality_score: quality,
            processing_time: Duration::from_millis(120),
            timestamp: Utc::now(),
        }
    }
}
