//! Repository trait definitions for result persistence

use challan_types::{AnalysisResult, Result};
use std::time::Duration;

/// How long a stored analysis result stays retrievable
pub const RESULT_TTL: Duration = Duration::from_secs(3600);

const KEY_PREFIX: &str = "ai_result:";

/// Storage key for a correlation id
pub fn cache_key(correlation_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, correlation_id)
}

/// Entry counts reported by [`ResultCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub bytes: u64,
}

/// Key-value store for analysis results with per-entry expiry.
///
/// Entries past their TTL read as absent. Concurrent writers to the same key
/// resolve to last write wins.
pub trait ResultCache: Send + Sync {
    fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<AnalysisResult>>;

    /// Remove every entry, returning how many were removed
    fn clear(&self) -> Result<usize>;

    fn stats(&self) -> Result<CacheStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("abc-123"), "ai_result:abc-123");
    }
}
