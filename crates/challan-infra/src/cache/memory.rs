//! In-process result cache

use challan_domain::repository::{CacheStats, ResultCache};
use challan_types::{AnalysisResult, CacheError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct Entry {
    expires_at: Option<Instant>,
    result: AnalysisResult,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |t| now >= t)
    }
}

/// Result cache held in memory; contents are lost when the process exits
#[derive(Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::LockPoisoned.into())
    }
}

impl ResultCache for MemoryResultCache {
    fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        // An unrepresentable deadline never expires
        let expires_at = now.checked_add(ttl);
        let mut entries = self.lock()?;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            key.to_string(),
            Entry {
                expires_at,
                result: value.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.result.clone())),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.lock()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn stats(&self) -> Result<CacheStats> {
        let entries = self.lock()?;
        let now = Instant::now();
        Ok(CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|e| e.is_expired(now)).count(),
            bytes: 0,
        })
    }
}
