//! One JSON file per key under a cache directory

use challan_domain::repository::{CacheStats, ResultCache};
use challan_types::{AnalysisResult, CacheError, Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    result: AnalysisResult,
}

impl Envelope {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// File-backed result cache
pub struct FileResultCache {
    cache_dir: PathBuf,
}

impl FileResultCache {
    /// Open (creating if needed) a cache directory
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Keys are hashed so arbitrary correlation ids are safe file names
    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Sha256::digest(key.as_bytes());
        self.cache_dir.join(format!("{:x}.json", hash))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn read_envelope(path: &Path) -> Result<Option<Envelope>> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope = serde_json::from_str(&content)
            .map_err(|e| CacheError::Corrupted(format!("{}: {}", path.display(), e)))?;
        Ok(Some(envelope))
    }
}

impl ResultCache for FileResultCache {
    fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> Result<()> {
        let stored_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| stored_at.checked_add_signed(ttl))
            .ok_or_else(|| CacheError::IoError(format!("TTL out of range: {:?}", ttl)))?;

        let envelope = Envelope {
            key: key.to_string(),
            stored_at,
            expires_at,
            result: value.clone(),
        };

        // Write beside the target then rename, so readers never see a partial file
        let temp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &envelope)?;
            writer.flush()?;
        }
        let path = self.entry_path(key);
        temp.persist(&path)
            .map_err(|e| Error::Io(e.error))?;
        debug!("Cached {} at {}", key, path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<AnalysisResult>> {
        let path = self.entry_path(key);
        let Some(envelope) = Self::read_envelope(&path)? else {
            return Ok(None);
        };

        if envelope.key != key {
            warn!("Cache file {} holds a different key", path.display());
            return Ok(None);
        }

        if envelope.is_expired(Utc::now()) {
            debug!("Cache entry {} expired at {}", key, envelope.expires_at);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove expired cache entry {}: {}", path.display(), e);
                }
            }
            return Ok(None);
        }

        Ok(Some(envelope.result))
    }

    fn clear(&self) -> Result<usize> {
        let mut count = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path)?;
            count += 1;
        }
        Ok(count)
    }

    fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats::default();

        for path in self.entry_files()? {
            stats.entries += 1;
            if let Ok(metadata) = fs::metadata(&path) {
                stats.bytes += metadata.len();
            }
            match Self::read_envelope(&path) {
                Ok(Some(envelope)) if envelope.is_expired(now) => stats.expired += 1,
                Ok(_) => {}
                Err(e) => warn!("{}", e),
            }
        }

        Ok(stats)
    }
}
