//! Folder analysis over a pool of worker threads sharing one service

use crate::app::analysis_service::AnalysisService;
use challan_types::AnalysisResult;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

/// Outcome for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub image_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Sorted by image path
    pub entries: Vec<BatchEntry>,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Analyze `images` with `jobs` workers.
///
/// `correlation_id` names each image's cache entry (or `None` to skip
/// caching it); `on_done` fires once per finished image from the worker
/// that processed it.
pub fn analyze_batch<I, P>(
    service: &AnalysisService,
    images: &[PathBuf],
    jobs: usize,
    correlation_id: I,
    on_done: P,
) -> BatchReport
where
    I: Fn(&Path) -> Option<String> + Sync,
    P: Fn(&Path) + Sync,
{
    let started_at = Utc::now();
    let next_index = AtomicUsize::new(0);
    let entries = Mutex::new(Vec::with_capacity(images.len()));
    let workers = jobs.clamp(1, images.len().max(1));

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                let Some(image) = images.get(idx) else {
                    break;
                };

                let id = correlation_id(image);
                let entry = match service.analyze_path(image, id.as_deref()) {
                    Ok(result) => BatchEntry {
                        image_path: image.clone(),
                        correlation_id: id,
                        result: Some(result),
                        error: None,
                    },
                    Err(e) => {
                        warn!("Failed to analyze {}: {}", image.display(), e);
                        BatchEntry {
                            image_path: image.clone(),
                            correlation_id: id,
                            result: None,
                            error: Some(e.to_string()),
                        }
                    }
                };

                match entries.lock() {
                    Ok(mut guard) => guard.push(entry),
                    Err(poisoned) => poisoned.into_inner().push(entry),
                }
                on_done(image);
            });
        }
    });

    let mut entries = entries.into_inner().unwrap_or_else(|p| p.into_inner());
    entries.sort_by(|a, b| a.image_path.cmp(&b.image_path));
    let successful = entries.iter().filter(|e| e.result.is_some()).count();

    BatchReport {
        total_processed: entries.len(),
        successful,
        failed: entries.len() - successful,
        entries,
        started_at,
        completed_at: Utc::now(),
    }
}
