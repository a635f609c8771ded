//! Repository adapters for the persistence layer

use std::sync::Arc;

use challan_domain::repository::ResultCache;
use challan_infra::FileResultCache;
use challan_types::Result;

use crate::config::Config;

/// Open the file-backed result cache, or `None` when caching is disabled
pub fn open_result_cache(config: &Config) -> Result<Option<Arc<dyn ResultCache>>> {
    if !config.cache_enabled {
        return Ok(None);
    }
    let cache = FileResultCache::new(config.cache_dir()?)?;
    Ok(Some(Arc::new(cache)))
}
