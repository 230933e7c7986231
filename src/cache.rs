// In-process result cache for search pages, shared through application state.

use cached::{Cached, TimedSizedCache};
use std::sync::{Arc, Mutex};

use crate::config::SearchSettings;
use crate::models::{CanonicalFilter, SearchResults};
use crate::search::SearchEngine;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchKey {
    filter: CanonicalFilter,
    page: u32,
    page_size: u32,
}

#[derive(Clone)]
pub struct SearchCache {
    inner: Arc<Mutex<TimedSizedCache<SearchKey, SearchResults>>>,
}

impl SearchCache {
    pub fn new(size: usize, ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimedSizedCache::with_size_and_lifespan(size.max(1), ttl_secs))),
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(settings.cache_size, settings.cache_ttl_secs)
    }

    /// Returns the cached page, or runs the search and stores it.
    /// A poisoned lock only costs the cache, never the search.
    pub fn get_or_search(&self, engine: &SearchEngine, filter: &CanonicalFilter, page: u32, page_size: u32) -> SearchResults {
        let key = SearchKey {
            filter: filter.clone(),
            page,
            page_size,
        };

        if let Ok(mut cache) = self.inner.lock() {
            if let Some(hit) = cache.cache_get(&key) {
                tracing::debug!(page, page_size, "Search cache hit");
                return hit.clone();
            }
        }

        let results = engine.search(filter, page, page_size);
        match self.inner.lock() {
            Ok(mut cache) => {
                cache.cache_set(key, results.clone());
            }
            Err(_) => tracing::warn!("Search cache lock poisoned; skipping store"),
        }
        results
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|cache| cache.cache_size()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
