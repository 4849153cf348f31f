//! Named cache generations
//!
//! Responses are stored under `(cache name, url)`. Each deployed version
//! uses its own cache name, so deleting every name but the current one is
//! how stale generations are cleaned up on activation.

use crate::FetchResponse;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory map of cache generations to their stored responses.
#[derive(Default)]
pub struct CacheStorage {
    caches: RwLock<HashMap<String, HashMap<String, FetchResponse>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a response, creating the generation if needed.
    pub async fn put(&self, cache: &str, url: &str, response: FetchResponse) {
        let mut caches = self.caches.write().await;
        caches
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }

    /// Retrieve a stored response.
    pub async fn lookup(&self, cache: &str, url: &str) -> Option<FetchResponse> {
        let caches = self.caches.read().await;
        caches.get(cache)?.get(url).cloned()
    }

    /// Names of every existing generation.
    pub async fn cache_names(&self) -> Vec<String> {
        self.caches.read().await.keys().cloned().collect()
    }

    /// Delete a whole generation. Returns whether it existed.
    pub async fn delete_cache(&self, cache: &str) -> bool {
        self.caches.write().await.remove(cache).is_some()
    }

    /// Number of responses stored in a generation.
    pub async fn entry_count(&self, cache: &str) -> usize {
        self.caches
            .read()
            .await
            .get(cache)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}
