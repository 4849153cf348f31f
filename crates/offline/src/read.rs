//! Cache-aware read path
//!
//! Serves reads from the remote store while online, refreshing the local
//! snapshot with every record returned, and falls back to the snapshot when
//! offline or when the remote read fails. The fallback deliberately ignores
//! filters and sort: cached data is best-effort and coarse-grained, and the
//! caller is told it is looking at a cached view.

use crate::{
    EntityRegistry, Filter, NetworkMonitor, OfflineError, OrderBy, Page, RemoteTable, Result,
    SELECT_PAGE_SIZE,
};
use chrono::Utc;
use local_store::LocalStore;
use serde_json::Value;
use std::sync::Arc;

/// Result of a read, with cache provenance.
#[derive(Clone, Debug)]
pub struct ReadOutcome {
    pub records: Vec<Value>,
    /// True when the records came from the local snapshot rather than the
    /// remote store.
    pub from_cache: bool,
    /// Unix milliseconds of the last successful remote refresh backing this
    /// result, if known.
    pub last_sync: Option<i64>,
}

/// Reads entities remotely when possible, from cache otherwise.
pub struct ReadPath<R: RemoteTable> {
    store: Arc<LocalStore>,
    remote: Arc<R>,
    registry: EntityRegistry,
    network: Arc<NetworkMonitor>,
}

impl<R: RemoteTable> ReadPath<R> {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<R>,
        registry: EntityRegistry,
        network: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            remote,
            registry,
            network,
        }
    }

    /// Fetch all records of an entity.
    ///
    /// Online, filters and sort apply server-side and every returned record
    /// refreshes the cache. Offline or on remote failure the cached
    /// snapshot is returned unfiltered. An error surfaces only when the
    /// remote read failed and the cache could not serve either.
    pub async fn fetch(
        &self,
        entity: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<ReadOutcome> {
        if self.network.is_online() {
            match self.fetch_remote(entity, filters, order).await {
                Ok(outcome) => return Ok(outcome),
                Err(error) => {
                    tracing::warn!(entity, %error, "remote read failed, falling back to cache");
                }
            }
        } else {
            tracing::debug!(entity, "offline, serving cached data");
        }

        self.fetch_cached(entity).await
    }

    /// Paginated remote read; loops until a short page signals end-of-data.
    async fn fetch_remote(
        &self,
        entity: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<ReadOutcome> {
        let mapping = self.registry.resolve(entity);
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .remote
                .select(
                    &mapping.table,
                    filters,
                    order,
                    Page {
                        offset,
                        limit: SELECT_PAGE_SIZE,
                    },
                )
                .await?;

            let short_page = page.len() < SELECT_PAGE_SIZE;
            records.extend(page);

            if short_page {
                break;
            }
            offset += SELECT_PAGE_SIZE;
        }

        for record in &records {
            match record_key(record, &mapping.primary_key) {
                Some(key) => self.store.cache_data(entity, &key, record).await?,
                None => tracing::debug!(
                    entity,
                    key_column = %mapping.primary_key,
                    "record without primary key skipped by cache refresh"
                ),
            }
        }

        Ok(ReadOutcome {
            records,
            from_cache: false,
            last_sync: Some(Utc::now().timestamp_millis()),
        })
    }

    /// Cached fallback, flagged as cache-sourced.
    async fn fetch_cached(&self, entity: &str) -> Result<ReadOutcome> {
        let cached = self.store.cached_data(entity).await?;

        if cached.is_empty() {
            return Err(OfflineError::NoData(entity.to_string()));
        }

        let last_sync = cached.iter().map(|entry| entry.last_sync).max();
        let records = cached.into_iter().map(|entry| entry.data).collect();

        Ok(ReadOutcome {
            records,
            from_cache: true,
            last_sync,
        })
    }
}

/// Extract a record's primary-key value as the cache identity string.
fn record_key(record: &Value, key_column: &str) -> Option<String> {
    match record.get(key_column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_accepts_strings_and_numbers() {
        let record = json!({"id_residuo": 7, "nom_residuo": "Vidro"});
        assert_eq!(record_key(&record, "id_residuo").as_deref(), Some("7"));

        let record = json!({"id_residuo": "abc", "nom_residuo": "Vidro"});
        assert_eq!(record_key(&record, "id_residuo").as_deref(), Some("abc"));
    }

    #[test]
    fn test_record_key_rejects_missing_or_structured_keys() {
        let record = json!({"nom_residuo": "Vidro"});
        assert!(record_key(&record, "id_residuo").is_none());

        let record = json!({"id_residuo": {"nested": true}});
        assert!(record_key(&record, "id_residuo").is_none());
    }
}
