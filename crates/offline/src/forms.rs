//! Offline-aware form submission
//!
//! The single write path every form goes through. Online submissions are
//! attempted against the remote store directly; any failure, not only
//! connectivity loss, degrades to queueing the operation locally. The only
//! error a caller ever sees is a local-store write failure.

use crate::{EntityRegistry, NetworkMonitor, QueueManager, RemoteTable, Result};
use local_store::{LocalStore, OperationType};
use serde_json::Value;
use std::sync::Arc;

/// How a submission was resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Applied remotely; carries the stored record (null for deletes).
    Remote(Value),
    /// Captured locally for later replay; carries the queued operation id.
    Queued(i64),
}

impl Submission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Submission::Queued(_))
    }
}

/// Uniform create/update/delete entry point for UI forms.
pub struct FormSubmitter<R: RemoteTable> {
    store: Arc<LocalStore>,
    remote: Arc<R>,
    registry: EntityRegistry,
    network: Arc<NetworkMonitor>,
    queue: Arc<QueueManager<R>>,
}

impl<R: RemoteTable + 'static> FormSubmitter<R> {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<R>,
        registry: EntityRegistry,
        network: Arc<NetworkMonitor>,
        queue: Arc<QueueManager<R>>,
    ) -> Self {
        Self {
            store,
            remote,
            registry,
            network,
            queue,
        }
    }

    /// Submit a create or update.
    ///
    /// Phase one attempts the remote mutation when online; phase two, on
    /// failure or while offline, queues the operation. Queueing only needs
    /// the local store, so it is the error path only when local persistence
    /// itself fails.
    pub async fn submit(
        &self,
        entity: &str,
        data: Value,
        is_edit: bool,
        original_id: Option<&str>,
    ) -> Result<Submission> {
        if self.network.is_online() {
            let mapping = self.registry.resolve(entity);
            let attempt = if is_edit {
                match original_id {
                    Some(key) => {
                        self.remote
                            .update(&mapping.table, &data, &mapping.primary_key, key)
                            .await
                    }
                    None => Err(crate::RemoteError::Rejected(
                        "edit without original id".into(),
                    )),
                }
            } else {
                self.remote.insert(&mapping.table, &data).await
            };

            match attempt {
                Ok(record) => {
                    tracing::info!(entity, "form saved remotely");
                    return Ok(Submission::Remote(record));
                }
                Err(error) => {
                    tracing::warn!(entity, %error, "remote save failed, queueing offline");
                }
            }
        }

        let op_type = if is_edit {
            OperationType::Update
        } else {
            OperationType::Create
        };

        let id = self
            .queue
            .add_offline_operation(op_type, entity, data, original_id)
            .await?;

        tracing::info!(entity, operation = id, "form saved offline");
        Ok(Submission::Queued(id))
    }

    /// Delete a record, following the same two-phase shape.
    ///
    /// The cached snapshot is soft-deleted in both phases so offline reads
    /// stop showing the record immediately.
    pub async fn delete_item(&self, entity: &str, original_id: &str) -> Result<Submission> {
        if self.network.is_online() {
            let mapping = self.registry.resolve(entity);
            match self
                .remote
                .delete(&mapping.table, &mapping.primary_key, original_id)
                .await
            {
                Ok(()) => {
                    self.store.mark_cache_deleted(entity, original_id).await?;
                    tracing::info!(entity, original_id, "record deleted remotely");
                    return Ok(Submission::Remote(Value::Null));
                }
                Err(error) => {
                    tracing::warn!(entity, %error, "remote delete failed, queueing offline");
                }
            }
        }

        let id = self
            .queue
            .add_offline_operation(
                OperationType::Delete,
                entity,
                Value::Null,
                Some(original_id),
            )
            .await?;

        self.store.mark_cache_deleted(entity, original_id).await?;
        tracing::info!(entity, original_id, operation = id, "delete saved offline");
        Ok(Submission::Queued(id))
    }
}
