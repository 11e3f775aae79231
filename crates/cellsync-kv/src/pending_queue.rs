use std::sync::Arc;

use cellsync_types::PendingChange;

use crate::error::KvError;
use crate::kv_trait::Kv;

/// A durable FIFO list of [`PendingChange`]s, backing both the `pending:to-remote`
/// / `pending:to-store` offline queues (§4.7) and the `jobs:edit` ingress queue
/// (§4.8), which share the same shape and KV-list transport.
pub struct PendingQueue {
    kv: Arc<dyn Kv>,
    key: String,
}

impl PendingQueue {
    pub fn new(kv: Arc<dyn Kv>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    pub fn to_remote(kv: Arc<dyn Kv>) -> Self {
        Self::new(kv, "pending:to-remote")
    }

    pub fn to_store(kv: Arc<dyn Kv>) -> Self {
        Self::new(kv, "pending:to-store")
    }

    pub fn jobs_edit(kv: Arc<dyn Kv>) -> Self {
        Self::new(kv, "jobs:edit")
    }

    pub async fn push_back(&self, change: &PendingChange) -> Result<(), KvError> {
        let encoded = serde_json::to_string(change).map_err(|e| KvError::Other(e.into()))?;
        self.kv.list_push_back(&self.key, &encoded).await
    }

    /// Re-enqueues at the head, preserving FIFO order after a failed replay
    /// attempt: restored items go back to the head, not the tail.
    pub async fn push_front(&self, change: &PendingChange) -> Result<(), KvError> {
        let encoded = serde_json::to_string(change).map_err(|e| KvError::Other(e.into()))?;
        self.kv.list_push_front(&self.key, &encoded).await
    }

    pub async fn pop_front(&self) -> Result<Option<PendingChange>, KvError> {
        let Some(raw) = self.kv.list_pop_front(&self.key).await? else {
            return Ok(None);
        };
        let change = serde_json::from_str(&raw).map_err(|e| KvError::Other(e.into()))?;
        Ok(Some(change))
    }

    pub async fn len(&self) -> Result<usize, KvError> {
        self.kv.list_len(&self.key).await
    }

    pub async fn is_empty(&self) -> Result<bool, KvError> {
        Ok(self.len().await? == 0)
    }

    /// Drains the queue element-by-element via `apply`, aborting and
    /// restoring FIFO order on the first failure (§4.7). Returns the number
    /// of elements successfully replayed before the drain stopped.
    pub async fn drain<F, Fut>(&self, mut apply: F) -> Result<usize, KvError>
    where
        F: FnMut(PendingChange) -> Fut,
        Fut: std::future::Future<Output = Result<(), KvError>>,
    {
        let mut replayed = 0;
        loop {
            let Some(change) = self.pop_front().await? else {
                break;
            };
            match apply(change.clone()).await {
                Ok(()) => replayed += 1,
                Err(err) => {
                    self.push_front(&change).await?;
                    return Err(err);
                }
            }
        }
        Ok(replayed)
    }
}
