use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cellsync_kv::{Kv, PendingQueue, SnapshotCache};
use cellsync_remote::{RemoteError, RemoteSheet};
use cellsync_store::Store;
use cellsync_types::{CellAddress, CellValue, Origin, PendingChange, StoredCell};
use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::peer_state::PeerTracker;
use crate::snapshot_state::SnapshotState;

/// The outbound half of the reconciler (§4.6): debounces local writes into a
/// single batch push to the remote sheet, patching the shared in-memory
/// snapshot through on success so the next inbound poll does not re-discover
/// its own write (§4.2 layer 3).
pub struct OutboundSynchronizer {
    store: Arc<dyn Store>,
    remote: Arc<dyn RemoteSheet>,
    pending_to_remote: PendingQueue,
    db_cache: SnapshotCache,
    snapshot: Arc<SnapshotState>,
    remote_tracker: Arc<PeerTracker>,
    debounce: Duration,
    dirty: AtomicBool,
    timer: AsyncMutex<Option<JoinHandle<()>>>,
    /// Held across an entire push so a debounce fire racing with a manual
    /// `force_sync` call never overlaps two batch pushes.
    sync_lock: AsyncMutex<()>,
}

impl OutboundSynchronizer {
    pub fn new(
        kv: Arc<dyn Kv>,
        store: Arc<dyn Store>,
        remote: Arc<dyn RemoteSheet>,
        snapshot: Arc<SnapshotState>,
        remote_tracker: Arc<PeerTracker>,
        debounce: Duration,
        snapshot_ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            pending_to_remote: PendingQueue::to_remote(kv.clone()),
            db_cache: SnapshotCache::db(kv, snapshot_ttl),
            store,
            remote,
            snapshot,
            remote_tracker,
            debounce,
            dirty: AtomicBool::new(false),
            timer: AsyncMutex::new(None),
            sync_lock: AsyncMutex::new(()),
        })
    }

    /// Called whenever the worker or some other local writer changes the
    /// store (§4.6 step 1): marks the synchronizer dirty and (re)schedules a
    /// debounced push, cancelling any timer already in flight so bursts of
    /// edits collapse into one push.
    pub async fn request_sync(self: &Arc<Self>) {
        self.dirty.store(true, Ordering::SeqCst);

        let mut slot = self.timer.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let this = Arc::clone(self);
        let debounce = self.debounce;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            this.fire().await;
        }));
    }

    async fn fire(self: &Arc<Self>) {
        if self.dirty.swap(false, Ordering::SeqCst) {
            if let Err(err) = self.run_pass().await {
                warn!(error = %err, "outbound sync pass failed");
            }
        }
    }

    /// Cancels any outstanding debounce timer and, if a write is still
    /// pending, flushes it synchronously (§4.9 shutdown step).
    pub async fn shutdown(self: &Arc<Self>) {
        let mut slot = self.timer.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        drop(slot);
        if self.dirty.swap(false, Ordering::SeqCst) {
            if let Err(err) = self.run_pass().await {
                warn!(error = %err, "final outbound flush on shutdown failed");
            }
        }
    }

    /// Forces an immediate pass, bypassing the debounce timer. Used by the
    /// (out-of-scope) status/force-sync route exposed through the runtime.
    pub async fn force_sync(self: &Arc<Self>) -> anyhow::Result<()> {
        self.run_pass().await
    }

    /// §4.6 steps 2-7: read the store's current state (degrading to the
    /// cached `snapshot:db` if the store is offline), diff it against the
    /// remote side, and push the result as one batch.
    async fn run_pass(&self) -> anyhow::Result<()> {
        let _guard = self.sync_lock.lock().await;
        let rows = match self.store.read_all().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "store read_all failed during outbound pass, falling back to cached snapshot:db");
                return self.run_pass_from_cache().await;
            }
        };

        if !self.remote_tracker.is_online() {
            debug!("remote known offline, enqueueing pass instead of attempting a push");
            self.enqueue_all(&rows).await;
            return Ok(());
        }

        let current_remote = match self.remote.read_range().await {
            Ok(snapshot) => snapshot,
            Err(RemoteError::RateLimited) => {
                debug!("remote rate limited, deferring this outbound pass");
                return Ok(());
            }
            Err(err) => {
                if matches!(err, RemoteError::Offline(_)) {
                    self.remote_tracker.record_failure();
                    self.enqueue_all(&rows).await;
                }
                return Err(err.into());
            }
        };
        self.remote_tracker.record_success();

        let mut batch = Vec::new();
        for row in &rows {
            if row.origin.is_remote() {
                continue;
            }
            if current_remote.value_or_empty(&row.address) != row.value.as_str() {
                batch.push((row.address, row.value.clone()));
            }
        }
        for address in current_remote.addresses() {
            if !rows.iter().any(|r| &r.address == address) {
                batch.push((*address, CellValue::empty()));
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        debug!(cells = batch.len(), "pushing outbound batch to remote sheet");
        match self.remote.write_batch(&batch).await {
            Ok(()) => {
                for (address, value) in &batch {
                    self.snapshot.write_through(*address, value.clone()).await;
                    if let Err(e) = self.store.update_origin_if_not_remote(*address).await {
                        warn!(%address, error = %e, "failed to mark pushed cell as remote-origin");
                    }
                }
                info!(cells = batch.len(), "outbound batch push succeeded");
                Ok(())
            }
            Err(RemoteError::Offline(reason)) => {
                warn!(%reason, "outbound batch push failed: remote offline, re-enqueueing entire batch");
                self.remote_tracker.record_failure();
                self.enqueue_batch(&batch).await;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Degraded-mode pass (§4.6, store offline): the warm `snapshot:db`
    /// cache has no origin metadata, so every cached row is treated as
    /// push-eligible rather than attempting to infer its origin.
    async fn run_pass_from_cache(&self) -> anyhow::Result<()> {
        let Some(cached) = self.db_cache.load().await? else {
            debug!("no cached snapshot:db available, skipping degraded outbound pass");
            return Ok(());
        };
        let rows: Vec<StoredCell> = cached
            .iter()
            .map(|(address, value)| StoredCell {
                address: *address,
                value: value.clone(),
                origin: Origin::LocalTerminal,
                updated_at: Utc::now(),
            })
            .collect();
        self.enqueue_all(&rows).await;
        Ok(())
    }

    async fn enqueue_all(&self, rows: &[StoredCell]) {
        for row in rows {
            if row.origin.is_remote() {
                continue;
            }
            self.enqueue_one(row.address, Some(row.value.clone()), row.origin.clone()).await;
        }
    }

    async fn enqueue_batch(&self, batch: &[(CellAddress, CellValue)]) {
        for (address, value) in batch {
            let value = if value.is_empty() { None } else { Some(value.clone()) };
            self.enqueue_one(*address, value, Origin::LocalTerminal).await;
        }
    }

    async fn enqueue_one(&self, address: CellAddress, value: Option<CellValue>, origin: Origin) {
        let change = PendingChange::new(address, value, origin, Utc::now());
        if let Err(e) = self.pending_to_remote.push_back(&change).await {
            warn!(%address, error = %e, "failed to enqueue pending-to-remote entry");
        }
    }
}

