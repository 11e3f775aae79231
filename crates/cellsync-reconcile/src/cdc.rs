use std::sync::Arc;
use std::time::Duration;

use cellsync_kv::{IgnoreMarks, Kv, KvError, PendingQueue, SnapshotCache};
use cellsync_remote::{RemoteError, RemoteSheet};
use cellsync_store::{Store, StoreError};
use cellsync_types::{diff, CellAddress, CellValue, Origin, PendingChange, Snapshot};
use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::peer_state::PeerTracker;
use crate::snapshot_state::SnapshotState;

/// The inbound half of the reconciler (§4.5): bootstraps from the warm
/// snapshot, then polls the remote sheet on a fixed interval, diffing each
/// read against the previous [`Snapshot`] and writing changes to the store
/// with origin `remote`, emitting the `IgnoreMark` that suppresses the
/// outbound echo.
pub struct CdcReconciler {
    store: Arc<dyn Store>,
    remote: Arc<dyn RemoteSheet>,
    ignore_marks: IgnoreMarks,
    snapshot_cache: SnapshotCache,
    pending_to_store: PendingQueue,
    pending_to_remote: PendingQueue,
    snapshot: Arc<SnapshotState>,
    remote_tracker: Arc<PeerTracker>,
    store_tracker: Arc<PeerTracker>,
    poll_interval: Duration,
    /// Enforces "at most one outstanding poll at a time" (§4.5) without a
    /// busy loop: `try_lock` fails instantly if a poll is already running.
    poll_guard: AsyncMutex<()>,
}

impl CdcReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kv: Arc<dyn Kv>,
        store: Arc<dyn Store>,
        remote: Arc<dyn RemoteSheet>,
        snapshot: Arc<SnapshotState>,
        remote_tracker: Arc<PeerTracker>,
        store_tracker: Arc<PeerTracker>,
        ignore_mark_ttl: Duration,
        poll_interval: Duration,
        snapshot_ttl: Duration,
    ) -> Self {
        Self {
            ignore_marks: IgnoreMarks::with_ttl(kv.clone(), ignore_mark_ttl),
            snapshot_cache: SnapshotCache::sheet(kv.clone(), snapshot_ttl),
            pending_to_store: PendingQueue::to_store(kv.clone()),
            pending_to_remote: PendingQueue::to_remote(kv),
            store,
            remote,
            snapshot,
            remote_tracker,
            store_tracker,
            poll_interval,
            poll_guard: AsyncMutex::new(()),
        }
    }

    /// Bootstrap: warm-start from the cached remote snapshot, attempt a
    /// fresh read, one-shot sync non-empty cells into the store, then drain
    /// both offline queues. Store-then-remote is the fixed drain order,
    /// matching the order the store client is wired before the remote
    /// client during bootstrap.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        if let Some(warm) = self.snapshot_cache.load().await? {
            info!(cells = warm.len(), "warm-started remote snapshot from kv cache");
            self.snapshot.replace(warm).await;
        }

        match self.remote.read_range().await {
            Ok(current) => {
                self.remote_tracker.record_success();
                self.snapshot_cache.save(&current).await?;
                self.one_shot_sync_into_store(&current).await?;
                self.snapshot.replace(current).await;
            }
            Err(err) => {
                warn!(error = %err, "bootstrap remote read failed, continuing in degraded mode on warm snapshot");
                if matches!(err, RemoteError::Offline(_)) {
                    self.remote_tracker.record_failure();
                }
            }
        }

        self.drain_pending_to_store().await;
        self.drain_pending_to_remote().await;
        Ok(())
    }

    async fn one_shot_sync_into_store(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        for (address, value) in snapshot.iter() {
            if let Err(err) = self.store.upsert(*address, value, Origin::Remote).await {
                warn!(%address, error = %err, "bootstrap sync-into-store failed for one cell");
            }
        }
        Ok(())
    }

    /// Runs the poll loop until `cancel` fires. Intended to be spawned as its
    /// own task by `cellsync-runtime`.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = cancel.cancelled() => {
                    debug!("cdc poll loop cancelled");
                    return;
                }
            }
        }
    }

    /// §4.5 poll loop body. Skips entirely (no I/O, no log) if a previous
    /// poll is still in flight.
    pub async fn poll_once(&self) {
        let Ok(_guard) = self.poll_guard.try_lock() else {
            debug!("skipping poll: previous poll still in flight");
            return;
        };

        self.probe_store().await;

        let current = match self.remote.read_range().await {
            Ok(snapshot) => snapshot,
            Err(RemoteError::RateLimited) => return,
            Err(err) => {
                if matches!(err, RemoteError::Offline(_)) && self.remote_tracker.record_failure() {
                    warn!("remote sheet transitioned offline during poll");
                }
                return;
            }
        };

        if self.remote_tracker.record_success() {
            info!("remote sheet back online, draining pending-to-remote queue");
            self.drain_pending_to_remote().await;
        }

        let previous = self.snapshot.get().await;
        let delta = diff(&current, &previous);
        if delta.is_empty() {
            self.snapshot.replace(current).await;
            return;
        }

        debug!(changes = delta.changes.len(), deletions = delta.deletions.len(), "poll detected remote changes");

        for (address, value) in &delta.changes {
            self.ignore_marks.set(address.row(), address.col_index()).await.ok();
            if let Err(err) = self.store.upsert(*address, value, Origin::Remote).await {
                self.handle_store_write_failure(err, *address, Some(value.clone())).await;
            }
        }
        for address in &delta.deletions {
            self.ignore_marks.set(address.row(), address.col_index()).await.ok();
            if let Err(err) = self.store.delete(*address).await {
                self.handle_store_write_failure(err, *address, None).await;
            }
        }

        if let Err(err) = self.snapshot_cache.save(&current).await {
            warn!(error = %err, "failed to persist sheet snapshot to kv");
        }
        self.snapshot.replace(current).await;
    }

    async fn handle_store_write_failure(&self, err: StoreError, address: CellAddress, value: Option<CellValue>) {
        match err {
            StoreError::Offline(_) => {
                if self.store_tracker.record_failure() {
                    warn!("store transitioned offline during poll write");
                }
                let change = PendingChange::new(address, value, Origin::Remote, Utc::now());
                if let Err(e) = self.pending_to_store.push_back(&change).await {
                    warn!(%address, error = %e, "failed to enqueue pending-to-store entry");
                }
            }
            StoreError::Data(reason) => {
                warn!(%address, %reason, "dropping write: store rejected it as a data/integrity error");
            }
            StoreError::Other(e) => {
                warn!(%address, error = %e, "unexpected store error applying remote change");
            }
        }
    }

    async fn probe_store(&self) {
        let result = self.store.ping().await;
        match result {
            Ok(()) => {
                if self.store_tracker.record_success() {
                    info!("store back online, draining pending-to-store queue");
                    self.drain_pending_to_store().await;
                }
            }
            Err(_) => {
                self.store_tracker.record_failure();
            }
        }
    }

    async fn drain_pending_to_store(&self) {
        let store = self.store.clone();
        let result = self
            .pending_to_store
            .drain(|change| {
                let store = store.clone();
                async move {
                    match change.value {
                        Some(value) => store.upsert(change.address, &value, change.origin).await,
                        None => store.delete(change.address).await,
                    }
                    .map_err(|e| KvError::Other(anyhow::anyhow!(e)))
                }
            })
            .await;
        if let Err(err) = result {
            debug!(error = %err, "pending-to-store drain stopped early");
        }
    }

    async fn drain_pending_to_remote(&self) {
        let remote = self.remote.clone();
        let result = self
            .pending_to_remote
            .drain(|change| {
                let remote = remote.clone();
                async move {
                    let value = change.value.unwrap_or_else(CellValue::empty);
                    remote
                        .write_single(change.address, &value)
                        .await
                        .map_err(|e| KvError::Other(anyhow::anyhow!(e)))
                }
            })
            .await;
        if let Err(err) = result {
            debug!(error = %err, "pending-to-remote drain stopped early");
        }
    }
}
