use std::sync::Arc;
use std::time::Duration;

use cellsync_config::ReconcilerConfig;
use cellsync_kv::{Kv, LockService, PendingQueue};
use cellsync_reconcile::{CdcReconciler, OutboundSynchronizer, PeerTracker, SnapshotState};
use cellsync_remote::RemoteSheet;
use cellsync_store::Store;
use cellsync_types::Snapshot;
use cellsync_worker::JobWorker;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::status::StatusSnapshot;

/// Bound on any single bootstrap or shutdown step (§5: request-level
/// timeouts default to 10 s); a step that exceeds it is logged and skipped
/// rather than blocking the remaining steps indefinitely (§4.9: "steps are
/// attempted in order and continue past failures").
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the bootstrap sequence, the shared cancellation token, and every
/// long-lived task (§4.9): the lock service, the inbound/outbound
/// reconciler halves, and the job-worker pool are all constructed here
/// around the store/kv/remote clients the caller already connected, in the
/// fixed order `lock service -> reconciler -> worker`.
pub struct Runtime {
    remote: Arc<dyn RemoteSheet>,
    snapshot: Arc<SnapshotState>,
    remote_tracker: Arc<PeerTracker>,
    store_tracker: Arc<PeerTracker>,
    cdc: Arc<CdcReconciler>,
    outbound: Arc<OutboundSynchronizer>,
    worker: Arc<JobWorker>,
    pending_to_remote: PendingQueue,
    pending_to_store: PendingQueue,
    cancel: CancellationToken,
}

impl Runtime {
    /// Constructs every internal component. `kv`, `store`, and `remote` are
    /// expected to already be connected — the caller (`cellsync-daemon`)
    /// performs the "store client -> KV client -> remote client" part of
    /// the bootstrap order in §4.9 before calling this.
    pub fn new(
        config: &ReconcilerConfig,
        kv: Arc<dyn Kv>,
        store: Arc<dyn Store>,
        remote: Arc<dyn RemoteSheet>,
    ) -> Arc<Self> {
        let lock_service = Arc::new(LockService::with_params(
            kv.clone(),
            config.lease_ttl,
            config.lock_retry_delay,
            config.lock_max_attempts,
        ));
        let snapshot = Arc::new(SnapshotState::new(Snapshot::new()));
        let remote_tracker = Arc::new(PeerTracker::new());
        let store_tracker = Arc::new(PeerTracker::new());

        let cdc = Arc::new(CdcReconciler::new(
            kv.clone(),
            store.clone(),
            remote.clone(),
            snapshot.clone(),
            remote_tracker.clone(),
            store_tracker.clone(),
            config.ignore_mark_ttl,
            config.poll_interval,
            config.snapshot_ttl,
        ));

        let outbound = OutboundSynchronizer::new(
            kv.clone(),
            store.clone(),
            remote.clone(),
            snapshot.clone(),
            remote_tracker.clone(),
            config.outbound_debounce,
            config.snapshot_ttl,
        );

        let worker = Arc::new(JobWorker::new(
            kv.clone(),
            store,
            lock_service,
            outbound.clone(),
            config.worker_fanout,
        ));

        Arc::new(Self {
            pending_to_remote: PendingQueue::to_remote(kv.clone()),
            pending_to_store: PendingQueue::to_store(kv),
            remote,
            snapshot,
            remote_tracker,
            store_tracker,
            cdc,
            outbound,
            worker,
            cancel: CancellationToken::new(),
        })
    }

    /// §4.5 bootstrap: warm-start, one-shot sync, drain both offline
    /// queues. Bounded by [`STEP_TIMEOUT`]; a timeout is logged, not fatal,
    /// since bootstrap is allowed to continue in degraded mode.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        match timeout(STEP_TIMEOUT, self.cdc.bootstrap()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("bootstrap exceeded the step timeout, continuing with whatever state was loaded");
                Ok(())
            }
        }
    }

    /// Starts the poll loop and the worker pool, all bound to this
    /// runtime's shared cancellation token. Returns every task handle so
    /// the caller can await them during [`Runtime::shutdown`].
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let cdc = self.cdc.clone();
        let poll_cancel = self.cancel.clone();
        handles.push(tokio::spawn(async move {
            cdc.run(poll_cancel).await;
        }));

        handles.extend(self.worker.spawn(self.cancel.clone()));
        handles
    }

    /// §4.9 shutdown: stop the poller (cancellation), flush the debounce
    /// timer if one is in flight, drain the worker pool, all with bounded
    /// per-step timeouts that are logged, never propagated, so one slow
    /// step cannot block the rest.
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) {
        self.cancel.cancel();

        if timeout(STEP_TIMEOUT, self.outbound.shutdown()).await.is_err() {
            warn!("outbound synchronizer did not flush within the shutdown timeout");
        }

        for handle in handles {
            if timeout(STEP_TIMEOUT, handle).await.is_err() {
                warn!("a background task did not exit within the shutdown timeout");
            }
        }

        info!("runtime shutdown complete");
        // `kv`/`store`/`remote` hold no explicit close method: the Redis
        // connection manager and the Postgres pool tear down their sockets
        // on drop, so there is nothing further to do here.
    }

    /// The `GET /status` struct (§6), computed fresh on every call.
    pub async fn status(&self) -> StatusSnapshot {
        let (rate_limited, backoff) = self.remote.rate_limit_status();
        StatusSnapshot {
            remote_online: self.remote_tracker.is_online(),
            store_online: self.store_tracker.is_online(),
            snapshot_size: self.snapshot.len().await,
            rate_limited,
            backoff_ms: backoff.as_millis() as u64,
            pending_to_remote: self.pending_to_remote.len().await.unwrap_or(0),
            pending_to_store: self.pending_to_store.len().await.unwrap_or(0),
        }
    }

    /// `POST /force-sync`'s integration point: bypasses the debounce timer
    /// and runs one outbound pass immediately.
    pub async fn force_outbound_sync(&self) -> anyhow::Result<()> {
        self.outbound.force_sync().await
    }

    /// `GET /cached-snapshot`'s integration point.
    pub async fn cached_snapshot(&self) -> Snapshot {
        self.snapshot.get().await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
