use std::sync::Arc;
use std::time::Duration;

use cellsync_kv::{IgnoreMarks, Kv, LockService};
use cellsync_reconcile::OutboundSynchronizer;
use cellsync_store::Store;
use cellsync_types::Origin;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::EditJob;
use crate::queue::pop_edit_job;
use crate::rate_limiter::RateLimiter;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_RATE_LIMIT_PER_MINUTE: usize = 55;
const JOB_CHANNEL_CAPACITY: usize = 128;

/// Exponential retry schedule applied between attempts (§4.8: "3 attempts,
/// exponential 1/2/4 s"): one initial attempt plus three retries, with these
/// delays before each retry.
const RETRY_BACKOFFS: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

/// The job-queue worker (§4.8): a bounded pool of tasks pulling point-edit
/// jobs off the `jobs:edit` KV list, applying each as a lease-guarded,
/// IgnoreMark-aware, idempotent upsert, then triggering outbound
/// reconciliation so the remote sheet converges on the new value.
pub struct JobWorker {
    kv: Arc<dyn Kv>,
    store: Arc<dyn Store>,
    ignore_marks: IgnoreMarks,
    lock_service: Arc<LockService>,
    synchronizer: Arc<OutboundSynchronizer>,
    limiter: RateLimiter,
    fanout: usize,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(
        kv: Arc<dyn Kv>,
        store: Arc<dyn Store>,
        lock_service: Arc<LockService>,
        synchronizer: Arc<OutboundSynchronizer>,
        fanout: usize,
    ) -> Self {
        Self {
            ignore_marks: IgnoreMarks::new(kv.clone()),
            kv,
            store,
            lock_service,
            synchronizer,
            limiter: RateLimiter::per_minute(DEFAULT_RATE_LIMIT_PER_MINUTE),
            fanout: fanout.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Spawns the poller task plus `fanout` consumer tasks, all bound to
    /// `cancel`. Returns every handle so the caller can await them on
    /// shutdown.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let (tx, rx) = mpsc::channel::<EditJob>(JOB_CHANNEL_CAPACITY);
        let rx = Arc::new(AsyncMutex::new(rx));

        let mut handles = Vec::with_capacity(self.fanout + 1);

        let poller_self = Arc::clone(self);
        let poller_cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            poller_self.poll_jobs(tx, poller_cancel).await;
        }));

        for _ in 0..self.fanout {
            let worker_self = Arc::clone(self);
            let worker_rx = Arc::clone(&rx);
            let worker_cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                worker_self.consume(worker_rx, worker_cancel).await;
            }));
        }

        handles
    }

    async fn poll_jobs(&self, tx: mpsc::Sender<EditJob>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("job poller cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            loop {
                match pop_edit_job(&self.kv).await {
                    Ok(Some(job)) => {
                        if tx.send(job).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "failed to poll jobs:edit");
                        break;
                    }
                }
            }
        }
    }

    async fn consume(&self, rx: Arc<AsyncMutex<mpsc::Receiver<EditJob>>>, cancel: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("job consumer cancelled");
                    return;
                }
                job = async { rx.lock().await.recv().await } => match job {
                    Some(job) => job,
                    None => return,
                },
            };

            self.limiter.acquire().await;
            self.process(job, &cancel).await;
        }
    }

    async fn process(&self, job: EditJob, cancel: &CancellationToken) {
        let (row, col) = (job.address.row(), job.address.col_index());

        match self.ignore_marks.exists(row, col).await {
            Ok(true) => {
                debug!(job_id = %job.job_id, %job.address, "skipping job: address carries an active ignore mark");
                return;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(job_id = %job.job_id, error = %err, "failed to check ignore mark, applying job anyway");
            }
        }

        let owner = format!("worker:{}", job.job_id);
        let lease = match self.lock_service.acquire(row, col, &owner, cancel).await {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                warn!(job_id = %job.job_id, %job.address, "job denied: cell lease unavailable (contention)");
                return;
            }
            Err(err) => {
                warn!(job_id = %job.job_id, error = %err, "lock service error, dropping job");
                return;
            }
        };

        if let Err(err) = self.apply_with_retry(&job).await {
            warn!(job_id = %job.job_id, %job.address, error = %err, "dropping job after exhausting retries");
        } else {
            info!(job_id = %job.job_id, %job.address, "job applied");
        }

        if let Ok(released) = self.lock_service.release(lease).await {
            if !released {
                debug!(job_id = %job.job_id, "lease had already expired by release time");
            }
        }

        self.synchronizer.request_sync().await;
    }

    async fn apply_with_retry(&self, job: &EditJob) -> Result<(), cellsync_store::StoreError> {
        let mut last_err = None;
        for (attempt, delay) in std::iter::once(None).chain(RETRY_BACKOFFS.into_iter().map(Some)).enumerate() {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result = match &job.value {
                Some(value) => self.store.upsert(job.address, value, Origin::Worker).await,
                None => self.store.delete(job.address).await,
            };
            match result {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(job_id = %job.job_id, attempt, error = %err, "job apply attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.expect("loop runs at least once"))
    }
}
