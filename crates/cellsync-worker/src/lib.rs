//! The optional job-queue ingress (§4.8): point-edit notifications queued
//! onto the shared KV's `jobs:edit` list and applied by a bounded worker
//! pool, reusing the lock service and echo-suppression primitives from
//! `cellsync-kv` and triggering `cellsync-reconcile`'s outbound synchronizer
//! on completion so the remote sheet converges.

mod job;
mod queue;
mod rate_limiter;
mod worker;

pub use job::EditJob;
pub use queue::enqueue_edit_job;
pub use rate_limiter::RateLimiter;
pub use worker::JobWorker;
