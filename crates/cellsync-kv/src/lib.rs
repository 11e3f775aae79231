//! The shared KV collaborator (§6): a capability trait every other
//! crate writes against, a Redis-backed realization of it, and the
//! lease/ignore-mark/pending-queue/snapshot-cache primitives layered on top.

mod error;
mod ignore_mark;
mod kv_trait;
mod lock;
mod pending_queue;
mod redis_kv;
mod snapshot_cache;
#[cfg(test)]
mod test_support;

pub use error::KvError;
pub use ignore_mark::IgnoreMarks;
pub use kv_trait::Kv;
pub use lock::{Lease, LockService};
pub use pending_queue::PendingQueue;
pub use redis_kv::RedisKv;
pub use snapshot_cache::SnapshotCache;
