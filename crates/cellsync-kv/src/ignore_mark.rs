use std::sync::Arc;
use std::time::Duration;

use crate::error::KvError;
use crate::kv_trait::Kv;

const DEFAULT_TTL: Duration = Duration::from_secs(10);

fn ignore_key(row: u32, col_index: u8) -> String {
    format!("ignore:{row}:{col_index}")
}

/// Half of the echo-suppression protocol (§4.2). An IgnoreMark is a
/// write-once, TTL-expiring flag set immediately before the reconciler
/// applies a remote-originated change to the store, so the outbound path
/// can recognize and skip its own just-applied write.
pub struct IgnoreMarks {
    kv: Arc<dyn Kv>,
    ttl: Duration,
}

impl IgnoreMarks {
    pub fn new(kv: Arc<dyn Kv>) -> Self {
        Self { kv, ttl: DEFAULT_TTL }
    }

    pub fn with_ttl(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Marks `(row, col_index)` as ignore-worthy for the next [`Self::ttl`].
    /// The value carried is irrelevant; only presence is checked.
    pub async fn set(&self, row: u32, col_index: u8) -> Result<(), KvError> {
        self.kv.set_ttl(&ignore_key(row, col_index), "1", self.ttl).await
    }

    pub async fn exists(&self, row: u32, col_index: u8) -> Result<bool, KvError> {
        self.kv.exists(&ignore_key(row, col_index)).await
    }
}
