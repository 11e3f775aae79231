use std::sync::Arc;
use std::time::Duration;

use cellsync_types::Snapshot;

use crate::error::KvError;
use crate::kv_trait::Kv;

/// Persists the remote-side [`Snapshot`] to the KV under `snapshot:sheet` so
/// a restart can warm-start from the last-known remote state instead of
/// treating every cell as newly discovered (§4.5 bootstrap step i).
pub struct SnapshotCache {
    kv: Arc<dyn Kv>,
    key: String,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(kv: Arc<dyn Kv>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kv,
            key: key.into(),
            ttl,
        }
    }

    pub fn sheet(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self::new(kv, "snapshot:sheet", ttl)
    }

    pub fn db(kv: Arc<dyn Kv>, ttl: Duration) -> Self {
        Self::new(kv, "snapshot:db", ttl)
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), KvError> {
        let encoded = serde_json::to_string(snapshot).map_err(|e| KvError::Other(e.into()))?;
        self.kv.set_ttl(&self.key, &encoded, self.ttl).await
    }

    pub async fn load(&self) -> Result<Option<Snapshot>, KvError> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&raw).map_err(|e| KvError::Other(e.into()))?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryKv;
    use cellsync_types::{CellAddress, CellValue};

    #[tokio::test]
    async fn round_trips_through_the_kv() {
        let kv: Arc<dyn Kv> = Arc::new(InMemoryKv::new());
        let cache = SnapshotCache::sheet(kv, Duration::from_secs(86_400));

        assert!(cache.load().await.unwrap().is_none());

        let mut snapshot = Snapshot::new();
        snapshot.set(CellAddress::from_indices(5, 2).unwrap(), CellValue::new("E1").unwrap());
        cache.save(&snapshot).await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }
}
