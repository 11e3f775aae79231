use std::sync::Mutex;

use async_trait::async_trait;
use cellsync_remote::{RemoteError, RemoteSheet};
use cellsync_types::{CellAddress, CellValue, Snapshot};

/// In-memory [`RemoteSheet`] realization: a plain `Snapshot` standing in for
/// the sheet's live grid, plus test-controlled `offline`/`rate_limited`
/// switches so a scenario can force either failure mode without a real
/// backoff clock.
pub struct FakeRemote {
    grid: Mutex<Snapshot>,
    offline: Mutex<bool>,
    rate_limited: Mutex<bool>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            grid: Mutex::new(Snapshot::new()),
            offline: Mutex::new(false),
            rate_limited: Mutex::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn set_rate_limited(&self, rate_limited: bool) {
        *self.rate_limited.lock().unwrap() = rate_limited;
    }

    /// Test helper: simulate an edit arriving on the sheet directly (as a
    /// human or another process would), independent of this process's own
    /// `write_batch` calls.
    pub fn apply_external_edit(&self, address: CellAddress, value: CellValue) {
        self.grid.lock().unwrap().set(address, value);
    }

    pub fn external_delete(&self, address: CellAddress) {
        self.grid.lock().unwrap().remove(&address);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.grid.lock().unwrap().clone()
    }
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSheet for FakeRemote {
    async fn read_range(&self) -> Result<Snapshot, RemoteError> {
        if *self.rate_limited.lock().unwrap() {
            return Err(RemoteError::RateLimited);
        }
        if *self.offline.lock().unwrap() {
            return Err(RemoteError::Offline("fake remote is offline".to_string()));
        }
        Ok(self.grid.lock().unwrap().clone())
    }

    async fn write_batch(&self, changes: &[(CellAddress, CellValue)]) -> Result<(), RemoteError> {
        if *self.rate_limited.lock().unwrap() {
            return Err(RemoteError::RateLimited);
        }
        if *self.offline.lock().unwrap() {
            return Err(RemoteError::Offline("fake remote is offline".to_string()));
        }
        let mut grid = self.grid.lock().unwrap();
        for (addr, value) in changes {
            grid.set(*addr, value.clone());
        }
        Ok(())
    }

    async fn write_single(&self, address: CellAddress, value: &CellValue) -> Result<(), RemoteError> {
        self.write_batch(&[(address, value.clone())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_rejects_reads_and_writes() {
        let remote = FakeRemote::new();
        remote.set_offline(true);

        assert!(matches!(remote.read_range().await, Err(RemoteError::Offline(_))));
        let addr = CellAddress::new(1, "A").unwrap();
        let value = CellValue::new("x").unwrap();
        assert!(matches!(
            remote.write_batch(&[(addr, value)]).await,
            Err(RemoteError::Offline(_))
        ));
    }

    #[tokio::test]
    async fn external_edits_are_visible_to_read_range() {
        let remote = FakeRemote::new();
        let addr = CellAddress::new(3, "B").unwrap();
        remote.apply_external_edit(addr, CellValue::new("Hello").unwrap());

        let snapshot = remote.read_range().await.unwrap();
        assert_eq!(snapshot.get(&addr).unwrap().as_str(), "Hello");
    }
}
