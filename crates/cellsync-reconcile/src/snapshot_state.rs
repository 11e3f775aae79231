use cellsync_types::{CellAddress, CellValue, Snapshot};
use tokio::sync::RwLock;

/// The reconciler's single-owner handle on the in-memory remote [`Snapshot`]
/// (§3, §9): shared between the inbound poller (which replaces it wholesale
/// each cycle) and the outbound synchronizer (which write-through patches
/// individual addresses after a successful push, per §4.2 layer 3). Callers
/// never see the underlying map directly.
pub struct SnapshotState {
    inner: RwLock<Snapshot>,
}

impl SnapshotState {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub async fn get(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, new_snapshot: Snapshot) {
        *self.inner.write().await = new_snapshot;
    }

    /// Echo-suppression layer 3: after a successful outbound push of
    /// `address`, overwrite the snapshot entry with the just-pushed value so
    /// the next inbound poll does not observe it as a new remote change.
    pub async fn write_through(&self, address: CellAddress, value: CellValue) {
        self.inner.write().await.set(address, value);
    }

    pub async fn remove(&self, address: &CellAddress) {
        self.inner.write().await.remove(address);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
