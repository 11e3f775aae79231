use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cellsync_store::{Store, StoreError};
use cellsync_types::{CellAddress, CellValue, Origin, StoredCell};

use crate::clock::VirtualClock;

/// In-memory [`Store`] realization. `set_offline` flips every operation to
/// return [`StoreError::Offline`] without touching `rows`, mirroring how
/// `PgStore` would behave against a severed connection.
pub struct FakeStore {
    clock: VirtualClock,
    rows: Mutex<BTreeMap<CellAddress, StoredCell>>,
    offline: Mutex<bool>,
}

impl FakeStore {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            rows: Mutex::new(BTreeMap::new()),
            offline: Mutex::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    fn offline_err(&self) -> Option<StoreError> {
        if *self.offline.lock().unwrap() {
            Some(StoreError::Offline("fake store is offline".to_string()))
        } else {
            None
        }
    }

    /// Test helper for asserting store content without going through
    /// `read_all`'s ordering/cloning.
    pub fn row(&self, address: &CellAddress) -> Option<StoredCell> {
        self.rows.lock().unwrap().get(address).cloned()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn read_all(&self) -> Result<Vec<StoredCell>, StoreError> {
        if let Some(err) = self.offline_err() {
            return Err(err);
        }
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn upsert(&self, address: CellAddress, value: &CellValue, origin: Origin) -> Result<(), StoreError> {
        if let Some(err) = self.offline_err() {
            return Err(err);
        }
        self.rows.lock().unwrap().insert(
            address,
            StoredCell {
                address,
                value: value.clone(),
                origin,
                updated_at: self.clock.now_utc(),
            },
        );
        Ok(())
    }

    async fn delete(&self, address: CellAddress) -> Result<(), StoreError> {
        if let Some(err) = self.offline_err() {
            return Err(err);
        }
        self.rows.lock().unwrap().remove(&address);
        Ok(())
    }

    async fn update_origin_if_not_remote(&self, address: CellAddress) -> Result<(), StoreError> {
        if let Some(err) = self.offline_err() {
            return Err(err);
        }
        let mut rows = self.rows.lock().unwrap();
        if let Some(cell) = rows.get_mut(&address) {
            if !cell.origin.is_remote() {
                cell.origin = Origin::Remote;
                cell.updated_at = self.clock.now_utc();
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if let Some(err) = self.offline_err() {
            return Err(err);
        }
        Ok(())
    }
}
