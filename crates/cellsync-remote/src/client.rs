use std::time::Duration;

use async_trait::async_trait;
use cellsync_types::{CellAddress, CellValue, Snapshot};

use crate::error::RemoteError;

/// The remote spreadsheet collaborator's capability surface (§4.3). `HttpRemote`
/// is the real adapter; `cellsync-testkit::FakeRemote` implements the same
/// trait over an in-memory grid for deterministic tests.
#[async_trait]
pub trait RemoteSheet: Send + Sync {
    /// Reads the configured range and returns the full [`Snapshot`] it
    /// represents. Rate-limited and unreachable outcomes are reported as
    /// [`RemoteError::RateLimited`] / [`RemoteError::Offline`], never as a
    /// partial or empty `Snapshot`.
    async fn read_range(&self) -> Result<Snapshot, RemoteError>;

    /// Pushes a batch of writes. The underlying API is all-or-nothing: a
    /// failure here means none of `changes` were applied (§9 resolved open
    /// question), so callers must re-enqueue every entry, not a subset.
    async fn write_batch(&self, changes: &[(CellAddress, CellValue)]) -> Result<(), RemoteError>;

    /// Convenience single-cell write used by queue replay (§4.7), expressed
    /// as a one-element `write_batch` call by the real adapter.
    async fn write_single(&self, address: CellAddress, value: &CellValue) -> Result<(), RemoteError>;

    /// `(is_backing_off, remaining_backoff)`, surfaced for the `GET /status`
    /// struct (§6). Fakes that never rate-limit can rely on the default.
    fn rate_limit_status(&self) -> (bool, Duration) {
        (false, Duration::ZERO)
    }
}
