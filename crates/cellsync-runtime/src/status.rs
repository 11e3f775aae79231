use serde::Serialize;

/// The payload served by `GET /status`. The core owns this type and
/// computes it; route wiring belongs to `cellsync-daemon`'s HTTP layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub remote_online: bool,
    pub store_online: bool,
    pub snapshot_size: usize,
    pub rate_limited: bool,
    pub backoff_ms: u64,
    pub pending_to_remote: usize,
    pub pending_to_store: usize,
}
