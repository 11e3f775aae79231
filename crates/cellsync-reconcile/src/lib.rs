//! The reconciliation core (§4.5, §4.6): the inbound CDC poller and the
//! outbound debounced synchronizer, sharing one in-memory [`SnapshotState`]
//! and one [`PeerTracker`] per peer so either direction can observe and react
//! to the other's online/offline transitions.

mod cdc;
mod outbound;
mod peer_state;
mod snapshot_state;

pub use cdc::CdcReconciler;
pub use outbound::OutboundSynchronizer;
pub use peer_state::PeerTracker;
pub use snapshot_state::SnapshotState;
