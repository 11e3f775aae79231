use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks one peer's online/offline state (§4.9's state machine) behind a
/// single atomic, never exposed as a bare bool to callers. Both
/// [`crate::cdc::CdcReconciler`] and [`crate::outbound::OutboundSynchronizer`]
/// share one `PeerTracker` per peer (remote, store) so either side's I/O can
/// observe and react to the other's transitions.
///
/// Entering `online` from `offline` is the signal callers use to trigger a
/// pending-queue drain; since drains are idempotent (the underlying writes
/// are idempotent, per §4.7), two callers racing on the same transition is
/// harmless — at worst one of them finds the queue already empty.
#[derive(Debug)]
pub struct PeerTracker {
    online: AtomicBool,
}

impl PeerTracker {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a successful call. Returns `true` if this call observed the
    /// offline-to-online transition (i.e. a drain should be attempted).
    pub fn record_success(&self) -> bool {
        !self.online.swap(true, Ordering::SeqCst)
    }

    /// Records a failed call. Returns `true` if this call observed the
    /// online-to-offline transition (used only for logging; no action is
    /// required on entering offline beyond starting to queue).
    pub fn record_failure(&self) -> bool {
        self.online.swap(false, Ordering::SeqCst)
    }
}

impl Default for PeerTracker {
    fn default() -> Self {
        Self::new()
    }
}
