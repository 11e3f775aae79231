//! Bootstrap, status, and shutdown wiring (§4.9). `Runtime` is the single
//! object `cellsync-daemon` constructs: given already-connected store/kv/
//! remote clients, it builds the lock service, the inbound/outbound
//! reconciler halves, and the worker pool, and owns the cancellation token
//! every long-lived task shares.

mod runtime;
mod status;

pub use runtime::Runtime;
pub use status::StatusSnapshot;
