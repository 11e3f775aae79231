/// The closed vocabulary of error kinds from the error-handling design.
///
/// Every crate-level error type below `cellsync-types` (KV, store, remote)
/// exposes a `kind() -> ErrorKind` method so the reconciler can branch on
/// this shared enum instead of matching concrete error types defined in
/// three different crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote peer only; silent backoff, never reported as a failure.
    RateLimited,
    /// The remote sheet is unreachable.
    OfflineRemote,
    /// The relational store is unreachable.
    OfflineStore,
    /// A lease was denied after exhausting `maxAttempts` retries.
    Contention,
    /// Malformed input at an ingress boundary; rejected before reaching the core.
    Validation,
    /// A constraint violation or integrity error from the store; the write
    /// is dropped, reconciliation continues.
    Data,
    /// Unrecoverable; the process exits with code 1.
    Fatal,
}

impl ErrorKind {
    /// `rate-limited` and `offline-*` are the kinds degraded-mode logic
    /// branches on without caring about the underlying cause.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::OfflineRemote | ErrorKind::OfflineStore
        )
    }
}
