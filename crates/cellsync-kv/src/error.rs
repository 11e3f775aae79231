use thiserror::Error;

/// Errors surfaced by the [`crate::Kv`] trait.
///
/// `redis`'s `ConnectionManager` already retries transport-level failures
/// with its own exponential backoff (per the shared-resource policy), so by
/// the time an error reaches a caller here it is either a genuine
/// connection loss worth surfacing as offline-ish, or a logic/programmer
/// error that should not be silently retried.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv connection unavailable: {0}")]
    ConnectionFailed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<redis::RedisError> for KvError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            KvError::ConnectionFailed(err.to_string())
        } else {
            KvError::Other(anyhow::anyhow!(err))
        }
    }
}
