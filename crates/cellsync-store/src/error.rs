use cellsync_types::ErrorKind;
use thiserror::Error;

/// Errors surfaced by [`crate::StoreClient`]. Classified against the shared
/// [`ErrorKind`] vocabulary so the reconciler can decide whether a failure
/// belongs in the `pending:to-store` queue (offline) or should simply be
/// dropped (data).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Offline(String),
    #[error("constraint or integrity violation: {0}")]
    Data(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Offline(_) => ErrorKind::OfflineStore,
            StoreError::Data(_) => ErrorKind::Data,
            StoreError::Other(_) => ErrorKind::Fatal,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Offline(err.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() || db_err.is_check_violation() => {
                StoreError::Data(err.to_string())
            }
            _ => StoreError::Other(anyhow::anyhow!(err)),
        }
    }
}
