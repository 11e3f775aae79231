use cellsync_types::ErrorKind;
use thiserror::Error;

/// Errors surfaced by [`crate::RemoteSheet`]. Callers above this crate never
/// see a raw `reqwest::Error` — every HTTP/transport failure is classified
/// here first.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("rate limited, retry after backoff")]
    RateLimited,
    #[error("remote sheet unreachable: {0}")]
    Offline(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::RateLimited => ErrorKind::RateLimited,
            RemoteError::Offline(_) => ErrorKind::OfflineRemote,
            RemoteError::Malformed(_) => ErrorKind::Data,
            RemoteError::Other(_) => ErrorKind::Fatal,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(429) {
            RemoteError::RateLimited
        } else if err.is_timeout() || err.is_connect() {
            RemoteError::Offline(err.to_string())
        } else {
            RemoteError::Other(anyhow::anyhow!(err))
        }
    }
}
