use std::time::Duration;

use async_trait::async_trait;

use crate::error::KvError;

/// The capability surface the shared KV collaborator must provide (§6):
/// atomic set-if-absent-with-TTL, atomic conditional delete, string get/set
/// with TTL, and FIFO list push/pop. Every component above this trait —
/// the lock service, echo suppression, the pending queues, the snapshot
/// cache, the job queue — is written against `Kv`, not against `redis`
/// directly, so [`crate::testkit`] style in-memory fakes (see
/// `cellsync-testkit::FakeKv`) can stand in for tests.
#[async_trait]
pub trait Kv: Send + Sync {
    /// `SET key value NX EX ttl`. Returns `true` if the key was set (it was
    /// absent), `false` if it already existed and was left untouched.
    async fn set_nx_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    /// Atomic check-and-delete: removes `key` only if its current value
    /// equals `expected`. Returns `true` if it was deleted. A mismatched or
    /// absent key is a silent `false`, never an error.
    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool, KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    async fn del(&self, key: &str) -> Result<(), KvError>;

    /// Push onto the tail of a list (`RPUSH`).
    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Push onto the head of a list (`LPUSH`) — used to restore FIFO order
    /// after a failed replay attempt (§4.7).
    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Pop from the head of a list (`LPOP`).
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn list_len(&self, key: &str) -> Result<usize, KvError>;
}
