use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::KvError;
use crate::kv_trait::Kv;

/// Atomic compare-and-delete, implemented as a Lua script since `redis`
/// has no single command for it (§6: "the equivalent compare-and-delete via
/// a short server-side script").
const DEL_IF_EQ_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
  return redis.call("DEL", KEYS[1])
else
  return 0
end
"#;

/// The real KV adapter, backed by Redis. `ConnectionManager` auto-reconnects
/// with its own exponential backoff, matching the shared-resource policy in
/// §5 — this type never implements retry logic of its own.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
    del_if_eq: redis::Script,
}

impl RedisKv {
    pub async fn connect(address: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(address).map_err(KvError::from)?;
        let conn = client.get_connection_manager().await.map_err(KvError::from)?;
        Ok(Self {
            conn,
            del_if_eq: redis::Script::new(DEL_IF_EQ_SCRIPT),
        })
    }
}

#[async_trait]
impl Kv for RedisKv {
    async fn set_nx_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(KvError::from)?;
        Ok(result.is_some())
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .del_if_eq
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(KvError::from)?;
        Ok(deleted > 0)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(KvError::from)
    }

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(KvError::from)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(KvError::from)
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(KvError::from)?;
        Ok(())
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(key, value).await.map_err(KvError::from)?;
        Ok(())
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(key, value).await.map_err(KvError::from)?;
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None).await.map_err(KvError::from)
    }

    async fn list_len(&self, key: &str) -> Result<usize, KvError> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(KvError::from)
    }
}
