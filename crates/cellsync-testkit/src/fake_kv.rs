use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cellsync_kv::{Kv, KvError};

use crate::clock::VirtualClock;

struct Entry {
    value: String,
    expires_at: Option<Duration>,
}

/// In-memory [`Kv`] realization driven by a [`VirtualClock`] instead of wall
/// time, so lease TTLs, `IgnoreMark` expiry, and the snapshot cache's 24h
/// expiry are all exercisable by advancing the clock rather than sleeping.
pub struct FakeKv {
    clock: VirtualClock,
    strings: Mutex<HashMap<String, Entry>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeKv {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            strings: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        match entry.expires_at {
            Some(deadline) => self.clock.elapsed() < deadline,
            None => true,
        }
    }

    /// Test helper: number of pending elements in a named list, bypassing
    /// the `Kv::list_len` round-trip through serialized JSON.
    pub fn raw_list_len(&self, key: &str) -> usize {
        self.lists.lock().unwrap().get(key).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl Kv for FakeKv {
    async fn set_nx_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut map = self.strings.lock().unwrap();
        if let Some(existing) = map.get(key) {
            if self.is_live(existing) {
                return Ok(false);
            }
        }
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(self.clock.elapsed() + ttl),
            },
        );
        Ok(true)
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let mut map = self.strings.lock().unwrap();
        let matches = map
            .get(key)
            .is_some_and(|entry| self.is_live(entry) && entry.value == expected);
        if matches {
            map.remove(key);
        }
        Ok(matches)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let map = self.strings.lock().unwrap();
        Ok(map.get(key).filter(|e| self.is_live(e)).map(|e| e.value.clone()))
    }

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.strings.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(self.clock.elapsed() + ttl),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let map = self.strings.lock().unwrap();
        Ok(map.get(key).is_some_and(|e| self.is_live(e)))
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.strings.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.lists.lock().unwrap().entry(key.to_string()).or_default().push(value.to_string());
        Ok(())
    }

    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(0, value.to_string());
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut lists = self.lists.lock().unwrap();
        match lists.get_mut(key) {
            Some(list) if !list.is_empty() => Ok(Some(list.remove(0))),
            _ => Ok(None),
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize, KvError> {
        Ok(self.lists.lock().unwrap().get(key).map(Vec::len).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ttl_expiry_is_driven_by_the_virtual_clock() {
        let clock = VirtualClock::new();
        let kv = FakeKv::new(clock.clone());

        assert!(kv.set_nx_ttl("k", "v", Duration::from_secs(5)).await.unwrap());
        assert!(!kv.set_nx_ttl("k", "v2", Duration::from_secs(5)).await.unwrap());

        clock.advance(Duration::from_secs(6));
        assert!(kv.set_nx_ttl("k", "v3", Duration::from_secs(5)).await.unwrap());
    }
}
