//! A minimal in-memory [`Kv`] used only by this crate's own unit tests.
//!
//! `cellsync-testkit::FakeKv` exists for downstream crates and depends on
//! this crate for the `Kv` trait, so it can't be reused here without a
//! dependency cycle — this is a deliberately smaller, local stand-in.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::KvError;
use crate::kv_trait::Kv;

#[derive(Default)]
pub struct InMemoryKv {
    strings: Mutex<HashMap<String, String>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Kv for InMemoryKv {
    async fn set_nx_ttl(&self, key: &str, value: &str, _ttl: Duration) -> Result<bool, KvError> {
        let mut map = self.strings.lock().unwrap();
        if map.contains_key(key) {
            Ok(false)
        } else {
            map.insert(key.to_string(), value.to_string());
            Ok(true)
        }
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let mut map = self.strings.lock().unwrap();
        if map.get(key).map(|v| v.as_str()) == Some(expected) {
            map.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.strings.lock().unwrap().get(key).cloned())
    }

    async fn set_ttl(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), KvError> {
        self.strings.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.strings.lock().unwrap().contains_key(key))
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
        Ok(self.lists.lock().unwrap().get(key).map(|l| l.len()).unwrap_or(0))
    }
}
